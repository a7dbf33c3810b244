// 6.0: the ledger store. in-memory stand-in for the durable document store
// with the same contract the executor needs: atomic read-modify-write over one
// account plus one position, optimistic concurrency, bounded retry. a real
// deployment swaps this for database transactions without touching the
// execution rules.
//
// 6.1 atomic/with_account run the caller's closure against cloned snapshots
// and version-check at commit; a concurrent commit to the same records voids
// the attempt and the closure re-runs against fresh state. business errors
// from the closure abort immediately and commit nothing.

use crate::account::Account;
use crate::config::LedgerConfig;
use crate::limit_order::{LimitOrder, LimitOrderDraft, OrderStatus};
use crate::position::Position;
use crate::results::TradeError;
use crate::trade::{TradeDraft, TradeRecord};
use crate::types::{OrderId, Price, Quote, Symbol, Timestamp, TradeId, UserId};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone)]
struct Versioned<T> {
    value: T,
    version: u64,
}

#[derive(Debug)]
struct StoreInner {
    accounts: HashMap<UserId, Versioned<Account>>,
    positions: HashMap<(UserId, Symbol), Versioned<Position>>,
    trades: Vec<TradeRecord>,
    orders: BTreeMap<OrderId, LimitOrder>,
    next_trade_id: u64,
    next_order_id: u64,
    next_user_id: u64,
    current_time: Timestamp,
}

/// Mutable view handed to an `atomic` closure: the account, the one affected
/// position (None = absent or deleted), and ledger records staged for append.
pub struct TradeTxn {
    pub account: Account,
    pub position: Option<Position>,
    staged: Vec<TradeDraft>,
}

impl TradeTxn {
    pub fn record(&mut self, draft: TradeDraft) {
        self.staged.push(draft);
    }
}

/// Account-only variant for interest accrual and cash grants.
pub struct AccountTxn {
    pub account: Account,
    staged: Vec<TradeDraft>,
}

impl AccountTxn {
    pub fn record(&mut self, draft: TradeDraft) {
        self.staged.push(draft);
    }
}

#[derive(Debug)]
pub struct LedgerStore {
    inner: RwLock<StoreInner>,
    max_txn_retries: u32,
}

impl LedgerStore {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                accounts: HashMap::new(),
                positions: HashMap::new(),
                trades: Vec::new(),
                orders: BTreeMap::new(),
                next_trade_id: 0,
                next_order_id: 0,
                next_user_id: 0,
                current_time: Timestamp::from_millis(0),
            }),
            max_txn_retries: config.max_txn_retries,
        }
    }

    // time is driven externally so batch runs are reproducible
    pub fn set_time(&self, timestamp: Timestamp) {
        self.inner.write().unwrap().current_time = timestamp;
    }

    pub fn advance_time(&self, millis: i64) {
        let mut inner = self.inner.write().unwrap();
        inner.current_time = Timestamp::from_millis(inner.current_time.as_millis() + millis);
    }

    pub fn time(&self) -> Timestamp {
        self.inner.read().unwrap().current_time
    }

    /// Register a new account (signup is external to the core; this is the
    /// hook it calls).
    pub fn create_account(&self, balance: Quote, credit_limit: Quote) -> UserId {
        let mut inner = self.inner.write().unwrap();
        inner.next_user_id += 1;
        let uid = UserId(inner.next_user_id);
        let account = Account::new(uid, balance, credit_limit, inner.current_time);
        inner.accounts.insert(
            uid,
            Versioned {
                value: account,
                version: 1,
            },
        );
        uid
    }

    // 6.2: the conflict-retried transaction over account + one position.
    // returns the closure's output plus the ids of the records it staged.
    pub fn atomic<T>(
        &self,
        uid: UserId,
        symbol: &Symbol,
        mut f: impl FnMut(&mut TradeTxn) -> Result<T, TradeError>,
    ) -> Result<(T, Vec<TradeId>), TradeError> {
        let key = (uid, symbol.clone());

        for attempt in 1..=self.max_txn_retries {
            let (account, account_version, position, position_version) = {
                let inner = self.inner.read().unwrap();
                let account = inner
                    .accounts
                    .get(&uid)
                    .ok_or(TradeError::UserNotFound(uid))?;
                let position = inner.positions.get(&key);
                (
                    account.value.clone(),
                    account.version,
                    position.map(|p| p.value.clone()),
                    position.map(|p| p.version),
                )
            };

            let mut txn = TradeTxn {
                account,
                position,
                staged: Vec::new(),
            };
            let out = f(&mut txn)?;

            let mut inner = self.inner.write().unwrap();
            let account_current = inner.accounts.get(&uid).map(|a| a.version);
            let position_current = inner.positions.get(&key).map(|p| p.version);
            if account_current != Some(account_version) || position_current != position_version {
                debug!(%uid, symbol = %symbol, attempt, "commit voided by concurrent write");
                continue;
            }

            let ids = inner.commit(uid, Some(key), txn.account, txn.position, txn.staged);
            return Ok((out, ids));
        }

        Err(TradeError::ConcurrentModification {
            attempts: self.max_txn_retries,
        })
    }

    // 6.3: account-only transaction, same retry discipline.
    pub fn with_account<T>(
        &self,
        uid: UserId,
        mut f: impl FnMut(&mut AccountTxn) -> Result<T, TradeError>,
    ) -> Result<(T, Vec<TradeId>), TradeError> {
        for attempt in 1..=self.max_txn_retries {
            let (account, account_version) = {
                let inner = self.inner.read().unwrap();
                let account = inner
                    .accounts
                    .get(&uid)
                    .ok_or(TradeError::UserNotFound(uid))?;
                (account.value.clone(), account.version)
            };

            let mut txn = AccountTxn {
                account,
                staged: Vec::new(),
            };
            let out = f(&mut txn)?;

            let mut inner = self.inner.write().unwrap();
            if inner.accounts.get(&uid).map(|a| a.version) != Some(account_version) {
                debug!(%uid, attempt, "commit voided by concurrent write");
                continue;
            }

            let ids = inner.commit(uid, None, txn.account, None, txn.staged);
            return Ok((out, ids));
        }

        Err(TradeError::ConcurrentModification {
            attempts: self.max_txn_retries,
        })
    }

    pub fn account(&self, uid: UserId) -> Option<Account> {
        self.inner
            .read()
            .unwrap()
            .accounts
            .get(&uid)
            .map(|a| a.value.clone())
    }

    pub fn position(&self, uid: UserId, symbol: &Symbol) -> Option<Position> {
        self.inner
            .read()
            .unwrap()
            .positions
            .get(&(uid, symbol.clone()))
            .map(|p| p.value.clone())
    }

    /// All open positions for a user, symbol-sorted so batch passes iterate
    /// deterministically.
    pub fn positions_for(&self, uid: UserId) -> Vec<Position> {
        let inner = self.inner.read().unwrap();
        let mut positions: Vec<Position> = inner
            .positions
            .iter()
            .filter(|((owner, _), _)| *owner == uid)
            .map(|(_, p)| p.value.clone())
            .collect();
        positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        positions
    }

    pub fn transactions_for(&self, uid: UserId) -> Vec<TradeRecord> {
        self.inner
            .read()
            .unwrap()
            .trades
            .iter()
            .filter(|t| t.uid == uid)
            .cloned()
            .collect()
    }

    /// Most recent share acquisitions (Buy and Cover records), newest first,
    /// bounded. This is the LIFO input for forced liquidation.
    pub fn recent_buy_transactions(&self, uid: UserId, limit: usize) -> Vec<TradeRecord> {
        let inner = self.inner.read().unwrap();
        let mut records: Vec<TradeRecord> = inner
            .trades
            .iter()
            .filter(|t| t.uid == uid && t.kind.is_acquisition())
            .cloned()
            .collect();
        records.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));
        records.truncate(limit);
        records
    }

    /// Users carrying borrowed credit, the interest job's scan set.
    pub fn users_with_credit(&self) -> Vec<UserId> {
        let inner = self.inner.read().unwrap();
        let mut users: Vec<UserId> = inner
            .accounts
            .values()
            .filter(|a| a.value.used_credit > Quote::zero())
            .map(|a| a.value.uid)
            .collect();
        users.sort();
        users
    }

    pub fn submit_limit_order(&self, draft: LimitOrderDraft) -> OrderId {
        let mut inner = self.inner.write().unwrap();
        inner.next_order_id += 1;
        let id = OrderId(inner.next_order_id);
        let order = LimitOrder {
            id,
            uid: draft.uid,
            symbol: draft.symbol,
            name: draft.name,
            side: draft.side,
            target_price: draft.target_price,
            currency: draft.currency,
            quantity: draft.quantity,
            status: OrderStatus::Pending,
            created_at: inner.current_time,
        };
        inner.orders.insert(id, order);
        id
    }

    pub fn limit_order(&self, id: OrderId) -> Option<LimitOrder> {
        self.inner.read().unwrap().orders.get(&id).cloned()
    }

    pub fn pending_limit_orders(&self) -> Vec<LimitOrder> {
        self.inner
            .read()
            .unwrap()
            .orders
            .values()
            .filter(|o| o.is_pending())
            .cloned()
            .collect()
    }

    pub fn complete_limit_order(&self, id: OrderId, executed_price: Price) -> Result<(), TradeError> {
        self.settle_limit_order(id, OrderStatus::Completed { executed_price })
    }

    pub fn fail_limit_order(&self, id: OrderId, reason: String) -> Result<(), TradeError> {
        self.settle_limit_order(id, OrderStatus::Failed { reason })
    }

    // a limit order transitions exactly once
    fn settle_limit_order(&self, id: OrderId, status: OrderStatus) -> Result<(), TradeError> {
        let mut inner = self.inner.write().unwrap();
        let order = inner.orders.get_mut(&id).ok_or(TradeError::OrderNotFound(id))?;
        if !order.is_pending() {
            return Err(TradeError::OrderAlreadySettled(id));
        }
        order.status = status;
        Ok(())
    }
}

impl StoreInner {
    fn commit(
        &mut self,
        uid: UserId,
        position_key: Option<(UserId, Symbol)>,
        account: Account,
        position: Option<Position>,
        staged: Vec<TradeDraft>,
    ) -> Vec<TradeId> {
        debug_assert!(!account.balance.is_negative(), "cash can never go negative");

        let slot = self
            .accounts
            .get_mut(&uid)
            .expect("commit after successful version check");
        slot.value = account;
        slot.version += 1;

        if let Some(key) = position_key {
            match position {
                Some(value) => {
                    debug_assert!(value.quantity != 0, "zero positions are deleted");
                    match self.positions.entry(key) {
                        Entry::Occupied(mut slot) => {
                            let versioned = slot.get_mut();
                            versioned.value = value;
                            versioned.version += 1;
                        }
                        Entry::Vacant(slot) => {
                            slot.insert(Versioned { value, version: 1 });
                        }
                    }
                }
                None => {
                    self.positions.remove(&key);
                }
            }
        }

        let mut ids = Vec::with_capacity(staged.len());
        for draft in staged {
            self.next_trade_id += 1;
            let id = TradeId(self.next_trade_id);
            self.trades.push(draft.into_record(id, self.current_time));
            ids.push(id);
        }
        ids
    }
}

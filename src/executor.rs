// 2.0 executor.rs: the atomic buy/sell state transition. the single place
// position quantity, average price, cash, and credit are mutated together.
// interactive orders, the limit matcher, and forced liquidation all funnel
// through here; nothing else writes ledger state.
//
// prices arrive pre-converted to the base currency. the flow of money:
//   buy  -> cash first, then the credit line; covering a short releases the
//           withheld entry proceeds back to cash and frees the reservation
//   sell -> closing a long repays borrowed credit before crediting cash;
//           opening a short reserves the gross amount as credit and pays out
//           nothing until covered

use crate::config::LedgerConfig;
use crate::position::{long_add_average, short_extend_average, Position};
use crate::price_feed::PriceSnapshot;
use crate::results::{ExecutionReceipt, TradeError};
use crate::store::LedgerStore;
use crate::trade::{TradeDraft, TradeKind};
use crate::types::{gross_amount, Price, Quote, Symbol, UserId};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    Market,
    Limit,
    Liquidation,
}

impl std::fmt::Display for OrderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderKind::Market => write!(f, "market"),
            OrderKind::Limit => write!(f, "limit"),
            OrderKind::Liquidation => write!(f, "liquidation"),
        }
    }
}

/// One order as the executor sees it: instrument identity plus a fill price
/// already expressed in the base currency.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub uid: UserId,
    pub symbol: Symbol,
    pub name: String,
    pub market: String,
    pub price: Price,
    pub quantity: i64,
    pub kind: OrderKind,
}

#[derive(Clone)]
pub struct OrderExecutor {
    store: Arc<LedgerStore>,
    config: LedgerConfig,
}

impl OrderExecutor {
    pub fn new(store: Arc<LedgerStore>, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // 2.1: buy. covers any short first, then opens/extends a long with the
    // remainder. one Cover/Buy record per order.
    pub fn execute_buy(&self, req: &OrderRequest) -> Result<ExecutionReceipt, TradeError> {
        if req.quantity <= 0 {
            return Err(TradeError::InvalidQuantity(req.quantity));
        }

        let cost = gross_amount(req.price, req.quantity);

        let (mut receipt, ids) = self.store.atomic(req.uid, &req.symbol, |txn| {
            let existing = txn.position.clone();
            let current_qty = existing.as_ref().map_or(0, |p| p.quantity);

            let mut credit_released = Quote::zero();
            let mut profit = Quote::zero();
            if let Some(pos) = existing.as_ref().filter(|p| p.quantity < 0) {
                let covered = pos.abs_quantity().min(req.quantity);
                credit_released = gross_amount(pos.average_price, covered);
                profit = Quote::new(
                    (pos.average_price.value() - req.price.value()) * Decimal::from(covered),
                );
            }

            let cash_to_use = txn.account.balance.min(cost);
            let credit_to_use = cost.sub(cash_to_use);

            // cover-driven buys reduce exposure and bypass the limit check
            if txn.account.buying_power() < cost && current_qty >= 0 {
                return Err(TradeError::InsufficientFunds {
                    required: cost,
                    available: txn.account.buying_power(),
                });
            }

            txn.account.balance = txn.account.balance.add(credit_released).sub(cash_to_use);
            txn.account.used_credit =
                txn.account.used_credit.add(credit_to_use).sub(credit_released);

            let new_qty = current_qty + req.quantity;
            txn.position = if new_qty == 0 {
                None
            } else {
                let new_avg = match existing.as_ref() {
                    Some(p) if p.quantity > 0 => {
                        long_add_average(p.average_price, p.quantity, cost, new_qty)
                    }
                    // adding to a short leaves the entry average alone
                    Some(p) if p.quantity < 0 && new_qty < 0 => p.average_price,
                    // fresh open, or a short flipped long: basis is the fill
                    _ => req.price,
                };
                Some(Position::new(
                    req.symbol.clone(),
                    req.name.clone(),
                    new_qty,
                    new_avg,
                    req.price,
                ))
            };

            txn.record(TradeDraft {
                uid: req.uid,
                kind: if current_qty < 0 {
                    TradeKind::Cover
                } else {
                    TradeKind::Buy
                },
                symbol: Some(req.symbol.clone()),
                name: req.name.clone(),
                market: req.market.clone(),
                price: Some(req.price),
                quantity: req.quantity,
                amount: cost,
                fee: Quote::zero(),
                profit,
                credit_used: credit_to_use,
                credit_released,
                credit_repaid: Quote::zero(),
            });

            Ok(ExecutionReceipt {
                trade_ids: Vec::new(),
                filled_quantity: req.quantity,
                amount: cost,
                fee: Quote::zero(),
                profit,
                position_quantity: new_qty,
            })
        })?;

        receipt.trade_ids = ids;
        info!(
            uid = %req.uid,
            symbol = %req.symbol,
            kind = %req.kind,
            quantity = req.quantity,
            cost = %cost,
            "buy executed"
        );
        Ok(receipt)
    }

    // 2.2: sell. closes the long portion first (repaying credit out of the
    // proceeds), then reserves margin for any shorted remainder. a sell that
    // goes through the long writes two records: Sell then Short.
    pub fn execute_sell(&self, req: &OrderRequest) -> Result<ExecutionReceipt, TradeError> {
        if req.quantity <= 0 {
            return Err(TradeError::InvalidQuantity(req.quantity));
        }

        let fee_rate = self.config.sell_fee_rate;

        let (mut receipt, ids) = self.store.atomic(req.uid, &req.symbol, |txn| {
            let existing = txn.position.clone();
            let current_qty = existing.as_ref().map_or(0, |p| p.quantity);

            let mut total_amount = Quote::zero();
            let mut total_fee = Quote::zero();
            let mut total_profit = Quote::zero();

            let close_qty = current_qty.max(0).min(req.quantity);
            let short_qty = req.quantity - close_qty;

            if close_qty > 0 {
                let pos = existing.as_ref().expect("closing requires a long position");
                let amount = gross_amount(req.price, close_qty);
                let fee = amount.mul(fee_rate).floor();
                let proceeds = amount.sub(fee);
                let profit = proceeds.sub(gross_amount(pos.average_price, close_qty));
                let credit_repaid = txn.account.used_credit.min(proceeds);

                txn.account.balance = txn.account.balance.add(proceeds).sub(credit_repaid);
                txn.account.used_credit = txn.account.used_credit.sub(credit_repaid);

                txn.record(TradeDraft {
                    uid: req.uid,
                    kind: TradeKind::Sell,
                    symbol: Some(req.symbol.clone()),
                    name: req.name.clone(),
                    market: req.market.clone(),
                    price: Some(req.price),
                    quantity: close_qty,
                    amount,
                    fee,
                    profit,
                    credit_used: Quote::zero(),
                    credit_released: Quote::zero(),
                    credit_repaid,
                });

                total_amount = total_amount.add(amount);
                total_fee = total_fee.add(fee);
                total_profit = total_profit.add(profit);
            }

            if short_qty > 0 {
                let amount = gross_amount(req.price, short_qty);
                let fee = amount.mul(fee_rate).floor();

                // the whole gross amount is held as margin against the short
                if txn.account.available_credit() < amount {
                    return Err(TradeError::InsufficientCredit {
                        required: amount,
                        available: txn.account.available_credit(),
                    });
                }
                txn.account.used_credit = txn.account.used_credit.add(amount);

                txn.record(TradeDraft {
                    uid: req.uid,
                    kind: TradeKind::Short,
                    symbol: Some(req.symbol.clone()),
                    name: req.name.clone(),
                    market: req.market.clone(),
                    price: Some(req.price),
                    quantity: short_qty,
                    amount,
                    fee,
                    profit: Quote::zero(),
                    credit_used: amount,
                    credit_released: Quote::zero(),
                    credit_repaid: Quote::zero(),
                });

                total_amount = total_amount.add(amount);
                total_fee = total_fee.add(fee);
            }

            let new_qty = current_qty - req.quantity;
            txn.position = if new_qty == 0 {
                None
            } else {
                let new_avg = match existing.as_ref() {
                    // trimming a long leaves the cost basis alone
                    Some(p) if p.quantity > 0 && new_qty > 0 => p.average_price,
                    // extending a short: sell-amount-weighted entry
                    Some(p) if p.quantity < 0 => short_extend_average(
                        Some((p.average_price, p.abs_quantity())),
                        total_amount,
                        new_qty.abs(),
                    ),
                    // flipped long -> short, or shorted from flat
                    Some(_) => req.price,
                    None => short_extend_average(None, total_amount, new_qty.abs()),
                };
                Some(Position::new(
                    req.symbol.clone(),
                    req.name.clone(),
                    new_qty,
                    new_avg,
                    req.price,
                ))
            };

            Ok(ExecutionReceipt {
                trade_ids: Vec::new(),
                filled_quantity: req.quantity,
                amount: total_amount,
                fee: total_fee,
                profit: total_profit,
                position_quantity: new_qty,
            })
        })?;

        receipt.trade_ids = ids;
        info!(
            uid = %req.uid,
            symbol = %req.symbol,
            kind = %req.kind,
            quantity = req.quantity,
            proceeds = %receipt.proceeds(),
            "sell executed"
        );
        Ok(receipt)
    }

    // 2.3: interactive entry points. the order is priced from the snapshot;
    // a symbol the snapshot cannot price is a rejection here, unlike the
    // batch jobs which skip and retry next cycle.
    pub fn market_buy(
        &self,
        snapshot: &PriceSnapshot,
        uid: UserId,
        symbol: &Symbol,
        quantity: i64,
    ) -> Result<ExecutionReceipt, TradeError> {
        let req = self.priced_request(snapshot, uid, symbol, quantity)?;
        self.execute_buy(&req)
    }

    pub fn market_sell(
        &self,
        snapshot: &PriceSnapshot,
        uid: UserId,
        symbol: &Symbol,
        quantity: i64,
    ) -> Result<ExecutionReceipt, TradeError> {
        let req = self.priced_request(snapshot, uid, symbol, quantity)?;
        self.execute_sell(&req)
    }

    fn priced_request(
        &self,
        snapshot: &PriceSnapshot,
        uid: UserId,
        symbol: &Symbol,
        quantity: i64,
    ) -> Result<OrderRequest, TradeError> {
        let quote = snapshot
            .lookup(symbol)
            .ok_or_else(|| TradeError::PriceUnavailable(symbol.clone()))?;
        let price = snapshot
            .price_in_base(symbol)
            .ok_or_else(|| TradeError::PriceUnavailable(symbol.clone()))?;
        Ok(OrderRequest {
            uid,
            symbol: symbol.clone(),
            name: quote.name.clone(),
            market: quote.market.clone(),
            price,
            quantity,
            kind: OrderKind::Market,
        })
    }

    /// Credit cash outside of trading (mission payouts and the like) and
    /// leave a Reward record behind. `amount` must be positive.
    pub fn grant_reward(
        &self,
        uid: UserId,
        label: &str,
        amount: Quote,
    ) -> Result<ExecutionReceipt, TradeError> {
        debug_assert!(amount > Quote::zero());

        let (receipt, ids) = self.store.with_account(uid, |txn| {
            txn.account.balance = txn.account.balance.add(amount);
            txn.record(TradeDraft {
                uid,
                kind: TradeKind::Reward,
                symbol: None,
                name: label.to_string(),
                market: String::new(),
                price: None,
                quantity: 0,
                amount,
                fee: Quote::zero(),
                profit: Quote::zero(),
                credit_used: Quote::zero(),
                credit_released: Quote::zero(),
                credit_repaid: Quote::zero(),
            });
            Ok(ExecutionReceipt {
                trade_ids: Vec::new(),
                filled_quantity: 0,
                amount,
                fee: Quote::zero(),
                profit: Quote::zero(),
                position_quantity: 0,
            })
        })?;

        info!(uid = %uid, amount = %amount, label, "reward granted");
        Ok(ExecutionReceipt {
            trade_ids: ids,
            ..receipt
        })
    }
}

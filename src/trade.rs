// 3.0: the append-only trade ledger. one record per fill leg, immutable once
// written. this is both the audit trail and the input the liquidation job
// replays for LIFO ordering.

use crate::types::{Price, Quote, Symbol, Timestamp, TradeId, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeKind {
    Buy,
    Sell,
    Short,
    Cover,
    Reward,
}

impl TradeKind {
    // Buy and Cover both acquire shares; they are what the LIFO pass walks.
    pub fn is_acquisition(&self) -> bool {
        matches!(self, TradeKind::Buy | TradeKind::Cover)
    }
}

// 3.1: a committed ledger record. `symbol`/`price` are absent only on Reward
// entries, which carry cash but no instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: TradeId,
    pub uid: UserId,
    pub kind: TradeKind,
    pub symbol: Option<Symbol>,
    pub name: String,
    pub market: String,
    pub price: Option<Price>,
    pub quantity: i64,
    pub amount: Quote,
    pub fee: Quote,
    pub profit: Quote,
    pub credit_used: Quote,
    pub credit_released: Quote,
    pub credit_repaid: Quote,
    pub timestamp: Timestamp,
}

// 3.2: a record staged inside an atomic transaction. the store assigns the id
// and timestamp at commit so ordering is decided in exactly one place.
#[derive(Debug, Clone)]
pub struct TradeDraft {
    pub uid: UserId,
    pub kind: TradeKind,
    pub symbol: Option<Symbol>,
    pub name: String,
    pub market: String,
    pub price: Option<Price>,
    pub quantity: i64,
    pub amount: Quote,
    pub fee: Quote,
    pub profit: Quote,
    pub credit_used: Quote,
    pub credit_released: Quote,
    pub credit_repaid: Quote,
}

impl TradeDraft {
    pub fn into_record(self, id: TradeId, timestamp: Timestamp) -> TradeRecord {
        TradeRecord {
            id,
            uid: self.uid,
            kind: self.kind,
            symbol: self.symbol,
            name: self.name,
            market: self.market,
            price: self.price,
            quantity: self.quantity,
            amount: self.amount,
            fee: self.fee,
            profit: self.profit,
            credit_used: self.credit_used,
            credit_released: self.credit_released,
            credit_repaid: self.credit_repaid,
            timestamp,
        }
    }
}

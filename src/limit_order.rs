//! Standing limit orders.
//!
//! A limit order is an instruction to execute once the market crosses a
//! target price. Orders are stored apart from the ledger, transition exactly
//! once, and only the matcher moves them out of `Pending`.

use crate::types::{OrderId, Price, Symbol, Timestamp, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Completed { executed_price: Price },
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitOrder {
    pub id: OrderId,
    pub uid: UserId,
    pub symbol: Symbol,
    pub name: String,
    pub side: OrderSide,
    pub target_price: Price,
    // currency the target price is expressed in; comparison prices are
    // converted into this currency before the trigger check
    pub currency: String,
    pub quantity: i64,
    pub status: OrderStatus,
    pub created_at: Timestamp,
}

impl LimitOrder {
    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }

    /// Trigger check against a price already converted into the order's
    /// currency. Buys fire at or below the target, sells at or above.
    pub fn should_trigger(&self, compare_price: Price) -> bool {
        match self.side {
            OrderSide::Buy => compare_price.value() <= self.target_price.value(),
            OrderSide::Sell => compare_price.value() >= self.target_price.value(),
        }
    }
}

/// What a user submits; the store assigns the id and stamps it.
#[derive(Debug, Clone)]
pub struct LimitOrderDraft {
    pub uid: UserId,
    pub symbol: Symbol,
    pub name: String,
    pub side: OrderSide,
    pub target_price: Price,
    pub currency: String,
    pub quantity: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order(side: OrderSide, target: i64) -> LimitOrder {
        LimitOrder {
            id: OrderId(1),
            uid: UserId(1),
            symbol: Symbol::new("005930"),
            name: "Samsung Electronics".to_string(),
            side,
            target_price: Price::new_unchecked(target.into()),
            currency: "KRW".to_string(),
            quantity: 10,
            status: OrderStatus::Pending,
            created_at: Timestamp::from_millis(0),
        }
    }

    #[test]
    fn buy_triggers_at_or_below_target() {
        let buy = order(OrderSide::Buy, 70000);
        assert!(!buy.should_trigger(Price::new_unchecked(dec!(70001))));
        assert!(buy.should_trigger(Price::new_unchecked(dec!(70000))));
        assert!(buy.should_trigger(Price::new_unchecked(dec!(69000))));
    }

    #[test]
    fn sell_triggers_at_or_above_target() {
        let sell = order(OrderSide::Sell, 70000);
        assert!(!sell.should_trigger(Price::new_unchecked(dec!(69999))));
        assert!(sell.should_trigger(Price::new_unchecked(dec!(70000))));
        assert!(sell.should_trigger(Price::new_unchecked(dec!(71000))));
    }

    #[test]
    fn pending_flag_follows_status() {
        let mut o = order(OrderSide::Buy, 70000);
        assert!(o.is_pending());
        o.status = OrderStatus::Completed {
            executed_price: Price::new_unchecked(dec!(69900)),
        };
        assert!(!o.is_pending());
    }
}

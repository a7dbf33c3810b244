// 8.0: result types and errors for ledger operations.

use crate::types::{OrderId, Quote, Symbol, TradeId, UserId};

/// Outcome of one executed order: the ledger records it appended plus the
/// money that moved. `amount` is the gross notional across all legs.
#[derive(Debug, Clone)]
pub struct ExecutionReceipt {
    pub trade_ids: Vec<TradeId>,
    pub filled_quantity: i64,
    pub amount: Quote,
    pub fee: Quote,
    pub profit: Quote,
    // signed position quantity after the fill; 0 means the position closed
    pub position_quantity: i64,
}

impl ExecutionReceipt {
    // what a seller is owed across legs (cash actually received can be less:
    // credit repayment and short margin withholding come out of this)
    pub fn proceeds(&self) -> Quote {
        self.amount.sub(self.fee)
    }
}

#[derive(Debug, Clone)]
pub struct InterestJobReport {
    pub accounts_scanned: usize,
    pub accounts_charged: usize,
    pub interest_total: Quote,
    pub accounts_liquidated: usize,
    pub forced_trades: usize,
    pub skipped_symbols: usize,
    // accounts still over their limit after both passes (missing prices or
    // exhausted portfolios); they are retried on the next run
    pub unresolved: Vec<UserId>,
}

impl InterestJobReport {
    pub fn empty() -> Self {
        Self {
            accounts_scanned: 0,
            accounts_charged: 0,
            interest_total: Quote::zero(),
            accounts_liquidated: 0,
            forced_trades: 0,
            skipped_symbols: 0,
            unresolved: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MatchingReport {
    pub scanned: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped_no_price: usize,
}

impl MatchingReport {
    pub fn empty() -> Self {
        Self {
            scanned: 0,
            completed: 0,
            failed: 0,
            skipped_no_price: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TradeError {
    #[error("Quantity must be positive, got {0}")]
    InvalidQuantity(i64),

    #[error("User {0} does not exist")]
    UserNotFound(UserId),

    #[error("Insufficient funds (including credit limit): need {required}, have {available}")]
    InsufficientFunds { required: Quote, available: Quote },

    #[error("Insufficient credit limit for short selling: need {required}, have {available}")]
    InsufficientCredit { required: Quote, available: Quote },

    #[error("Write conflict persisted after {attempts} attempts")]
    ConcurrentModification { attempts: u32 },

    #[error("No current price for {0}")]
    PriceUnavailable(Symbol),

    #[error("Limit order {0:?} not found")]
    OrderNotFound(OrderId),

    #[error("Limit order {0:?} was already settled")]
    OrderAlreadySettled(OrderId),
}

impl TradeError {
    /// Business rejections are final for the submitted order; transient
    /// failures may be resubmitted by the caller.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TradeError::ConcurrentModification { .. } | TradeError::PriceUnavailable(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn receipt_proceeds() {
        let receipt = ExecutionReceipt {
            trade_ids: vec![TradeId(1)],
            filled_quantity: 10,
            amount: Quote::new(dec!(700000)),
            fee: Quote::new(dec!(350)),
            profit: Quote::zero(),
            position_quantity: 0,
        };
        assert_eq!(receipt.proceeds().value(), dec!(699650));
    }

    #[test]
    fn transient_classification() {
        assert!(TradeError::ConcurrentModification { attempts: 5 }.is_transient());
        assert!(TradeError::PriceUnavailable(Symbol::new("005930")).is_transient());
        assert!(!TradeError::InvalidQuantity(0).is_transient());
        assert!(!TradeError::InsufficientFunds {
            required: Quote::new(dec!(100)),
            available: Quote::new(dec!(50)),
        }
        .is_transient());
    }
}

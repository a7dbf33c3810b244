//! Account and credit-line management.
//!
//! An account holds cash, a borrowed-credit amount, and a static credit
//! ceiling. Cash never goes negative; `used_credit` may transiently exceed
//! `credit_limit` and stays that way only until the next liquidation pass.

use crate::position::Position;
use crate::types::{gross_amount, Quote, Timestamp, UserId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub uid: UserId,
    pub balance: Quote,
    pub used_credit: Quote,
    pub credit_limit: Quote,
    pub last_interest_date: Option<NaiveDate>,
    pub created_at: Timestamp,
}

impl Account {
    pub fn new(uid: UserId, balance: Quote, credit_limit: Quote, timestamp: Timestamp) -> Self {
        Self {
            uid,
            balance,
            used_credit: Quote::zero(),
            credit_limit,
            last_interest_date: None,
            created_at: timestamp,
        }
    }

    // negative when the account is over its limit
    pub fn available_credit(&self) -> Quote {
        self.credit_limit.sub(self.used_credit)
    }

    pub fn buying_power(&self) -> Quote {
        self.balance.add(self.available_credit())
    }

    pub fn credit_excess(&self) -> Quote {
        self.used_credit.sub(self.credit_limit)
    }

    pub fn is_over_limit(&self) -> bool {
        self.used_credit > self.credit_limit
    }
}

/// Net-liquidation view of an account plus its open positions, valued at the
/// positions' last marks.
///
/// Short bookkeeping here: opening a short reserves the gross sale amount as
/// used credit and withholds the proceeds, so the entry value of the short
/// book has to be added back twice — once to cancel the reservation inside
/// `used_credit` and once for the withheld cash:
///
/// `equity = balance + long_value - short_current_value - used_credit
///           + 2 * short_initial_value`
pub struct AccountMetrics {
    pub long_value: Quote,
    pub short_current_value: Quote,
    pub short_initial_value: Quote,
    pub equity: Quote,
}

pub fn calculate_account_metrics(account: &Account, positions: &[Position]) -> AccountMetrics {
    let mut long_value = Quote::zero();
    let mut short_current_value = Quote::zero();
    let mut short_initial_value = Quote::zero();

    for position in positions {
        if position.is_long() {
            long_value = long_value.add(gross_amount(position.current_price, position.quantity));
        } else if position.is_short() {
            let abs_qty = position.abs_quantity();
            short_current_value =
                short_current_value.add(gross_amount(position.current_price, abs_qty));
            short_initial_value =
                short_initial_value.add(gross_amount(position.average_price, abs_qty));
        }
    }

    let equity = account
        .balance
        .add(long_value)
        .sub(short_current_value)
        .sub(account.used_credit)
        .add(short_initial_value)
        .add(short_initial_value);

    AccountMetrics {
        long_value,
        short_current_value,
        short_initial_value,
        equity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Price, Symbol};
    use rust_decimal_macros::dec;

    fn account_with(balance: i64, used_credit: i64, credit_limit: i64) -> Account {
        let mut account = Account::new(
            UserId(1),
            Quote::new(balance.into()),
            Quote::new(credit_limit.into()),
            Timestamp::from_millis(0),
        );
        account.used_credit = Quote::new(used_credit.into());
        account
    }

    fn position(qty: i64, avg: i64, mark: i64) -> Position {
        Position::new(
            Symbol::new("005930"),
            "Samsung Electronics".to_string(),
            qty,
            Price::new_unchecked(avg.into()),
            Price::new_unchecked(mark.into()),
        )
    }

    #[test]
    fn credit_line_math() {
        let account = account_with(1000, 300, 500);
        assert_eq!(account.available_credit().value(), dec!(200));
        assert_eq!(account.buying_power().value(), dec!(1200));
        assert!(!account.is_over_limit());

        let over = account_with(0, 600, 500);
        assert!(over.is_over_limit());
        assert_eq!(over.credit_excess().value(), dec!(100));
    }

    #[test]
    fn equity_pure_cash() {
        let metrics = calculate_account_metrics(&account_with(10, 0, 100), &[]);
        assert_eq!(metrics.equity.value(), dec!(10));
    }

    #[test]
    fn equity_long_on_margin() {
        // bought 20 of value with 10 borrowed: net worth 10
        let metrics =
            calculate_account_metrics(&account_with(0, 10, 100), &[position(20, 1, 1)]);
        assert_eq!(metrics.long_value.value(), dec!(20));
        assert_eq!(metrics.equity.value(), dec!(10));
    }

    #[test]
    fn equity_short_in_profit() {
        // cash 10, shorted 100 notional (reserved as credit), mark dropped to 90
        let metrics =
            calculate_account_metrics(&account_with(10, 100, 500), &[position(-100, 1, 1)]);
        // short_initial = 100, short_current = 100 at mark 1; drop the mark:
        let mut pos = position(-100, 1, 1);
        pos.mark(Price::new_unchecked(dec!(0.9)));
        let metrics_after = calculate_account_metrics(&account_with(10, 100, 500), &[pos]);

        // at entry mark: 10 + 0 - 100 - 100 + 200 = 10
        assert_eq!(metrics.equity.value(), dec!(10));
        // after the drop: current value floors to 90 -> 10 profit
        assert_eq!(metrics_after.short_current_value.value(), dec!(90));
        assert_eq!(metrics_after.equity.value(), dec!(20));
    }
}

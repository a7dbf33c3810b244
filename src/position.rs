// 4.0: position tracking. quantity is a signed share count: positive = long,
// negative = short. a position exists only while its quantity is non-zero.
// 4.2+ has the average-price transition rules shared by the executor.

use crate::types::{gross_amount, Price, Quote, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: Symbol,
    pub name: String,
    pub quantity: i64,
    // cost basis per share for longs, entry sell price per share for shorts
    pub average_price: Price,
    // last mark, informational
    pub current_price: Price,
    // floor(|quantity| * current_price), informational
    pub valuation: Quote,
}

impl Position {
    pub fn new(symbol: Symbol, name: String, quantity: i64, average_price: Price, mark: Price) -> Self {
        debug_assert!(quantity != 0, "a zero position must be deleted, not stored");
        Self {
            symbol,
            name,
            quantity,
            average_price,
            current_price: mark,
            valuation: gross_amount(mark, quantity.abs()),
        }
    }

    pub fn is_long(&self) -> bool {
        self.quantity > 0
    }

    pub fn is_short(&self) -> bool {
        self.quantity < 0
    }

    pub fn abs_quantity(&self) -> i64 {
        self.quantity.abs()
    }

    // 4.1: refresh the informational mark and valuation
    pub fn mark(&mut self, price: Price) {
        self.current_price = price;
        self.valuation = gross_amount(price, self.quantity.abs());
    }
}

// 4.2: cost-weighted average for adding to a long.
// floor((avg * old_qty + cost) / new_qty)
pub fn long_add_average(current_avg: Price, current_qty: i64, cost: Quote, new_qty: i64) -> Price {
    debug_assert!(current_qty > 0 && new_qty > current_qty);
    let carried = current_avg.value() * Decimal::from(current_qty);
    Price::new_unchecked(((carried + cost.value()) / Decimal::from(new_qty)).floor())
}

// 4.3: sell-price-weighted average for opening or extending a short. the gross
// amount (fee not deducted) is what the margin reservation carries, so it is
// what the average carries too. `current` is None when starting from flat.
pub fn short_extend_average(current: Option<(Price, i64)>, amount: Quote, new_abs_qty: i64) -> Price {
    debug_assert!(new_abs_qty > 0);
    let carried = match current {
        Some((avg, abs_qty)) => avg.value() * Decimal::from(abs_qty),
        None => Decimal::ZERO,
    };
    Price::new_unchecked(((carried + amount.value()) / Decimal::from(new_abs_qty)).floor())
}

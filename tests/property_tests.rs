//! Property-based tests for the core accounting math.
//!
//! These verify ledger invariants under randomized order flow.

use broker_core::*;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn rich_executor() -> OrderExecutor {
    // funds large enough that no randomized order is rejected
    let config = LedgerConfig::default();
    let store = Arc::new(LedgerStore::new(&config));
    OrderExecutor::new(store, config)
}

fn request(uid: UserId, price: Decimal, quantity: i64) -> OrderRequest {
    OrderRequest {
        uid,
        symbol: Symbol::new("005930"),
        name: "Samsung Electronics".to_string(),
        market: "KOSPI".to_string(),
        price: Price::new_unchecked(price),
        quantity,
        kind: OrderKind::Market,
    }
}

fn price_strategy() -> impl Strategy<Value = Decimal> {
    (100i64..1_000_000i64).prop_map(Decimal::from)
}

fn fill_strategy() -> impl Strategy<Value = Vec<(bool, i64)>> {
    proptest::collection::vec((any::<bool>(), 1i64..50i64), 1..25)
}

proptest! {
    /// Position quantity after N fills equals the signed sum of fill
    /// quantities, and vanishes from the store exactly at zero.
    #[test]
    fn quantity_is_signed_sum_of_fills(
        price in price_strategy(),
        fills in fill_strategy(),
    ) {
        let executor = rich_executor();
        let uid = executor.store().create_account(
            Quote::new(dec!(1_000_000_000_000)),
            Quote::new(dec!(1_000_000_000_000)),
        );

        let mut expected = 0i64;
        for (is_buy, qty) in fills {
            if is_buy {
                executor.execute_buy(&request(uid, price, qty)).unwrap();
                expected += qty;
            } else {
                executor.execute_sell(&request(uid, price, qty)).unwrap();
                expected -= qty;
            }

            let stored = executor
                .store()
                .position(uid, &Symbol::new("005930"))
                .map_or(0, |p| p.quantity);
            prop_assert_eq!(stored, expected);
        }
    }

    /// Cash never goes negative no matter the order mix.
    #[test]
    fn cash_stays_non_negative(
        price in price_strategy(),
        fills in fill_strategy(),
    ) {
        let executor = rich_executor();
        let uid = executor.store().create_account(
            Quote::new(dec!(1_000_000_000_000)),
            Quote::new(dec!(1_000_000_000_000)),
        );

        for (is_buy, qty) in fills {
            let _ = if is_buy {
                executor.execute_buy(&request(uid, price, qty))
            } else {
                executor.execute_sell(&request(uid, price, qty))
            };

            let account = executor.store().account(uid).unwrap();
            prop_assert!(!account.balance.is_negative());
        }
    }

    /// Every sell leg's fee is the floored 0.05% of its gross amount, and
    /// proceeds never exceed the gross amount.
    #[test]
    fn sell_fee_is_floored_five_bps(
        price in price_strategy(),
        qty in 1i64..500i64,
    ) {
        let executor = rich_executor();
        let uid = executor.store().create_account(
            Quote::new(dec!(1_000_000_000_000)),
            Quote::new(dec!(1_000_000_000_000)),
        );

        executor.execute_buy(&request(uid, price, qty)).unwrap();
        let receipt = executor.execute_sell(&request(uid, price, qty)).unwrap();

        let expected_fee = receipt.amount.mul(dec!(0.0005)).floor();
        prop_assert_eq!(receipt.fee, expected_fee);
        prop_assert!(receipt.proceeds() <= receipt.amount);
    }

    /// A buy-then-full-sell round trip at one price moves the balance by
    /// exactly the sell fee.
    #[test]
    fn round_trip_loses_only_the_fee(
        price in price_strategy(),
        qty in 1i64..500i64,
    ) {
        let executor = rich_executor();
        let start = dec!(1_000_000_000_000);
        let uid = executor
            .store()
            .create_account(Quote::new(start), Quote::zero());

        executor.execute_buy(&request(uid, price, qty)).unwrap();
        let receipt = executor.execute_sell(&request(uid, price, qty)).unwrap();

        let account = executor.store().account(uid).unwrap();
        prop_assert_eq!(account.balance.value(), start - receipt.fee.value());
        prop_assert_eq!(account.used_credit.value(), Decimal::ZERO);
    }

    /// Covering an entire short releases exactly the reserved margin.
    #[test]
    fn short_round_trip_releases_all_margin(
        price in price_strategy(),
        qty in 1i64..500i64,
    ) {
        let executor = rich_executor();
        let uid = executor.store().create_account(
            Quote::new(dec!(1_000_000_000_000)),
            Quote::new(dec!(1_000_000_000_000)),
        );

        executor.execute_sell(&request(uid, price, qty)).unwrap();
        let account = executor.store().account(uid).unwrap();
        prop_assert!(account.used_credit > Quote::zero());

        executor.execute_buy(&request(uid, price, qty)).unwrap();
        let account = executor.store().account(uid).unwrap();
        prop_assert_eq!(account.used_credit.value(), Decimal::ZERO);
        prop_assert!(executor
            .store()
            .position(uid, &Symbol::new("005930"))
            .is_none());
    }

    /// gross_amount is the floor of price * quantity.
    #[test]
    fn gross_amount_floor_bounds(
        raw_price in 1i64..10_000_000i64,
        qty in 1i64..10_000i64,
    ) {
        let price = Price::new_unchecked(Decimal::new(raw_price, 2));
        let amount = gross_amount(price, qty).value();
        let exact = price.value() * Decimal::from(qty);
        prop_assert!(amount <= exact);
        prop_assert!(amount > exact - Decimal::ONE);
    }

    /// The LIFO lookback returns exactly the Buy/Cover records, newest first.
    #[test]
    fn lifo_lookback_matches_acquisitions(
        fills in fill_strategy(),
    ) {
        let executor = rich_executor();
        let uid = executor.store().create_account(
            Quote::new(dec!(1_000_000_000_000)),
            Quote::new(dec!(1_000_000_000_000)),
        );

        for (i, (is_buy, qty)) in fills.iter().enumerate() {
            executor.store().set_time(Timestamp::from_millis(i as i64));
            let req = request(uid, dec!(1000), *qty);
            if *is_buy {
                executor.execute_buy(&req).unwrap();
            } else {
                executor.execute_sell(&req).unwrap();
            }
        }

        let expected: Vec<TradeId> = {
            let mut records: Vec<TradeRecord> = executor
                .store()
                .transactions_for(uid)
                .into_iter()
                .filter(|t| t.kind.is_acquisition())
                .collect();
            records.reverse();
            records.into_iter().map(|t| t.id).collect()
        };

        let actual: Vec<TradeId> = executor
            .store()
            .recent_buy_transactions(uid, usize::MAX)
            .into_iter()
            .map(|t| t.id)
            .collect();

        prop_assert_eq!(actual, expected);
    }
}

//! Margin Brokerage Ledger Simulation.
//!
//! Walks the full engine lifecycle: cash and credit buys, short selling,
//! same-order position flips, the daily interest and liquidation job, and
//! limit-order matching.

use broker_core::*;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    println!("Margin Brokerage Ledger Engine Simulation");
    println!("Single Base Currency, Credit Line, Full Lifecycle\n");

    scenario_1_cash_and_credit_buys();
    scenario_2_short_and_cover();
    scenario_3_sell_through_flip();
    scenario_4_interest_and_liquidation();
    scenario_5_limit_orders();

    println!("\nAll simulations completed successfully.");
}

fn new_executor() -> OrderExecutor {
    let config = LedgerConfig::sandbox();
    let store = Arc::new(LedgerStore::new(&config));
    OrderExecutor::new(store, config)
}

fn samsung(uid: UserId, price: i64, quantity: i64, kind: OrderKind) -> OrderRequest {
    OrderRequest {
        uid,
        symbol: Symbol::new("005930"),
        name: "Samsung Electronics".to_string(),
        market: "KOSPI".to_string(),
        price: Price::new_unchecked(price.into()),
        quantity,
        kind,
    }
}

fn snapshot(price: i64) -> PriceSnapshot {
    let mut snap = PriceSnapshot::new("KRW", Timestamp::from_millis(0));
    snap.insert_quote(StockQuote {
        symbol: Symbol::new("005930"),
        name: "Samsung Electronics".to_string(),
        price: Price::new_unchecked(price.into()),
        currency: "KRW".to_string(),
        market: "KOSPI".to_string(),
    });
    snap
}

/// Cash first, credit second.
fn scenario_1_cash_and_credit_buys() {
    println!("Scenario 1: Cash and Credit Buys\n");

    let executor = new_executor();
    let alice = executor
        .store()
        .create_account(Quote::new(dec!(1_000_000)), Quote::new(dec!(1_000_000)));

    println!("  Alice starts with 1,000,000 cash and a 1,000,000 credit line");

    executor
        .execute_buy(&samsung(alice, 70_000, 10, OrderKind::Market))
        .unwrap();
    let account = executor.store().account(alice).unwrap();
    println!(
        "  BUY 10 @ 70,000: balance {}, used credit {}",
        account.balance, account.used_credit
    );

    executor
        .execute_buy(&samsung(alice, 80_000, 10, OrderKind::Market))
        .unwrap();
    let account = executor.store().account(alice).unwrap();
    let position = executor
        .store()
        .position(alice, &Symbol::new("005930"))
        .unwrap();
    println!(
        "  BUY 10 @ 80,000: balance {}, used credit {}, avg {}",
        account.balance, account.used_credit, position.average_price
    );

    let receipt = executor
        .execute_sell(&samsung(alice, 82_000, 20, OrderKind::Market))
        .unwrap();
    let account = executor.store().account(alice).unwrap();
    println!(
        "  SELL 20 @ 82,000: proceeds {}, profit {}, balance {}, used credit {}\n",
        receipt.proceeds(),
        receipt.profit,
        account.balance,
        account.used_credit
    );
}

/// Shorting reserves margin; covering releases it and realizes the spread.
fn scenario_2_short_and_cover() {
    println!("Scenario 2: Short and Cover\n");

    let executor = new_executor();
    let bob = executor
        .store()
        .create_account(Quote::new(dec!(1_000_000)), Quote::new(dec!(1_000_000)));

    executor
        .execute_sell(&samsung(bob, 70_000, 5, OrderKind::Market))
        .unwrap();
    let account = executor.store().account(bob).unwrap();
    println!(
        "  SHORT 5 @ 70,000: balance {} (unchanged), margin held {}",
        account.balance, account.used_credit
    );

    let receipt = executor
        .execute_buy(&samsung(bob, 60_000, 8, OrderKind::Market))
        .unwrap();
    let account = executor.store().account(bob).unwrap();
    let position = executor
        .store()
        .position(bob, &Symbol::new("005930"))
        .unwrap();
    println!(
        "  BUY 8 @ 60,000: covers 5 (profit {}), flips long {} @ {}",
        receipt.profit, position.quantity, position.average_price
    );
    println!(
        "  balance {}, used credit {}\n",
        account.balance, account.used_credit
    );
}

/// Selling through a long position splits into a Sell and a Short record.
fn scenario_3_sell_through_flip() {
    println!("Scenario 3: Sell Through a Long Into a Short\n");

    let executor = new_executor();
    let carol = executor
        .store()
        .create_account(Quote::new(dec!(700_000)), Quote::new(dec!(10_000_000)));

    executor
        .execute_buy(&samsung(carol, 70_000, 10, OrderKind::Market))
        .unwrap();
    println!("  Carol owns 10 @ 70,000, balance 0");

    executor
        .execute_sell(&samsung(carol, 70_000, 15, OrderKind::Market))
        .unwrap();

    for trade in executor.store().transactions_for(carol) {
        println!(
            "  {:?} qty {} amount {} fee {} profit {}",
            trade.kind, trade.quantity, trade.amount, trade.fee, trade.profit
        );
    }
    let position = executor
        .store()
        .position(carol, &Symbol::new("005930"))
        .unwrap();
    println!(
        "  resulting position: {} @ {}\n",
        position.quantity, position.average_price
    );
}

/// Interest pushes an account over its limit; the daily job unwinds it.
fn scenario_4_interest_and_liquidation() {
    println!("Scenario 4: Interest Accrual and Forced Liquidation\n");

    let executor = new_executor();
    let dave = executor
        .store()
        .create_account(Quote::zero(), Quote::new(dec!(500_000)));

    executor
        .execute_buy(&samsung(dave, 70_000, 7, OrderKind::Market))
        .unwrap();
    executor
        .store()
        .with_account(dave, |txn| {
            txn.account.last_interest_date = Some("2024-02-03".parse().unwrap());
            Ok(())
        })
        .unwrap();
    println!("  Dave bought 7 @ 70,000 fully on credit (490,000 of a 500,000 line)");
    println!("  30 days pass without repayment...");

    let report = run_interest_and_liquidation(
        &executor,
        &snapshot(70_000),
        "2024-03-04".parse().unwrap(),
    );
    let account = executor.store().account(dave).unwrap();
    println!(
        "  interest charged {}, forced trades {}, used credit now {} (limit {})",
        report.interest_total, report.forced_trades, account.used_credit, account.credit_limit
    );

    let positions = executor.store().positions_for(dave);
    let metrics = calculate_account_metrics(&account, &positions);
    println!("  equity after liquidation: {}\n", metrics.equity);
}

/// Limit orders fire on snapshot prices and settle exactly once.
fn scenario_5_limit_orders() {
    println!("Scenario 5: Limit Order Matching\n");

    let executor = new_executor();
    let erin = executor
        .store()
        .create_account(Quote::new(dec!(1_000_000)), Quote::zero());

    let order_id = executor.store().submit_limit_order(LimitOrderDraft {
        uid: erin,
        symbol: Symbol::new("005930"),
        name: "Samsung Electronics".to_string(),
        side: OrderSide::Buy,
        target_price: Price::new_unchecked(dec!(69_000)),
        currency: "KRW".to_string(),
        quantity: 10,
    });
    println!("  Erin places BUY 10 if price <= 69,000");

    let report = run_limit_order_matching(&executor, &snapshot(70_000));
    println!(
        "  at 70,000: {} completed, order still pending: {}",
        report.completed,
        executor.store().limit_order(order_id).unwrap().is_pending()
    );

    let report = run_limit_order_matching(&executor, &snapshot(68_500));
    let order = executor.store().limit_order(order_id).unwrap();
    println!(
        "  at 68,500: {} completed, status {:?}",
        report.completed, order.status
    );

    let position = executor
        .store()
        .position(erin, &Symbol::new("005930"))
        .unwrap();
    println!(
        "  filled at the current price: {} shares @ {}",
        position.quantity, position.average_price
    );
}

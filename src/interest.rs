// 5.0 interest.rs: the daily batch. first interest accrues on every borrowed
// balance, then accounts over their credit limit are forcibly unwound through
// the order executor. each forced trade is its own atomic transaction and the
// excess is recomputed from fresh state after every one, so a crash mid-pass
// loses nothing: the next run picks up from whatever committed.
//
// unwind order is LIFO over recent Buy/Cover records, then an unordered
// full-portfolio sweep for whatever the lookback window missed. symbols the
// snapshot cannot price are skipped and the account stays over-limit until a
// later run can price them.

use crate::executor::{OrderExecutor, OrderKind, OrderRequest};
use crate::price_feed::PriceSnapshot;
use crate::results::{InterestJobReport, TradeError};
use crate::types::{Quote, Symbol, UserId};
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{error, info, warn};

/// Daily entry point. Idempotent per calendar day: a second run on the same
/// `today` accrues nothing and only retries unresolved liquidations.
pub fn run_interest_and_liquidation(
    executor: &OrderExecutor,
    snapshot: &PriceSnapshot,
    today: NaiveDate,
) -> InterestJobReport {
    let mut report = InterestJobReport::empty();
    let users = executor.store().users_with_credit();
    report.accounts_scanned = users.len();

    for uid in users {
        match accrue_interest(executor, uid, today) {
            Ok(interest) if interest > Quote::zero() => {
                info!(%uid, %interest, "interest accrued");
                report.accounts_charged += 1;
                report.interest_total = report.interest_total.add(interest);
            }
            Ok(_) => {}
            Err(e) => {
                // one account's failure must not stall the batch
                error!(%uid, error = %e, "interest accrual failed");
                continue;
            }
        }

        let Some(account) = executor.store().account(uid) else {
            continue;
        };
        if !account.is_over_limit() {
            continue;
        }

        info!(%uid, excess = %account.credit_excess(), "over credit limit, liquidating");
        liquidate_account(executor, snapshot, uid, &mut report);

        match executor.store().account(uid) {
            Some(after) if after.is_over_limit() => {
                warn!(%uid, excess = %after.credit_excess(), "liquidation left account over limit");
                report.unresolved.push(uid);
            }
            _ => report.accounts_liquidated += 1,
        }
    }

    info!(
        scanned = report.accounts_scanned,
        charged = report.accounts_charged,
        interest = %report.interest_total,
        liquidated = report.accounts_liquidated,
        forced_trades = report.forced_trades,
        "daily interest and liquidation finished"
    );
    report
}

// 5.1: one account's accrual, atomically. a missing date is initialized to
// today without charging (first-run safety); same-day reruns are no-ops.
fn accrue_interest(
    executor: &OrderExecutor,
    uid: UserId,
    today: NaiveDate,
) -> Result<Quote, TradeError> {
    let rate = executor.config().daily_interest_rate;
    let (interest, _) = executor.store().with_account(uid, |txn| {
        let Some(last) = txn.account.last_interest_date else {
            txn.account.last_interest_date = Some(today);
            return Ok(Quote::zero());
        };

        let days = (today - last).num_days();
        if days <= 0 {
            return Ok(Quote::zero());
        }

        let interest = txn
            .account
            .used_credit
            .mul(rate * Decimal::from(days))
            .floor();
        txn.account.used_credit = txn.account.used_credit.add(interest);
        txn.account.last_interest_date = Some(today);
        Ok(interest)
    })?;
    Ok(interest)
}

// 5.2: LIFO pass over recent acquisitions, then the full-portfolio fallback.
fn liquidate_account(
    executor: &OrderExecutor,
    snapshot: &PriceSnapshot,
    uid: UserId,
    report: &mut InterestJobReport,
) {
    let lookback = executor.config().liquidation_lookback;

    let mut lifo_symbols: Vec<Symbol> = Vec::new();
    for record in executor.store().recent_buy_transactions(uid, lookback) {
        if let Some(symbol) = record.symbol {
            if !lifo_symbols.contains(&symbol) {
                lifo_symbols.push(symbol);
            }
        }
    }
    unwind_symbols(executor, snapshot, uid, &lifo_symbols, report);

    let still_over = executor
        .store()
        .account(uid)
        .is_some_and(|a| a.is_over_limit());
    if still_over {
        let portfolio: Vec<Symbol> = executor
            .store()
            .positions_for(uid)
            .into_iter()
            .map(|p| p.symbol)
            .collect();
        unwind_symbols(executor, snapshot, uid, &portfolio, report);
    }
}

fn unwind_symbols(
    executor: &OrderExecutor,
    snapshot: &PriceSnapshot,
    uid: UserId,
    symbols: &[Symbol],
    report: &mut InterestJobReport,
) {
    let fee_rate = executor.config().sell_fee_rate;

    for symbol in symbols {
        let Some(account) = executor.store().account(uid) else {
            return;
        };
        let excess = account.credit_excess();
        if !(excess > Quote::zero()) {
            return;
        }

        let Some(position) = executor.store().position(uid, symbol) else {
            continue;
        };

        let Some(quote) = snapshot.lookup(symbol) else {
            warn!(%uid, %symbol, "no price for held symbol, skipping");
            report.skipped_symbols += 1;
            continue;
        };
        let Some(price) = snapshot.price_in_base(symbol) else {
            warn!(%uid, %symbol, currency = %quote.currency, "no fx rate, skipping");
            report.skipped_symbols += 1;
            continue;
        };

        let request = if position.is_long() {
            // each share nets price * (1 - fee); sell just enough
            let per_share = price.value() * (Decimal::ONE - fee_rate);
            let shares = shares_to_unwind(excess, per_share).min(position.quantity);
            OrderRequest {
                uid,
                symbol: symbol.clone(),
                name: quote.name.clone(),
                market: quote.market.clone(),
                price,
                quantity: shares,
                kind: OrderKind::Liquidation,
            }
        } else {
            // covering releases the entry average per share
            let per_share = position.average_price.value();
            let shares = shares_to_unwind(excess, per_share).min(position.abs_quantity());
            OrderRequest {
                uid,
                symbol: symbol.clone(),
                name: quote.name.clone(),
                market: quote.market.clone(),
                price,
                quantity: shares,
                kind: OrderKind::Liquidation,
            }
        };

        if request.quantity <= 0 {
            continue;
        }

        let result = if position.is_long() {
            executor.execute_sell(&request)
        } else {
            executor.execute_buy(&request)
        };

        match result {
            Ok(receipt) => {
                info!(
                    %uid,
                    %symbol,
                    quantity = receipt.filled_quantity,
                    %price,
                    "forced trade executed"
                );
                report.forced_trades += 1;
            }
            Err(e) => {
                error!(%uid, %symbol, error = %e, "forced trade failed");
            }
        }
    }
}

// floor(excess / per_share) + 1, clamped into i64 range
fn shares_to_unwind(excess: Quote, per_share: Decimal) -> i64 {
    if per_share <= Decimal::ZERO {
        return 0;
    }
    (excess.value() / per_share)
        .floor()
        .to_i64()
        .map(|n| n.saturating_add(1))
        .unwrap_or(i64::MAX)
}

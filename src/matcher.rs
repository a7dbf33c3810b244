// 9.0 matcher.rs: the periodic limit-order sweep. each pending order is
// checked against the snapshot: convert the current price into the order's
// currency, compare against the target, and on a trigger execute through the
// order executor at the CURRENT price, not the target. the order then settles
// exactly once: Completed with the executed price, or Failed with the
// executor's error. unpriced symbols just wait for the next cycle.

use crate::executor::{OrderExecutor, OrderKind, OrderRequest};
use crate::limit_order::OrderSide;
use crate::price_feed::PriceSnapshot;
use crate::results::MatchingReport;
use tracing::{debug, error, info, warn};

/// Periodic entry point; the scheduling layer calls this on a short interval.
pub fn run_limit_order_matching(
    executor: &OrderExecutor,
    snapshot: &PriceSnapshot,
) -> MatchingReport {
    let mut report = MatchingReport::empty();
    let pending = executor.store().pending_limit_orders();
    report.scanned = pending.len();

    for order in pending {
        let Some(quote) = snapshot.lookup(&order.symbol) else {
            debug!(order_id = ?order.id, symbol = %order.symbol, "no quote, retry next cycle");
            report.skipped_no_price += 1;
            continue;
        };

        let Some(compare_price) = snapshot.price_in_currency(&order.symbol, &order.currency)
        else {
            warn!(
                order_id = ?order.id,
                symbol = %order.symbol,
                currency = %order.currency,
                "no fx rate for comparison, retry next cycle"
            );
            report.skipped_no_price += 1;
            continue;
        };

        if !order.should_trigger(compare_price) {
            continue;
        }

        let Some(executed_price) = snapshot.price_in_base(&order.symbol) else {
            report.skipped_no_price += 1;
            continue;
        };

        let request = OrderRequest {
            uid: order.uid,
            symbol: order.symbol.clone(),
            name: quote.name.clone(),
            market: quote.market.clone(),
            price: executed_price,
            quantity: order.quantity,
            kind: OrderKind::Limit,
        };

        let result = match order.side {
            OrderSide::Buy => executor.execute_buy(&request),
            OrderSide::Sell => executor.execute_sell(&request),
        };

        match result {
            Ok(_) => {
                if let Err(e) = executor
                    .store()
                    .complete_limit_order(order.id, executed_price)
                {
                    error!(order_id = ?order.id, error = %e, "could not mark order completed");
                } else {
                    info!(
                        order_id = ?order.id,
                        uid = %order.uid,
                        symbol = %order.symbol,
                        price = %executed_price,
                        "limit order filled"
                    );
                    report.completed += 1;
                }
            }
            Err(e) => {
                warn!(order_id = ?order.id, uid = %order.uid, error = %e, "limit order failed");
                if let Err(settle_err) = executor.store().fail_limit_order(order.id, e.to_string())
                {
                    error!(order_id = ?order.id, error = %settle_err, "could not mark order failed");
                }
                report.failed += 1;
            }
        }
    }

    info!(
        scanned = report.scanned,
        completed = report.completed,
        failed = report.failed,
        skipped = report.skipped_no_price,
        "limit order matching finished"
    );
    report
}

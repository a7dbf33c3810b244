// broker-core: margin brokerage ledger engine.
// accounting-first architecture: the order transaction and the credit
// bookkeeping take priority. all computation is deterministic; market data
// and durable storage stay behind explicit seams.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: UserId, Symbol, Price, Quote, Timestamp
//   2.x  executor.rs: atomic buy/sell transition, cover and flip rules
//   3.x  trade.rs: append-only ledger records, LIFO input
//   4.x  position.rs: signed positions, average-price transitions
//   5.x  interest.rs: daily interest accrual + forced liquidation job
//   6.x  store.rs: repository with optimistic-concurrency transactions
//   7.x  config.rs: fees, interest, credit, retry bounds
//   8.x  results.rs: receipts, batch reports, error taxonomy
//   9.x  matcher.rs: limit-order sweep
//   10.x account.rs: accounts, credit line, equity metrics
//   11.x limit_order.rs: standing orders and trigger rules
//   12.x price_feed.rs: explicit price snapshot + fx conversion

// core ledger modules
pub mod account;
pub mod executor;
pub mod position;
pub mod store;
pub mod trade;
pub mod types;

// batch jobs
pub mod interest;
pub mod matcher;

// integration modules
pub mod config;
pub mod limit_order;
pub mod price_feed;
pub mod results;

// re exports for convenience
pub use account::*;
pub use config::{ConfigError, LedgerConfig};
pub use executor::*;
pub use interest::*;
pub use limit_order::*;
pub use matcher::*;
pub use position::*;
pub use price_feed::*;
pub use results::*;
pub use store::*;
pub use trade::*;
pub use types::*;

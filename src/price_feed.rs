// Price Snapshot
//
// This module abstracts how the ledger sees market prices. The core is
// agnostic to whether quotes come from an exchange scraper, a vendor feed, or
// a fixture: callers hand the batch jobs an explicit snapshot with a defined
// capture time, instead of the jobs reading process-global caches. A symbol
// missing from the snapshot simply cannot be priced this cycle.

use crate::types::{Price, Symbol, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single instrument quote as fetched upstream, in its native currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockQuote {
    pub symbol: Symbol,
    pub name: String,
    pub price: Price,
    pub currency: String,
    pub market: String,
}

/// Point-in-time view of quotes plus FX rates into the base currency.
#[derive(Debug, Clone)]
pub struct PriceSnapshot {
    base_currency: String,
    quotes: HashMap<Symbol, StockQuote>,
    // currency code -> units of base currency per unit
    fx_rates: HashMap<String, Decimal>,
    pub taken_at: Timestamp,
}

impl PriceSnapshot {
    pub fn new(base_currency: impl Into<String>, taken_at: Timestamp) -> Self {
        Self {
            base_currency: base_currency.into(),
            quotes: HashMap::new(),
            fx_rates: HashMap::new(),
            taken_at,
        }
    }

    pub fn base_currency(&self) -> &str {
        &self.base_currency
    }

    pub fn insert_quote(&mut self, quote: StockQuote) {
        self.quotes.insert(quote.symbol.clone(), quote);
    }

    pub fn set_fx_rate(&mut self, currency: impl Into<String>, rate: Decimal) {
        self.fx_rates.insert(currency.into(), rate);
    }

    pub fn lookup(&self, symbol: &Symbol) -> Option<&StockQuote> {
        self.quotes.get(symbol)
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    fn rate_to_base(&self, currency: &str) -> Option<Decimal> {
        if currency == self.base_currency {
            return Some(Decimal::ONE);
        }
        self.fx_rates.get(currency).copied()
    }

    /// Quote price converted into the base currency, floored. None when the
    /// symbol is absent or no FX rate is known for its currency.
    pub fn price_in_base(&self, symbol: &Symbol) -> Option<Price> {
        let quote = self.lookup(symbol)?;
        self.convert(quote.price, &quote.currency, &self.base_currency)
    }

    /// Quote price converted into an arbitrary currency for comparison.
    /// Same-currency lookups pass through unconverted.
    pub fn price_in_currency(&self, symbol: &Symbol, currency: &str) -> Option<Price> {
        let quote = self.lookup(symbol)?;
        self.convert(quote.price, &quote.currency, currency)
    }

    fn convert(&self, price: Price, from: &str, to: &str) -> Option<Price> {
        if from == to {
            return Some(price);
        }
        let rate = self.rate_to_base(from)? / self.rate_to_base(to)?;
        Price::new((price.value() * rate).floor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn snapshot() -> PriceSnapshot {
        let mut snap = PriceSnapshot::new("KRW", Timestamp::from_millis(0));
        snap.set_fx_rate("USD", dec!(1400));
        snap.insert_quote(StockQuote {
            symbol: Symbol::new("005930"),
            name: "Samsung Electronics".to_string(),
            price: Price::new_unchecked(dec!(70000)),
            currency: "KRW".to_string(),
            market: "KOSPI".to_string(),
        });
        snap.insert_quote(StockQuote {
            symbol: Symbol::new("AAPL"),
            name: "Apple".to_string(),
            price: Price::new_unchecked(dec!(210.55)),
            currency: "USD".to_string(),
            market: "NASDAQ".to_string(),
        });
        snap
    }

    #[test]
    fn lookup_missing_symbol() {
        assert!(snapshot().lookup(&Symbol::new("GONE")).is_none());
        assert!(snapshot().price_in_base(&Symbol::new("GONE")).is_none());
    }

    #[test]
    fn base_currency_passes_through() {
        let snap = snapshot();
        let price = snap.price_in_base(&Symbol::new("005930")).unwrap();
        assert_eq!(price.value(), dec!(70000));
    }

    #[test]
    fn foreign_price_converts_and_floors() {
        let snap = snapshot();
        // 210.55 * 1400 = 294770 exactly; nudge the rate to force flooring
        let price = snap.price_in_base(&Symbol::new("AAPL")).unwrap();
        assert_eq!(price.value(), dec!(294770));

        let mut snap = snapshot();
        snap.set_fx_rate("USD", dec!(1400.7));
        let price = snap.price_in_base(&Symbol::new("AAPL")).unwrap();
        // 210.55 * 1400.7 = 294917.385 -> 294917
        assert_eq!(price.value(), dec!(294917));
    }

    #[test]
    fn comparison_currency_conversion() {
        let snap = snapshot();
        // order priced in KRW comparing a USD quote
        let compare = snap
            .price_in_currency(&Symbol::new("AAPL"), "KRW")
            .unwrap();
        assert_eq!(compare.value(), dec!(294770));

        // same currency: no conversion, no flooring
        let raw = snap.price_in_currency(&Symbol::new("AAPL"), "USD").unwrap();
        assert_eq!(raw.value(), dec!(210.55));
    }

    #[test]
    fn unknown_fx_rate_yields_none() {
        let mut snap = snapshot();
        snap.insert_quote(StockQuote {
            symbol: Symbol::new("7203"),
            name: "Toyota".to_string(),
            price: Price::new_unchecked(dec!(2500)),
            currency: "JPY".to_string(),
            market: "TSE".to_string(),
        });
        assert!(snap.price_in_base(&Symbol::new("7203")).is_none());
    }
}

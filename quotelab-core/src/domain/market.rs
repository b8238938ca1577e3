//! Market — the latest known quote per product.

use super::quote::{Quote, TimeKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mutable store of the most recent non-clock quote per product.
///
/// Created once per run with a fixed universe and mutated in place by the
/// engine; never shared across concurrent runs. `quotes` never contains an
/// entry for the clock sentinel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    universe: Vec<String>,
    quotes: BTreeMap<String, Quote>,
    clock: Option<TimeKey>,
}

impl Market {
    /// Create a market for a universe. The universe is sorted and deduplicated
    /// so iteration order is stable regardless of how it was assembled.
    pub fn new(universe: Vec<String>) -> Self {
        let mut universe = universe;
        universe.sort();
        universe.dedup();
        Self {
            universe,
            quotes: BTreeMap::new(),
            clock: None,
        }
    }

    pub fn universe(&self) -> &[String] {
        &self.universe
    }

    /// Apply one quote. A clock sentinel only advances the visible time; any
    /// other quote overwrites the product's slot.
    pub fn update(&mut self, quote: &Quote) {
        if quote.is_clock() {
            self.clock = Some(quote.time_key.clone());
        } else {
            self.quotes.insert(quote.product_id.clone(), quote.clone());
        }
    }

    /// Last known price, or `None` if the product has never quoted.
    ///
    /// Strategies must handle the `None` case themselves; it is not an
    /// engine-level fault.
    pub fn price_of(&self, product_id: &str) -> Option<f64> {
        self.quotes.get(product_id).map(|q| q.price)
    }

    /// Last known full quote for a product.
    pub fn quote_of(&self, product_id: &str) -> Option<&Quote> {
        self.quotes.get(product_id)
    }

    /// The time key of the most recent clock sentinel, if any has arrived.
    pub fn time(&self) -> Option<&TimeKey> {
        self.clock.as_ref()
    }

    /// Number of products that have quoted at least once.
    pub fn quoted_count(&self) -> usize {
        self.quotes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::quote::CLOCK;

    fn market() -> Market {
        Market::new(vec!["TSLA".into(), "AAPL".into(), "AAPL".into()])
    }

    #[test]
    fn universe_is_sorted_and_deduplicated() {
        assert_eq!(market().universe(), ["AAPL", "TSLA"]);
    }

    #[test]
    fn update_overwrites_latest_quote() {
        let mut m = market();
        m.update(&Quote::new("AAPL", TimeKey::Step(1), 100.0));
        m.update(&Quote::new("AAPL", TimeKey::Step(2), 101.5));
        assert_eq!(m.price_of("AAPL"), Some(101.5));
    }

    #[test]
    fn clock_is_never_stored_as_a_quote() {
        let mut m = market();
        m.update(&Quote::clock(TimeKey::Step(3)));
        assert_eq!(m.price_of(CLOCK), None);
        assert_eq!(m.quoted_count(), 0);
        assert_eq!(m.time(), Some(&TimeKey::Step(3)));
    }

    #[test]
    fn unquoted_product_has_no_price() {
        assert_eq!(market().price_of("TSLA"), None);
    }
}

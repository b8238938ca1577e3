//! Portfolio — cash plus signed positions behind a leverage-bounded gate.
//!
//! The two admission operations (`buy`/`sell`) are the only way state
//! changes. Each one is atomic: the hypothetical post-trade ledger is built
//! first, checked against the leverage limit, and either committed whole or
//! discarded whole. The accounting identity must hold at every observation
//! point: `net_asset_value == cash + sum(position market values)`.

use super::market::Market;
use super::position::Position;
use super::quote::TimeKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

/// Floor for the leverage denominator when NAV collapses to zero or below.
/// A damping choice, not an economic one: it keeps the ratio finite so the
/// limit check still rejects instead of dividing by zero.
pub const NAV_EPSILON: f64 = 1e-9;

/// Why a trade was refused. The portfolio is untouched in every case.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TradeError {
    #[error("projected leverage {projected:.4} exceeds limit {limit:.4}")]
    LeverageExceeded { projected: f64, limit: f64 },
    #[error("no market price for '{0}'")]
    PriceUnavailable(String),
    #[error("quantity must be positive and finite, got {0}")]
    InvalidQuantity(f64),
}

/// Accounting invariant breach: a held position without a market price.
/// Admission requires a known price at entry, so this cannot arise through
/// the public operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("held position '{0}' has no market price")]
    Valuation(String),
}

/// One committed trade. Quantity is signed: positive for buys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub time_key: Option<TimeKey>,
    pub product_id: String,
    pub quantity: f64,
    pub price: f64,
}

/// Read-only snapshot of the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub cash: f64,
    pub positions: BTreeMap<String, f64>,
    pub gross_exposure: f64,
    pub net_value: f64,
    pub leverage: f64,
}

/// Cash balance plus signed positions, bounded by a leverage limit.
#[derive(Debug, Clone)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_cash: f64,
    pub leverage_limit: f64,
    positions: BTreeMap<String, Position>,
    fills: Vec<Fill>,
}

impl Portfolio {
    pub fn new(initial_cash: f64, leverage_limit: f64) -> Self {
        Self {
            cash: initial_cash,
            initial_cash,
            leverage_limit,
            positions: BTreeMap::new(),
            fills: Vec::new(),
        }
    }

    /// Buy `quantity` units at the last known price. Rejections leave the
    /// ledger byte-for-byte unchanged.
    pub fn buy(
        &mut self,
        market: &Market,
        product_id: &str,
        quantity: f64,
    ) -> Result<(), TradeError> {
        self.admit(market, product_id, quantity)
    }

    /// Sell `quantity` units at the last known price. Selling more than is
    /// held crosses into a short position.
    pub fn sell(
        &mut self,
        market: &Market,
        product_id: &str,
        quantity: f64,
    ) -> Result<(), TradeError> {
        self.admit(market, product_id, -quantity)
    }

    fn admit(&mut self, market: &Market, product_id: &str, signed: f64) -> Result<(), TradeError> {
        if !signed.is_finite() || signed.abs() <= 0.0 {
            return Err(TradeError::InvalidQuantity(signed.abs()));
        }
        let price = market
            .price_of(product_id)
            .ok_or_else(|| TradeError::PriceUnavailable(product_id.to_string()))?;

        // Hypothetical post-trade state.
        let new_cash = self.cash - signed * price;
        let mut new_positions = self.positions.clone();
        let position = new_positions
            .entry(product_id.to_string())
            .or_insert_with(|| Position::new(product_id));
        position.apply(signed, price);
        if position.is_flat() {
            new_positions.remove(product_id);
        }

        let (mtm, gross) = mark_to_market(&new_positions, market)
            .map_err(|LedgerError::Valuation(id)| TradeError::PriceUnavailable(id))?;
        let nav = new_cash + mtm;
        let projected = gross / nav.max(NAV_EPSILON);
        if projected > self.leverage_limit {
            warn!(
                product = product_id,
                quantity = signed,
                projected,
                limit = self.leverage_limit,
                "trade rejected: leverage breach"
            );
            return Err(TradeError::LeverageExceeded {
                projected,
                limit: self.leverage_limit,
            });
        }

        self.cash = new_cash;
        self.positions = new_positions;
        self.fills.push(Fill {
            time_key: market.time().cloned(),
            product_id: product_id.to_string(),
            quantity: signed,
            price,
        });
        Ok(())
    }

    /// `cash + sum(quantity * last price)` over all held positions.
    pub fn net_asset_value(&self, market: &Market) -> Result<f64, LedgerError> {
        let (mtm, _) = mark_to_market(&self.positions, market)?;
        Ok(self.cash + mtm)
    }

    /// `sum(|quantity| * last price)` over all held positions.
    pub fn gross_exposure(&self, market: &Market) -> Result<f64, LedgerError> {
        let (_, gross) = mark_to_market(&self.positions, market)?;
        Ok(gross)
    }

    /// Gross exposure over damped NAV.
    pub fn leverage(&self, market: &Market) -> Result<f64, LedgerError> {
        let (mtm, gross) = mark_to_market(&self.positions, market)?;
        Ok(gross / (self.cash + mtm).max(NAV_EPSILON))
    }

    /// Read-only snapshot; no side effects.
    pub fn summary(&self, market: &Market) -> Result<PortfolioSummary, LedgerError> {
        let (mtm, gross) = mark_to_market(&self.positions, market)?;
        let net_value = self.cash + mtm;
        Ok(PortfolioSummary {
            cash: self.cash,
            positions: self
                .positions
                .iter()
                .map(|(id, p)| (id.clone(), p.quantity))
                .collect(),
            gross_exposure: gross,
            net_value,
            leverage: gross / net_value.max(NAV_EPSILON),
        })
    }

    pub fn position(&self, product_id: &str) -> Option<&Position> {
        self.positions.get(product_id)
    }

    /// Signed held quantity, zero when flat.
    pub fn quantity_of(&self, product_id: &str) -> f64 {
        self.positions.get(product_id).map_or(0.0, |p| p.quantity)
    }

    pub fn positions(&self) -> &BTreeMap<String, Position> {
        &self.positions
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }
}

/// Marked-to-market and gross value of a position set.
fn mark_to_market(
    positions: &BTreeMap<String, Position>,
    market: &Market,
) -> Result<(f64, f64), LedgerError> {
    let mut mtm = 0.0;
    let mut gross = 0.0;
    for (id, position) in positions {
        let price = market
            .price_of(id)
            .ok_or_else(|| LedgerError::Valuation(id.clone()))?;
        mtm += position.market_value(price);
        gross += position.exposure(price);
    }
    Ok((mtm, gross))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::quote::Quote;

    fn one_product_market() -> Market {
        let mut m = Market::new(vec!["AAPL".into()]);
        m.update(&Quote::new("AAPL", TimeKey::Step(0), 100.0));
        m
    }

    fn two_product_market() -> Market {
        let mut m = Market::new(vec!["AAPL".into(), "TSLA".into()]);
        m.update(&Quote::new("AAPL", TimeKey::Step(0), 100.0));
        m.update(&Quote::new("TSLA", TimeKey::Step(0), 200.0));
        m
    }

    #[test]
    fn buy_within_leverage_succeeds() {
        let market = one_product_market();
        let mut portfolio = Portfolio::new(10_000.0, 2.0);
        assert!(portfolio.buy(&market, "AAPL", 100.0).is_ok());
        let summary = portfolio.summary(&market).unwrap();
        assert!(summary.leverage <= 2.0);
        assert_eq!(summary.cash, 0.0);
        assert_eq!(summary.positions["AAPL"], 100.0);
    }

    #[test]
    fn buy_exceeding_leverage_is_rejected() {
        let market = one_product_market();
        let mut portfolio = Portfolio::new(10_000.0, 2.0);
        assert!(portfolio.buy(&market, "AAPL", 100.0).is_ok());
        let err = portfolio.buy(&market, "AAPL", 150.0).unwrap_err();
        assert!(matches!(err, TradeError::LeverageExceeded { .. }));
        assert_eq!(portfolio.quantity_of("AAPL"), 100.0);
    }

    #[test]
    fn short_within_leverage_raises_cash() {
        let market = one_product_market();
        let mut portfolio = Portfolio::new(10_000.0, 2.0);
        assert!(portfolio.sell(&market, "AAPL", 100.0).is_ok());
        let summary = portfolio.summary(&market).unwrap();
        assert!(summary.leverage <= 2.0);
        assert_eq!(portfolio.quantity_of("AAPL"), -100.0);
        assert_eq!(summary.cash, 20_000.0);
    }

    #[test]
    fn short_exceeding_leverage_is_rejected() {
        let market = one_product_market();
        let mut portfolio = Portfolio::new(10_000.0, 2.0);
        let err = portfolio.sell(&market, "AAPL", 300.0).unwrap_err();
        assert!(matches!(err, TradeError::LeverageExceeded { .. }));
        assert_eq!(portfolio.quantity_of("AAPL"), 0.0);
    }

    #[test]
    fn combined_long_short_respects_limit() {
        let market = two_product_market();
        let mut portfolio = Portfolio::new(10_000.0, 2.0);

        // 50 AAPL long (5k) + 40 TSLA short (8k) = 13k gross over 10k NAV.
        assert!(portfolio.buy(&market, "AAPL", 50.0).is_ok());
        assert!(portfolio.sell(&market, "TSLA", 40.0).is_ok());

        // 80 more AAPL would push gross to 21k over 10k NAV.
        let err = portfolio.buy(&market, "AAPL", 80.0).unwrap_err();
        assert!(matches!(err, TradeError::LeverageExceeded { .. }));
        assert_eq!(portfolio.quantity_of("AAPL"), 50.0);
        assert_eq!(portfolio.quantity_of("TSLA"), -40.0);
    }

    #[test]
    fn rejection_leaves_ledger_bitwise_unchanged() {
        let market = one_product_market();
        let mut portfolio = Portfolio::new(10_000.0, 2.0);
        portfolio.buy(&market, "AAPL", 37.0).unwrap();

        let cash_before = portfolio.cash.to_bits();
        let positions_before = portfolio.positions().clone();
        let fills_before = portfolio.fills().len();

        assert!(portfolio.buy(&market, "AAPL", 10_000.0).is_err());

        assert_eq!(portfolio.cash.to_bits(), cash_before);
        assert_eq!(portfolio.positions(), &positions_before);
        assert_eq!(portfolio.fills().len(), fills_before);
    }

    #[test]
    fn unknown_product_is_not_tradable() {
        let market = two_product_market();
        let mut portfolio = Portfolio::new(10_000.0, 2.0);
        let err = portfolio.buy(&market, "GME", 1.0).unwrap_err();
        assert_eq!(err, TradeError::PriceUnavailable("GME".into()));
    }

    #[test]
    fn non_positive_quantities_are_invalid() {
        let market = one_product_market();
        let mut portfolio = Portfolio::new(10_000.0, 2.0);
        assert!(matches!(
            portfolio.buy(&market, "AAPL", 0.0),
            Err(TradeError::InvalidQuantity(_))
        ));
        assert!(matches!(
            portfolio.sell(&market, "AAPL", f64::NAN),
            Err(TradeError::InvalidQuantity(_))
        ));
    }

    #[test]
    fn nav_identity_holds_after_trades() {
        let mut market = two_product_market();
        let mut portfolio = Portfolio::new(10_000.0, 2.0);
        portfolio.buy(&market, "AAPL", 30.0).unwrap();
        portfolio.sell(&market, "TSLA", 10.0).unwrap();

        market.update(&Quote::new("AAPL", TimeKey::Step(1), 110.0));
        market.update(&Quote::new("TSLA", TimeKey::Step(1), 180.0));

        let by_hand = portfolio.cash + 30.0 * 110.0 + (-10.0) * 180.0;
        assert_eq!(portfolio.net_asset_value(&market).unwrap(), by_hand);
    }

    #[test]
    fn fills_record_committed_trades_only() {
        let market = one_product_market();
        let mut portfolio = Portfolio::new(10_000.0, 2.0);
        portfolio.buy(&market, "AAPL", 10.0).unwrap();
        let _ = portfolio.buy(&market, "AAPL", 1_000_000.0);
        assert_eq!(portfolio.fills().len(), 1);
        assert_eq!(portfolio.fills()[0].quantity, 10.0);
        assert_eq!(portfolio.fills()[0].price, 100.0);
    }
}

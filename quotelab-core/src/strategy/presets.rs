//! Built-in strategies — contract examples, CLI presets, test fixtures.

use super::{SignalStrategy, Strategy, StrategyError, StrategyFactory};
use crate::domain::{Market, Portfolio, TradeError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

/// Named presets buildable from a CLI string.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyPreset {
    BuyAndHold,
    ClockMomentum { lookback: usize },
    Random { seed: u64 },
}

impl StrategyPreset {
    /// Parse a preset name: `buy-and-hold`, `momentum`, `random` or
    /// `random:<seed>`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "buy-and-hold" => Some(Self::BuyAndHold),
            "momentum" => Some(Self::ClockMomentum { lookback: 5 }),
            "random" => Some(Self::Random { seed: 42 }),
            other => other
                .strip_prefix("random:")
                .and_then(|seed| seed.parse().ok())
                .map(|seed| Self::Random { seed }),
        }
    }

    /// Every preset under its canonical name, for contest mode.
    pub fn all() -> Vec<(&'static str, Self)> {
        vec![
            ("buy-and-hold", Self::BuyAndHold),
            ("momentum", Self::ClockMomentum { lookback: 5 }),
            ("random", Self::Random { seed: 42 }),
        ]
    }
}

impl StrategyFactory for StrategyPreset {
    fn build(&self, _universe: &[String]) -> Result<Box<dyn Strategy>, StrategyError> {
        Ok(match self {
            Self::BuyAndHold => Box::new(BuyAndHold::new(None)),
            Self::ClockMomentum { lookback } => Box::new(ClockMomentum::new(*lookback)),
            Self::Random { seed } => Box::new(RandomTrader::new(*seed, 10.0)),
        })
    }
}

/// Buy the first quoted product once, then hold.
#[derive(Debug, Clone)]
pub struct BuyAndHold {
    product: Option<String>,
    invested: bool,
}

impl BuyAndHold {
    pub fn new(product: Option<String>) -> Self {
        Self {
            product,
            invested: false,
        }
    }
}

impl Strategy for BuyAndHold {
    fn name(&self) -> &str {
        "buy-and-hold"
    }

    fn on_quote(
        &mut self,
        market: &Market,
        portfolio: &mut Portfolio,
    ) -> Result<(), StrategyError> {
        if self.invested {
            return Ok(());
        }
        let target = match &self.product {
            Some(product) => market.price_of(product).map(|p| (product.clone(), p)),
            None => market
                .universe()
                .iter()
                .find_map(|id| market.price_of(id).map(|p| (id.clone(), p))),
        };
        let Some((product, price)) = target else {
            // Nothing has quoted yet; try again next batch.
            return Ok(());
        };
        // Leave a sliver of cash so rounding cannot tip the leverage check.
        let quantity = portfolio.cash * 0.999 / price;
        if quantity > 0.0 {
            portfolio.buy(market, &product, quantity)?;
            self.invested = true;
        }
        Ok(())
    }
}

/// Clock-driven momentum: go long products whose price rose over the
/// lookback window, flatten those that fell.
#[derive(Debug, Clone)]
pub struct ClockMomentum {
    lookback: usize,
    trade_fraction: f64,
    history: BTreeMap<String, Vec<f64>>,
}

impl ClockMomentum {
    pub fn new(lookback: usize) -> Self {
        Self {
            lookback: lookback.max(1),
            trade_fraction: 0.25,
            history: BTreeMap::new(),
        }
    }
}

impl Strategy for ClockMomentum {
    fn name(&self) -> &str {
        "momentum"
    }

    fn on_quote(
        &mut self,
        market: &Market,
        portfolio: &mut Portfolio,
    ) -> Result<(), StrategyError> {
        // One sample per product per batch.
        for product in market.universe() {
            if let Some(price) = market.price_of(product) {
                self.history.entry(product.clone()).or_default().push(price);
            }
        }

        for (product, series) in &self.history {
            if series.len() <= self.lookback {
                continue;
            }
            let now = series[series.len() - 1];
            let then = series[series.len() - 1 - self.lookback];
            let held = portfolio.quantity_of(product);

            if now > then && held == 0.0 {
                let quantity = portfolio.cash.max(0.0) * self.trade_fraction / now;
                if quantity > 0.0 {
                    match portfolio.buy(market, product, quantity) {
                        Ok(()) | Err(TradeError::LeverageExceeded { .. }) => {}
                        Err(err) => return Err(err.into()),
                    }
                }
            } else if now < then && held > 0.0 {
                match portfolio.sell(market, product, held) {
                    Ok(()) | Err(TradeError::LeverageExceeded { .. }) => {}
                    Err(err) => return Err(err.into()),
                }
            }
        }
        Ok(())
    }
}

/// Coin-flip trader with a seeded RNG. Exists to pin down determinism:
/// the same seed over the same batches must reproduce the same fills.
#[derive(Debug, Clone)]
pub struct RandomTrader {
    rng: StdRng,
    trade_quantity: f64,
}

impl RandomTrader {
    pub fn new(seed: u64, trade_quantity: f64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            trade_quantity,
        }
    }
}

impl Strategy for RandomTrader {
    fn name(&self) -> &str {
        "random"
    }

    fn on_quote(
        &mut self,
        market: &Market,
        portfolio: &mut Portfolio,
    ) -> Result<(), StrategyError> {
        if market.universe().is_empty() {
            return Ok(());
        }
        let pick = self.rng.gen_range(0..market.universe().len());
        let product = market.universe()[pick].clone();
        if market.price_of(&product).is_none() {
            return Ok(());
        }
        let quantity = self.trade_quantity * self.rng.gen_range(0.1..1.0);
        let result = if self.rng.gen_bool(0.5) {
            portfolio.buy(market, &product, quantity)
        } else {
            portfolio.sell(market, &product, quantity)
        };
        match result {
            Ok(()) | Err(TradeError::LeverageExceeded { .. }) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Vectorized momentum: +1 where price rose over the lookback, -1 where it
/// fell, 0 during warmup and on flat comparisons.
#[derive(Debug, Clone)]
pub struct MomentumSignal {
    pub lookback: usize,
}

impl SignalStrategy for MomentumSignal {
    fn generate_signals(&self, prices: &[f64]) -> Vec<f64> {
        (0..prices.len())
            .map(|t| {
                if t < self.lookback {
                    0.0
                } else if prices[t] > prices[t - self.lookback] {
                    1.0
                } else if prices[t] < prices[t - self.lookback] {
                    -1.0
                } else {
                    0.0
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Quote, TimeKey};

    fn quoted_market() -> Market {
        let mut m = Market::new(vec!["AAPL".into(), "TSLA".into()]);
        m.update(&Quote::new("AAPL", TimeKey::Step(0), 100.0));
        m.update(&Quote::new("TSLA", TimeKey::Step(0), 200.0));
        m
    }

    #[test]
    fn buy_and_hold_invests_exactly_once() {
        let market = quoted_market();
        let mut portfolio = Portfolio::new(10_000.0, 2.0);
        let mut strategy = BuyAndHold::new(None);

        strategy.on_quote(&market, &mut portfolio).unwrap();
        let held = portfolio.quantity_of("AAPL");
        assert!(held > 0.0);

        strategy.on_quote(&market, &mut portfolio).unwrap();
        assert_eq!(portfolio.quantity_of("AAPL"), held);
        assert_eq!(portfolio.fills().len(), 1);
    }

    #[test]
    fn buy_and_hold_waits_for_a_quote() {
        let market = Market::new(vec!["AAPL".into()]);
        let mut portfolio = Portfolio::new(10_000.0, 2.0);
        let mut strategy = BuyAndHold::new(None);
        strategy.on_quote(&market, &mut portfolio).unwrap();
        assert!(portfolio.fills().is_empty());
    }

    #[test]
    fn momentum_buys_rising_products() {
        let mut market = Market::new(vec!["AAPL".into()]);
        let mut portfolio = Portfolio::new(10_000.0, 2.0);
        let mut strategy = ClockMomentum::new(1);

        for (step, price) in [(0, 100.0), (1, 101.0)] {
            market.update(&Quote::new("AAPL", TimeKey::Step(step), price));
            market.update(&Quote::clock(TimeKey::Step(step)));
            strategy.on_quote(&market, &mut portfolio).unwrap();
        }
        assert!(portfolio.quantity_of("AAPL") > 0.0);
    }

    #[test]
    fn momentum_flattens_falling_products() {
        let mut market = Market::new(vec!["AAPL".into()]);
        let mut portfolio = Portfolio::new(10_000.0, 2.0);
        let mut strategy = ClockMomentum::new(1);

        for (step, price) in [(0, 100.0), (1, 101.0), (2, 95.0)] {
            market.update(&Quote::new("AAPL", TimeKey::Step(step), price));
            market.update(&Quote::clock(TimeKey::Step(step)));
            strategy.on_quote(&market, &mut portfolio).unwrap();
        }
        assert_eq!(portfolio.quantity_of("AAPL"), 0.0);
        assert_eq!(portfolio.fills().len(), 2);
    }

    #[test]
    fn random_trader_is_deterministic_per_seed() {
        let market = quoted_market();

        let run = |seed: u64| {
            let mut portfolio = Portfolio::new(10_000.0, 2.0);
            let mut strategy = RandomTrader::new(seed, 10.0);
            for _ in 0..20 {
                strategy.on_quote(&market, &mut portfolio).unwrap();
            }
            portfolio.fills().to_vec()
        };

        assert_eq!(run(7), run(7));
        assert_ne!(run(7), run(8));
    }

    #[test]
    fn momentum_signal_shape() {
        let prices = [1.0, 2.0, 1.5, 1.5, 3.0];
        let signals = MomentumSignal { lookback: 1 }.generate_signals(&prices);
        assert_eq!(signals, vec![0.0, 1.0, -1.0, 0.0, 1.0]);
    }

    #[test]
    fn preset_names_round_trip() {
        assert_eq!(StrategyPreset::parse("buy-and-hold"), Some(StrategyPreset::BuyAndHold));
        assert_eq!(
            StrategyPreset::parse("random:7"),
            Some(StrategyPreset::Random { seed: 7 })
        );
        assert_eq!(StrategyPreset::parse("nope"), None);
    }
}

//! The replay loop — batches in, NAV trajectory out.
//!
//! Per batch, in `Running`:
//! 1. apply every quote to the market, in batch order;
//! 2. invoke the strategy callback with `(&Market, &mut Portfolio)`;
//! 3. append the portfolio's net asset value to the NAV history.
//!
//! A failing callback — error return or panic — is recorded and swallowed;
//! the loop proceeds to the next batch with whatever partial mutations
//! occurred. No rollback is attempted. Batches are processed strictly
//! sequentially with no look-ahead: the strategy can only observe quotes
//! already applied in step 1 of the current or earlier batches.

use crate::domain::{Batch, Market, Portfolio};
use crate::engine::state::{BatchFailure, EngineError, EngineState, ReplayLog};
use crate::strategy::{Strategy, StrategyFactory};
use std::panic::{self, AssertUnwindSafe};
use tracing::{error, info};

/// Drives one backtest run. Owns an independent market/portfolio pair;
/// nothing is shared with other runs, so many engines may replay in
/// parallel without locking.
pub struct Engine {
    market: Market,
    portfolio: Portfolio,
    strategy: Box<dyn Strategy>,
    batches: Vec<Batch>,
    log: ReplayLog,
    state: EngineState,
}

impl Engine {
    /// Build a run: fixed universe, fresh market and portfolio, strategy
    /// from the factory.
    ///
    /// A factory failure or an empty batch sequence is fatal — the run is
    /// `Failed` before any trade can occur, surfaced here as `Err`.
    pub fn new(
        universe: Vec<String>,
        batches: Vec<Batch>,
        initial_cash: f64,
        leverage_limit: f64,
        factory: &dyn StrategyFactory,
    ) -> Result<Self, EngineError> {
        if batches.is_empty() {
            return Err(EngineError::NoBatches);
        }
        let market = Market::new(universe);
        let strategy = factory
            .build(market.universe())
            .map_err(EngineError::StrategyInit)?;
        Ok(Self {
            market,
            portfolio: Portfolio::new(initial_cash, leverage_limit),
            strategy,
            batches,
            log: ReplayLog::new(initial_cash),
            state: EngineState::Initializing,
        })
    }

    /// Replay every batch. Single-shot: a second call is an error.
    pub fn run(&mut self) -> Result<&ReplayLog, EngineError> {
        if self.state != EngineState::Initializing {
            return Err(EngineError::AlreadyRan(self.state));
        }
        self.state = EngineState::Running;
        info!(
            strategy = self.strategy.name(),
            batches = self.batches.len(),
            "replay started"
        );

        let batches = std::mem::take(&mut self.batches);
        for (batch_index, batch) in batches.iter().enumerate() {
            for quote in &batch.quotes {
                self.market.update(quote);
            }

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                self.strategy.on_quote(&self.market, &mut self.portfolio)
            }));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => self.record_failure(batch_index, batch, err.to_string()),
                Err(payload) => {
                    self.record_failure(batch_index, batch, panic_message(payload.as_ref()))
                }
            }

            let nav = match self.portfolio.net_asset_value(&self.market) {
                Ok(nav) => nav,
                Err(source) => {
                    self.state = EngineState::Failed;
                    return Err(EngineError::Valuation {
                        batch_index,
                        source,
                    });
                }
            };
            self.log.nav_history.push(nav);
            self.log.batches_run += 1;
        }

        self.state = EngineState::Completed;
        info!(
            batches_run = self.log.batches_run,
            failed = self.log.failed_batches(),
            final_nav = self.log.final_nav(),
            "replay completed"
        );
        Ok(&self.log)
    }

    fn record_failure(&mut self, batch_index: usize, batch: &Batch, message: String) {
        error!(batch_index, time_key = %batch.time_key, message = %message, "strategy failure isolated");
        self.log.failures.push(BatchFailure {
            batch_index,
            time_key: batch.time_key.clone(),
            message,
        });
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn market(&self) -> &Market {
        &self.market
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn log(&self) -> &ReplayLog {
        &self.log
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("strategy panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("strategy panicked: {message}")
    } else {
        "strategy panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Quote, TimeKey};
    use crate::strategy::{FnFactory, StrategyError};

    fn batches(n: i64) -> Vec<Batch> {
        (0..n)
            .map(|step| {
                Batch::new(
                    TimeKey::Step(step),
                    vec![
                        Quote::new("AAPL", TimeKey::Step(step), 100.0 + step as f64),
                        Quote::clock(TimeKey::Step(step)),
                    ],
                )
            })
            .collect()
    }

    struct Idle;
    impl Strategy for Idle {
        fn name(&self) -> &str {
            "idle"
        }
        fn on_quote(&mut self, _: &Market, _: &mut Portfolio) -> Result<(), StrategyError> {
            Ok(())
        }
    }

    fn idle_factory() -> FnFactory<fn(&[String]) -> Result<Box<dyn Strategy>, StrategyError>> {
        FnFactory(|_| Ok(Box::new(Idle)))
    }

    #[test]
    fn nav_history_is_seeded_and_grows_one_per_batch() {
        let mut engine = Engine::new(
            vec!["AAPL".into()],
            batches(3),
            50_000.0,
            2.0,
            &idle_factory(),
        )
        .unwrap();
        let log = engine.run().unwrap();
        assert_eq!(log.nav_history.len(), 4);
        assert_eq!(log.nav_history[0], 50_000.0);
        assert_eq!(log.batches_run, 3);
    }

    #[test]
    fn state_walks_initializing_to_completed() {
        let mut engine = Engine::new(
            vec!["AAPL".into()],
            batches(1),
            1_000.0,
            2.0,
            &idle_factory(),
        )
        .unwrap();
        assert_eq!(engine.state(), EngineState::Initializing);
        engine.run().unwrap();
        assert_eq!(engine.state(), EngineState::Completed);
    }

    #[test]
    fn no_batches_is_fatal_before_any_trade() {
        let result = Engine::new(
            vec!["AAPL".into()],
            Vec::new(),
            1_000.0,
            2.0,
            &idle_factory(),
        );
        assert!(matches!(result, Err(EngineError::NoBatches)));
    }

    #[test]
    fn factory_failure_is_fatal() {
        let broken: FnFactory<fn(&[String]) -> Result<Box<dyn Strategy>, StrategyError>> =
            FnFactory(|_| Err(StrategyError::Build("missing model file".into())));
        let result = Engine::new(vec!["AAPL".into()], batches(1), 1_000.0, 2.0, &broken);
        assert!(matches!(result, Err(EngineError::StrategyInit(_))));
    }

    #[test]
    fn second_run_is_rejected() {
        let mut engine = Engine::new(
            vec!["AAPL".into()],
            batches(1),
            1_000.0,
            2.0,
            &idle_factory(),
        )
        .unwrap();
        engine.run().unwrap();
        assert!(matches!(
            engine.run(),
            Err(EngineError::AlreadyRan(EngineState::Completed))
        ));
    }

    #[test]
    fn market_sees_every_quote_in_batch_order() {
        let mut engine = Engine::new(
            vec!["AAPL".into()],
            batches(3),
            1_000.0,
            2.0,
            &idle_factory(),
        )
        .unwrap();
        engine.run().unwrap();
        assert_eq!(engine.market().price_of("AAPL"), Some(102.0));
        assert_eq!(engine.market().time(), Some(&TimeKey::Step(2)));
    }
}

//! Strategy contracts — the boundary between the engine and user code.
//!
//! Two modes:
//! - imperative: a [`Strategy`] built by a [`StrategyFactory`] receives the
//!   market and portfolio once per batch and trades through the ledger's
//!   admission operations;
//! - vectorized: a [`SignalStrategy`] maps a price series to a target
//!   signal series in `{-1, 0, +1}`, evaluated arithmetically downstream.
//!
//! Market and portfolio types reach a strategy only as call arguments.
//! There is no ambient registry to import from; the factory is the single
//! injection point, and the host only needs a unit satisfying these traits
//! to admit it into the replay loop.

pub mod presets;

use crate::domain::{Market, Portfolio, TradeError};
use thiserror::Error;

pub use presets::{
    BuyAndHold, ClockMomentum, MomentumSignal, RandomTrader, StrategyPreset,
};

/// A failure raised by strategy code. The engine isolates per-batch
/// failures; only construction failures abort a run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrategyError {
    #[error("strategy construction failed: {0}")]
    Build(String),
    #[error(transparent)]
    Trade(#[from] TradeError),
    #[error("{0}")]
    Failed(String),
}

/// The per-batch decision callback.
///
/// Invoked exactly once per batch, after every quote in the batch has been
/// applied to the market. The portfolio may only be mutated through its
/// admission operations. An `Err` is recorded and swallowed by the engine;
/// whatever partial mutations happened before it stand.
pub trait Strategy: Send {
    fn name(&self) -> &str;

    fn on_quote(&mut self, market: &Market, portfolio: &mut Portfolio)
        -> Result<(), StrategyError>;
}

/// Builds a strategy for a given product universe. Failure here is fatal
/// to the run: the engine never starts trading.
pub trait StrategyFactory: Send + Sync {
    fn build(&self, universe: &[String]) -> Result<Box<dyn Strategy>, StrategyError>;
}

/// Adapter turning a plain function or closure into a factory.
pub struct FnFactory<F>(pub F);

impl<F> StrategyFactory for FnFactory<F>
where
    F: Fn(&[String]) -> Result<Box<dyn Strategy>, StrategyError> + Send + Sync,
{
    fn build(&self, universe: &[String]) -> Result<Box<dyn Strategy>, StrategyError> {
        (self.0)(universe)
    }
}

/// The vectorized contract: a target-position series instead of imperative
/// trades. Signal values are drawn from `{-1, 0, +1}` and indexed like the
/// input prices; the evaluator shifts them one period before applying.
pub trait SignalStrategy: Send {
    /// Optional training pass over the price series.
    fn fit(&mut self, _prices: &[f64]) {}

    fn generate_signals(&self, prices: &[f64]) -> Vec<f64>;
}

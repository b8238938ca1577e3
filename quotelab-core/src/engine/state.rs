//! Engine lifecycle, error, and replay-log types.

use crate::domain::{LedgerError, TimeKey};
use crate::strategy::StrategyError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle of one replay run. There is no retry state: a fatal
/// initialization failure lands in `Failed` before any trade can occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Initializing,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("strategy factory failed: {0}")]
    StrategyInit(#[source] StrategyError),
    #[error("no batches to replay")]
    NoBatches,
    #[error("engine already ran (state: {0:?})")]
    AlreadyRan(EngineState),
    #[error("valuation failed at batch {batch_index}: {source}")]
    Valuation {
        batch_index: usize,
        #[source]
        source: LedgerError,
    },
}

/// One isolated strategy failure. The batch still contributes a NAV sample;
/// mutations made before the failure stand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub batch_index: usize,
    pub time_key: TimeKey,
    pub message: String,
}

/// What a replay produced: the NAV trajectory plus failure bookkeeping.
///
/// `nav_history` is seeded with initial cash and gains exactly one sample
/// per batch; it is never mutated after the run completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayLog {
    pub nav_history: Vec<f64>,
    pub failures: Vec<BatchFailure>,
    pub batches_run: usize,
}

impl ReplayLog {
    pub(crate) fn new(initial_cash: f64) -> Self {
        Self {
            nav_history: vec![initial_cash],
            failures: Vec::new(),
            batches_run: 0,
        }
    }

    pub fn failed_batches(&self) -> usize {
        self.failures.len()
    }

    pub fn final_nav(&self) -> f64 {
        *self
            .nav_history
            .last()
            .expect("nav history is seeded at construction")
    }
}

//! Scoring runner — wires together ingestion, the engine, and metrics.
//!
//! Two entry points:
//! - `run_entry()`: imperative mode — replay a strategy batch by batch.
//! - `run_signal_entry()`: vectorized mode — score a target-position
//!   signal series against one product's price series.

use std::time::Instant;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use quotelab_core::data::{ingest_csv, IngestError, IngestResult};
use quotelab_core::engine::{Engine, EngineError};
use quotelab_core::strategy::{SignalStrategy, StrategyFactory};

use crate::config::RunConfig;
use crate::metrics::{
    cumulative_returns, evaluate_signals, max_drawdown, periodic_returns, sharpe_ratio,
    total_return, SignalReport,
};
use crate::result::{RunRecord, SCHEMA_VERSION};

/// Fatal run errors. Everything here aborts before or instead of a score;
/// recoverable problems (bad rows, rejected trades, strategy failures)
/// never surface as a `RunError`.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("ingestion failed: {0}")]
    Ingest(#[from] IngestError),
    #[error("engine failed: {0}")]
    Engine(#[from] EngineError),
    #[error("product '{0}' is not in the ingested universe")]
    UnknownProduct(String),
}

/// Replay one entry over the dataset and derive its metrics record.
pub fn run_entry(
    raw: &[u8],
    factory: &dyn StrategyFactory,
    config: &RunConfig,
) -> Result<RunRecord, RunError> {
    let started = Instant::now();

    let IngestResult {
        universe, batches, ..
    } = ingest_csv(raw)?;

    let mut engine = Engine::new(
        universe.clone(),
        batches,
        config.initial_cash,
        config.leverage_limit,
        factory,
    )?;
    let log = engine.run()?;

    let nav = &log.nav_history;
    let sharpe = sharpe_ratio(nav, config.periods_per_year);
    let drawdown = max_drawdown(&cumulative_returns(&periodic_returns(nav)));
    let final_nav = log.final_nav();

    let duration_secs = started.elapsed().as_secs_f64();
    info!(
        duration_secs,
        final_nav,
        failed_batches = log.failed_batches(),
        "run completed"
    );
    if let Some(budget) = config.max_duration_secs {
        if duration_secs > budget {
            warn!(duration_secs, budget, "run exceeded its wall-clock budget");
        }
    }

    Ok(RunRecord {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id(raw),
        score: sharpe,
        sharpe_ratio: sharpe,
        pnl: final_nav - config.initial_cash,
        percent_return: total_return(nav) * 100.0,
        max_drawdown: drawdown,
        final_nav,
        universe,
        batches_run: log.batches_run,
        failed_batches: log.failed_batches(),
        timestamp: Utc::now(),
        duration_secs,
    })
}

/// Score a vectorized strategy against one product's price series.
///
/// The product defaults to the first of the universe. Prices are sampled
/// once per batch, carrying the last known level forward, so the series is
/// indexed like the batch sequence.
pub fn run_signal_entry(
    raw: &[u8],
    strategy: &mut dyn SignalStrategy,
    product: Option<&str>,
    config: &RunConfig,
) -> Result<SignalReport, RunError> {
    let ingested = ingest_csv(raw)?;
    let product = match product {
        Some(id) => id.to_string(),
        None => ingested
            .universe
            .first()
            .cloned()
            .expect("ingestion guarantees a non-empty universe"),
    };
    let prices = close_series(&ingested, &product)?;

    strategy.fit(&prices);
    let signals = strategy.generate_signals(&prices);
    Ok(evaluate_signals(
        &prices,
        &signals,
        config.cost_bps,
        config.periods_per_year,
    ))
}

/// One price per batch for a product, carrying the last known level
/// forward through batches where it did not quote. Batches before the
/// first quote are dropped from the front of the series.
pub fn close_series(ingested: &IngestResult, product: &str) -> Result<Vec<f64>, RunError> {
    if !ingested.universe.iter().any(|id| id == product) {
        return Err(RunError::UnknownProduct(product.to_string()));
    }
    let mut series = Vec::with_capacity(ingested.batches.len());
    let mut last = None;
    for batch in &ingested.batches {
        for quote in &batch.quotes {
            if quote.product_id == product {
                last = Some(quote.price);
            }
        }
        if let Some(price) = last {
            series.push(price);
        }
    }
    Ok(series)
}

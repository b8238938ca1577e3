//! QuoteLab Runner — scoring orchestration on top of `quotelab-core`.
//!
//! This crate builds on the core engine to provide:
//! - Run configuration (TOML, content-addressed run ids)
//! - Performance metrics (Sharpe, drawdown, returns, turnover)
//! - Canonical run records for leaderboard/persistence collaborators
//! - Parallel contest evaluation with deterministic standings
//! - JSON/CSV export with schema versioning

pub mod config;
pub mod contest;
pub mod export;
pub mod metrics;
pub mod result;
pub mod runner;

pub use config::{ConfigError, RunConfig};
pub use contest::{evaluate_entries, ContestEntry, Leaderboard, RankedEntry};
pub use export::{export_json, export_leaderboard_csv, import_json};
pub use metrics::{
    evaluate_signals, max_drawdown, periodic_returns, sharpe_ratio, total_return, turnover,
    SignalReport,
};
pub use result::{FailureRecord, RunOutcome, RunRecord, SCHEMA_VERSION};
pub use runner::{close_series, run_entry, run_signal_entry, RunError};

//! Run records — the canonical output handed to leaderboard and
//! persistence collaborators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current schema version for persisted records.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Complete metrics record of one successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Content-addressed run identifier (config + dataset).
    pub run_id: String,
    /// Primary leaderboard score; currently the Sharpe ratio.
    pub score: f64,
    pub sharpe_ratio: f64,
    /// Realized plus unrealized profit: final NAV minus initial cash.
    pub pnl: f64,
    /// Total return in percent.
    pub percent_return: f64,
    /// Most negative drawdown of the cumulative-return series.
    pub max_drawdown: f64,
    pub final_nav: f64,
    /// Sorted product universe the run traded over.
    pub universe: Vec<String>,
    pub batches_run: usize,
    /// Batches whose strategy callback failed and was isolated.
    pub failed_batches: usize,
    pub timestamp: DateTime<Utc>,
    /// Wall-clock duration, measured after the run completed. Supervisory
    /// information only; nothing is enforced mid-run.
    pub duration_secs: f64,
}

/// Fatal-error record for a run that never produced a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl FailureRecord {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            error: error.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A run yields exactly one of these: a complete metrics record or a
/// fatal-error record. There is no partial score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed(RunRecord),
    Failed(FailureRecord),
}

impl RunOutcome {
    pub fn from_result<E: std::fmt::Display>(result: Result<RunRecord, E>) -> Self {
        match result {
            Ok(record) => Self::Completed(record),
            Err(err) => Self::Failed(FailureRecord::new(err.to_string())),
        }
    }

    pub fn score(&self) -> Option<f64> {
        match self {
            Self::Completed(record) => Some(record.score),
            Self::Failed(_) => None,
        }
    }

    pub fn schema_version(&self) -> u32 {
        match self {
            Self::Completed(record) => record.schema_version,
            Self::Failed(failure) => failure.schema_version,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

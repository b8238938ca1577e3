//! Serializable run configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Parameters of a single scoring run.
///
/// Captures everything needed to reproduce a score besides the dataset and
/// the strategy itself. Every field has a default so a config file only
/// needs to name what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Starting cash, which also seeds the NAV history.
    pub initial_cash: f64,
    /// Gross exposure over NAV may not exceed this after any trade.
    pub leverage_limit: f64,
    /// Annualization factor for Sharpe and return metrics.
    pub periods_per_year: f64,
    /// Transaction cost per unit of signal change, in basis points
    /// (vectorized mode only).
    pub cost_bps: f64,
    /// Supervisory wall-clock budget in seconds. Checked after the run
    /// completes and logged; nothing interrupts a run in flight.
    pub max_duration_secs: Option<f64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            initial_cash: 100_000.0,
            leverage_limit: 2.0,
            periods_per_year: 252.0,
            cost_bps: 1.0,
            max_duration_secs: None,
        }
    }
}

impl RunConfig {
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    /// Content-addressed identifier for a run: hash of this config plus the
    /// dataset bytes. Two runs with identical config and data share an id.
    pub fn run_id(&self, dataset: &[u8]) -> String {
        let json = serde_json::to_string(self).expect("RunConfig serialization failed");
        let mut hasher = blake3::Hasher::new();
        hasher.update(json.as_bytes());
        hasher.update(&[0]);
        hasher.update(dataset);
        hasher.finalize().to_hex().to_string()
    }
}

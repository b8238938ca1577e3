//! Quote and batch types — the atoms of a replay.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Reserved product identifier for the clock sentinel.
///
/// A quote with this id carries no tradable price; it marks that time has
/// advanced to its `time_key`. The market never stores it.
pub const CLOCK: &str = "Clock";

/// Time coordinate of a quote: an integer step or raw timestamp text.
///
/// Ingestion tries an integer parse first and falls back to the trimmed
/// cell text, so both `timestep` counters and ISO timestamps order
/// correctly as long as one file sticks to one representation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TimeKey {
    Step(i64),
    Stamp(String),
}

impl TimeKey {
    /// Parse a raw time cell into a key.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<i64>() {
            Ok(step) => TimeKey::Step(step),
            Err(_) => TimeKey::Stamp(trimmed.to_string()),
        }
    }
}

impl fmt::Display for TimeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeKey::Step(step) => write!(f, "{step}"),
            TimeKey::Stamp(stamp) => f.write_str(stamp),
        }
    }
}

/// A single observed price for one product at one time key.
///
/// Quotes are immutable once produced; the market overwrites whole quotes,
/// never fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub product_id: String,
    pub time_key: TimeKey,
    pub price: f64,
    /// Optional extra columns carried through from ingestion (unused by the
    /// engine itself, available to strategies).
    pub aux: Option<BTreeMap<String, f64>>,
}

impl Quote {
    pub fn new(product_id: impl Into<String>, time_key: TimeKey, price: f64) -> Self {
        Self {
            product_id: product_id.into(),
            time_key,
            price,
            aux: None,
        }
    }

    /// The clock sentinel for a time key. Price is zeroed; it must never be
    /// read as a tradable level.
    pub fn clock(time_key: TimeKey) -> Self {
        Self {
            product_id: CLOCK.to_string(),
            time_key,
            price: 0.0,
            aux: None,
        }
    }

    pub fn is_clock(&self) -> bool {
        self.product_id == CLOCK
    }
}

/// All quotes sharing one time key.
///
/// Quotes are ordered by product id ascending, with the clock sentinel (if
/// present) last. No product appears twice; ingestion coalesces duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub time_key: TimeKey,
    pub quotes: Vec<Quote>,
}

impl Batch {
    pub fn new(time_key: TimeKey, quotes: Vec<Quote>) -> Self {
        Self { time_key, quotes }
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

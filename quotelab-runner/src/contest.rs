//! Contest evaluation — many entries, one hidden dataset, one leaderboard.
//!
//! Each entry gets its own engine, market, and portfolio; runs share
//! nothing, so parallel evaluation needs no locking. A fatally failing
//! entry ranks with a failure record instead of poisoning the contest.

use rayon::prelude::*;

use quotelab_core::strategy::StrategyFactory;

use crate::config::RunConfig;
use crate::result::RunOutcome;
use crate::runner::run_entry;

/// One competition entry: a display name plus a strategy factory.
pub struct ContestEntry {
    pub name: String,
    pub factory: Box<dyn StrategyFactory>,
}

impl ContestEntry {
    pub fn new(name: impl Into<String>, factory: Box<dyn StrategyFactory>) -> Self {
        Self {
            name: name.into(),
            factory,
        }
    }
}

/// A ranked entry on the leaderboard.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    pub name: String,
    pub outcome: RunOutcome,
}

/// Standings sorted by score, best first. Failed runs and non-finite
/// scores sink to the bottom; ties break by entry name so standings are
/// deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaderboard {
    standings: Vec<RankedEntry>,
}

impl Leaderboard {
    fn rank(mut results: Vec<RankedEntry>) -> Self {
        let key = |entry: &RankedEntry| -> f64 {
            entry
                .outcome
                .score()
                .filter(|score| score.is_finite())
                .unwrap_or(f64::NEG_INFINITY)
        };
        results.sort_by(|a, b| {
            key(b)
                .partial_cmp(&key(a))
                .expect("keys are never NaN")
                .then_with(|| a.name.cmp(&b.name))
        });
        Self { standings: results }
    }

    pub fn standings(&self) -> &[RankedEntry] {
        &self.standings
    }

    pub fn winner(&self) -> Option<&RankedEntry> {
        self.standings.first()
    }

    pub fn len(&self) -> usize {
        self.standings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.standings.is_empty()
    }
}

/// Evaluate every entry against the same dataset under identical rules.
pub fn evaluate_entries(
    raw: &[u8],
    entries: &[ContestEntry],
    config: &RunConfig,
    parallel: bool,
) -> Leaderboard {
    let score = |entry: &ContestEntry| RankedEntry {
        name: entry.name.clone(),
        outcome: RunOutcome::from_result(run_entry(raw, entry.factory.as_ref(), config)),
    };

    let results: Vec<RankedEntry> = if parallel {
        entries.par_iter().map(score).collect()
    } else {
        entries.iter().map(score).collect()
    };

    Leaderboard::rank(results)
}

//! Export — JSON run artifacts and a CSV leaderboard tape.
//!
//! Persisted artifacts carry a `schema_version` field; unknown versions
//! are rejected on load instead of being misread.

use anyhow::{bail, Context, Result};

use crate::contest::Leaderboard;
use crate::result::{RunOutcome, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a run outcome to pretty JSON.
pub fn export_json(outcome: &RunOutcome) -> Result<String> {
    serde_json::to_string_pretty(outcome).context("failed to serialize RunOutcome to JSON")
}

/// Deserialize a run outcome, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<RunOutcome> {
    let outcome: RunOutcome =
        serde_json::from_str(json).context("failed to deserialize RunOutcome from JSON")?;
    if outcome.schema_version() > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            outcome.schema_version(),
            SCHEMA_VERSION
        );
    }
    Ok(outcome)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export leaderboard standings as CSV.
///
/// Columns: rank, name, status, score, sharpe_ratio, pnl, percent_return,
/// max_drawdown, final_nav, failed_batches, error
pub fn export_leaderboard_csv(board: &Leaderboard) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "rank",
        "name",
        "status",
        "score",
        "sharpe_ratio",
        "pnl",
        "percent_return",
        "max_drawdown",
        "final_nav",
        "failed_batches",
        "error",
    ])?;

    for (idx, entry) in board.standings().iter().enumerate() {
        let rank = (idx + 1).to_string();
        match &entry.outcome {
            RunOutcome::Completed(record) => wtr.write_record([
                rank.as_str(),
                entry.name.as_str(),
                "completed",
                &format!("{:.6}", record.score),
                &format!("{:.6}", record.sharpe_ratio),
                &format!("{:.2}", record.pnl),
                &format!("{:.4}", record.percent_return),
                &format!("{:.6}", record.max_drawdown),
                &format!("{:.2}", record.final_nav),
                &record.failed_batches.to_string(),
                "",
            ])?,
            RunOutcome::Failed(failure) => wtr.write_record([
                rank.as_str(),
                entry.name.as_str(),
                "failed",
                "",
                "",
                "",
                "",
                "",
                "",
                "",
                failure.error.as_str(),
            ])?,
        }
    }

    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("leaderboard CSV was not valid UTF-8")
}

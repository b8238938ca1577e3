//! CSV quote ingestion — raw bytes to a deterministic batch sequence.
//!
//! Both orientations funnel into the same ordered grouping
//! (`TimeKey -> product -> Quote`), so the emitted batches are sorted by
//! time key, sorted by product within a batch, clock sentinel last —
//! token-for-token identical for identical bytes, and identical across the
//! long and wide renditions of the same data.

use crate::data::schema::{self, CsvLayout, Orientation, SchemaError};
use crate::domain::{Batch, Quote, TimeKey};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("input is empty")]
    Empty,
    #[error("no usable rows after parsing")]
    NoUsableRows,
}

/// Output of one ingestion pass.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestResult {
    /// Sorted, deduplicated product identifiers.
    pub universe: Vec<String>,
    /// Time-ordered batches, one per distinct time key.
    pub batches: Vec<Batch>,
    /// Rows (long) or cells (wide) dropped for unparseable prices.
    pub skipped: usize,
}

type Groups = BTreeMap<TimeKey, BTreeMap<String, Quote>>;

/// Parse raw CSV bytes into a universe and a batch sequence.
///
/// A malformed price skips that row or cell with a diagnostic; only
/// structural failures are fatal: empty input, a missing required column,
/// or zero usable rows.
pub fn ingest_csv(raw: &[u8]) -> Result<IngestResult, IngestError> {
    if raw.is_empty() {
        return Err(IngestError::Empty);
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(raw);
    let headers = reader.headers()?.clone();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(IngestError::Empty);
    }

    let layout = schema::resolve(&headers)?;
    match &layout.orientation {
        Orientation::Long { .. } => ingest_long(&mut reader, &layout),
        Orientation::Wide { .. } => ingest_wide(&mut reader, &layout),
    }
}

fn ingest_long(
    reader: &mut csv::Reader<&[u8]>,
    layout: &CsvLayout,
) -> Result<IngestResult, IngestError> {
    let (product_idx, price_idx, aux_cols) = match &layout.orientation {
        Orientation::Long {
            product_idx,
            price_idx,
            aux_cols,
        } => (*product_idx, *price_idx, aux_cols),
        Orientation::Wide { .. } => unreachable!("long ingestion requires a long layout"),
    };

    let mut groups: Groups = BTreeMap::new();
    let mut universe: Vec<String> = Vec::new();
    let mut skipped = 0usize;

    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let Some(product_id) = record.get(product_idx).filter(|id| !id.is_empty()) else {
            warn!(row, "skipping row without a product id");
            skipped += 1;
            continue;
        };
        // The universe counts every observed identifier, price-parseable
        // or not, matching what a wide header row would declare.
        universe.push(product_id.to_string());

        let Some(time_cell) = record.get(layout.time_idx).filter(|t| !t.is_empty()) else {
            warn!(row, product_id, "skipping row without a time key");
            skipped += 1;
            continue;
        };
        let price = match record.get(price_idx).map(str::parse::<f64>) {
            Some(Ok(price)) if price.is_finite() => price,
            _ => {
                warn!(row, product_id, "skipping row with unparseable price");
                skipped += 1;
                continue;
            }
        };

        let mut quote = Quote::new(product_id, TimeKey::parse(time_cell), price);
        let aux: BTreeMap<String, f64> = aux_cols
            .iter()
            .filter_map(|(idx, name)| {
                let value = record.get(*idx)?.parse::<f64>().ok()?;
                value.is_finite().then(|| (name.clone(), value))
            })
            .collect();
        if !aux.is_empty() {
            quote.aux = Some(aux);
        }
        insert_coalescing(&mut groups, quote);
    }

    universe.sort();
    universe.dedup();
    finish(universe, groups, skipped)
}

fn ingest_wide(
    reader: &mut csv::Reader<&[u8]>,
    layout: &CsvLayout,
) -> Result<IngestResult, IngestError> {
    let product_cols = match &layout.orientation {
        Orientation::Wide { product_cols } => product_cols,
        Orientation::Long { .. } => unreachable!("wide ingestion requires a wide layout"),
    };

    let mut groups: Groups = BTreeMap::new();
    let mut skipped = 0usize;

    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let Some(time_cell) = record.get(layout.time_idx).filter(|t| !t.is_empty()) else {
            warn!(row, "skipping row without a time key");
            skipped += 1;
            continue;
        };
        let time_key = TimeKey::parse(time_cell);

        // A row where every cell is empty yields no quotes and no batch.
        for (idx, product_id) in product_cols {
            let Some(cell) = record.get(*idx).filter(|c| !c.is_empty() && *c != "NaN") else {
                continue;
            };
            match cell.parse::<f64>() {
                Ok(price) if price.is_finite() => {
                    insert_coalescing(
                        &mut groups,
                        Quote::new(product_id.clone(), time_key.clone(), price),
                    );
                }
                _ => {
                    warn!(row, product_id = %product_id, "skipping cell with unparseable price");
                    skipped += 1;
                }
            }
        }
    }

    let universe: Vec<String> = {
        let mut names: Vec<String> = product_cols.iter().map(|(_, name)| name.clone()).collect();
        names.sort();
        names.dedup();
        names
    };
    finish(universe, groups, skipped)
}

/// Insert a quote into its time group, coalescing duplicates: the last
/// observation for a product wins.
fn insert_coalescing(groups: &mut Groups, quote: Quote) {
    let group = groups.entry(quote.time_key.clone()).or_default();
    if let Some(previous) = group.insert(quote.product_id.clone(), quote) {
        warn!(
            product_id = %previous.product_id,
            time_key = %previous.time_key,
            "duplicate quote in one time group coalesced (last wins)"
        );
    }
}

/// Turn the ordered groups into batches, appending the clock sentinel to
/// each, and reject a run with nothing to replay.
fn finish(
    universe: Vec<String>,
    groups: Groups,
    skipped: usize,
) -> Result<IngestResult, IngestError> {
    if groups.is_empty() {
        return Err(IngestError::NoUsableRows);
    }

    let batches = groups
        .into_iter()
        .map(|(time_key, by_product)| {
            let mut quotes: Vec<Quote> = by_product.into_values().collect();
            quotes.push(Quote::clock(time_key.clone()));
            Batch::new(time_key, quotes)
        })
        .collect();

    Ok(IngestResult {
        universe,
        batches,
        skipped,
    })
}

//! Expected CSV layout for quote data.
//!
//! Two orientations are accepted:
//! - *long*: one row per product per time point, identified by a
//!   `product_id` column plus a price column;
//! - *wide*: one row per time point, every non-time column is a product.
//!
//! Orientation is decided by the presence of the product column; the time
//! and price columns are resolved from fixed candidate sets.

use csv::StringRecord;
use thiserror::Error;

/// Candidate names for the time column, tried in order.
pub const TIME_COLUMNS: [&str; 2] = ["timestep", "timestamp"];

/// Candidate names for the long-format price column, tried in order.
pub const PRICE_COLUMNS: [&str; 3] = ["price", "mid_price", "close"];

/// Column that marks a file as long format.
pub const PRODUCT_COLUMN: &str = "product_id";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("missing time column (expected one of: timestep, timestamp)")]
    MissingTimeColumn,
    #[error("long format requires a price column (expected one of: price, mid_price, close)")]
    MissingPriceColumn,
}

/// Resolved column layout of one file.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvLayout {
    pub time_idx: usize,
    pub orientation: Orientation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Orientation {
    Long {
        product_idx: usize,
        price_idx: usize,
        /// `(column index, name)` for every remaining column; numeric
        /// values ride along on the quote as auxiliary data.
        aux_cols: Vec<(usize, String)>,
    },
    Wide {
        /// `(column index, product id)` for every non-time column.
        product_cols: Vec<(usize, String)>,
    },
}

/// Resolve the layout from a header record.
pub fn resolve(headers: &StringRecord) -> Result<CsvLayout, SchemaError> {
    let names: Vec<&str> = headers.iter().map(str::trim).collect();

    let time_idx = TIME_COLUMNS
        .iter()
        .find_map(|candidate| names.iter().position(|name| name == candidate))
        .ok_or(SchemaError::MissingTimeColumn)?;

    let orientation = match names.iter().position(|name| *name == PRODUCT_COLUMN) {
        Some(product_idx) => {
            let price_idx = PRICE_COLUMNS
                .iter()
                .find_map(|candidate| names.iter().position(|name| name == candidate))
                .ok_or(SchemaError::MissingPriceColumn)?;
            Orientation::Long {
                product_idx,
                price_idx,
                aux_cols: names
                    .iter()
                    .enumerate()
                    .filter(|(idx, _)| ![time_idx, product_idx, price_idx].contains(idx))
                    .map(|(idx, name)| (idx, name.to_string()))
                    .collect(),
            }
        }
        None => Orientation::Wide {
            product_cols: names
                .iter()
                .enumerate()
                .filter(|(idx, _)| *idx != time_idx)
                .map(|(idx, name)| (idx, name.to_string()))
                .collect(),
        },
    };

    Ok(CsvLayout {
        time_idx,
        orientation,
    })
}

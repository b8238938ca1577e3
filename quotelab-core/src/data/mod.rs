//! Quote ingestion — CSV bytes in, ordered batches out.

pub mod ingest;
pub mod schema;

pub use ingest::{ingest_csv, IngestError, IngestResult};
pub use schema::{CsvLayout, Orientation, SchemaError};

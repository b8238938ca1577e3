//! QuoteLab Core — quote replay engine for strategy competition scoring.
//!
//! This crate contains the heart of the scoring system:
//! - Domain types (quotes, batches, market, positions, portfolio)
//! - CSV quote ingestion (long and wide orientations)
//! - Leverage-bounded trade admission
//! - Batch-by-batch replay loop with per-batch failure isolation
//! - Strategy contracts (imperative callback and vectorized signal modes)

pub mod data;
pub mod domain;
pub mod engine;
pub mod strategy;

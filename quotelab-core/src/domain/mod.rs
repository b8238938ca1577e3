//! Domain types for QuoteLab.

pub mod market;
pub mod portfolio;
pub mod position;
pub mod quote;

pub use market::Market;
pub use portfolio::{Fill, LedgerError, Portfolio, PortfolioSummary, TradeError, NAV_EPSILON};
pub use position::Position;
pub use quote::{Batch, Quote, TimeKey, CLOCK};

/// Product identifier type alias.
pub type ProductId = String;

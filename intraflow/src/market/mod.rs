//! Typed market data exchanged between stages.
//!
//! Fetch handlers emit these types as JSON payloads; [`MarketData`] parses
//! them back into a read-only view for the recognize and summarize stages.

mod data;
mod types;

pub use data::MarketData;
pub use types::{EconomicDataPoint, NewsArticle, NewsBatch, PriceBar, PriceSeries};

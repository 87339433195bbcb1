//! Built-in capabilities for the fetch and recognize stages.
//!
//! - Simulated market-data sources: deterministic per request, no network
//! - Pattern detectors over the fetched price and news data

mod detectors;
mod fetchers;

pub use detectors::{NewsCorrelationDetector, PriceVolumeSurgeDetector, TimeOfDayVolatilityDetector};
pub use fetchers::{EconomicDataSource, IntradayPricesSource, NewsFeedSource};

use crate::config::DetectorConfig;
use crate::errors::IntraflowError;
use crate::registry::{CapabilityEntry, CapabilityRegistry, DataRequirement};
use std::sync::Arc;

/// Kind tags of the built-in capabilities.
pub mod kinds {
    /// Intraday OHLCV bars.
    pub const INTRADAY_PRICES: &str = "intraday_prices";
    /// News articles matching keywords.
    pub const NEWS_FEED: &str = "news_feed";
    /// A macroeconomic indicator reading.
    pub const ECONOMIC_DATA: &str = "economic_data";
    /// A bar with outsized volume and price movement.
    pub const PRICE_VOLUME_SURGE: &str = "price_volume_surge";
    /// News sentiment moving with price.
    pub const NEWS_CORRELATION: &str = "news_correlation";
    /// Opening-window volatility profile.
    pub const TIME_OF_DAY_VOLATILITY: &str = "time_of_day_volatility";
}

/// Builds the fetch-stage registry.
///
/// # Errors
///
/// Only fails if a built-in kind tag is rejected, which would be a bug.
pub fn data_capabilities() -> Result<CapabilityRegistry, IntraflowError> {
    CapabilityRegistry::new("fetch")
        .with(
            CapabilityEntry::new(kinds::INTRADAY_PRICES, Arc::new(IntradayPricesSource))
                .with_description("Intraday OHLCV bars for one ticker")
                .requires_params(["ticker", "interval", "count"])
                .keyed_by(["ticker", "interval"]),
        )?
        .with(
            CapabilityEntry::new(kinds::NEWS_FEED, Arc::new(NewsFeedSource))
                .with_description("News articles matching keywords")
                .requires_params(["keywords", "max_articles"])
                .keyed_by(["keywords"]),
        )?
        .with(
            CapabilityEntry::new(kinds::ECONOMIC_DATA, Arc::new(EconomicDataSource))
                .with_description("Latest reading of an economic indicator")
                .requires_params(["indicator_name", "country"])
                .keyed_by(["indicator_name", "country"]),
        )
}

/// Builds the recognize-stage registry.
///
/// # Errors
///
/// Only fails if a built-in kind tag is rejected, which would be a bug.
pub fn pattern_capabilities(config: &DetectorConfig) -> Result<CapabilityRegistry, IntraflowError> {
    CapabilityRegistry::new("recognize")
        .with(
            CapabilityEntry::new(
                kinds::PRICE_VOLUME_SURGE,
                Arc::new(PriceVolumeSurgeDetector::from_config(config)),
            )
            .with_description("Bar with outsized volume and a sharp price move")
            .requires_data([DataRequirement::IntradayPrices]),
        )?
        .with(
            CapabilityEntry::new(
                kinds::NEWS_CORRELATION,
                Arc::new(NewsCorrelationDetector::from_config(config)),
            )
            .with_description("News sentiment aligned with the session move")
            .requires_data([DataRequirement::IntradayPrices, DataRequirement::NewsArticles]),
        )?
        .with(
            CapabilityEntry::new(
                kinds::TIME_OF_DAY_VOLATILITY,
                Arc::new(TimeOfDayVolatilityDetector::from_config(config)),
            )
            .with_description("Opening-window volatility against the rest of the session")
            .requires_data([DataRequirement::IntradayPrices]),
        )
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

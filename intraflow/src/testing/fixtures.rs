//! Builders for bars, records, requests and registries.

use crate::core::{ItemResult, RecordEntry, RequestItem};
use crate::errors::IntraflowError;
use crate::handlers::kinds;
use crate::market::{NewsArticle, NewsBatch, PriceBar, PriceSeries};
use crate::pipeline::PipelineRequest;
use crate::registry::{CapabilityEntry, CapabilityRegistry};
use crate::utils::session_open;
use chrono::Duration;
use std::sync::Arc;

use super::mocks::{ErrorShapedHandler, FailingHandler, PanickingHandler, RecordingHandler};

/// Builds a bar `minute_offset` minutes after the session open.
///
/// High and low wrap open and close.
#[must_use]
pub fn bar_at(minute_offset: u32, open: f64, close: f64, volume: u64) -> PriceBar {
    PriceBar {
        timestamp: session_open() + Duration::minutes(i64::from(minute_offset)),
        open,
        high: open.max(close),
        low: open.min(close),
        close,
        volume,
    }
}

/// Builds `n` unchanged 5-minute bars from the session open.
#[must_use]
pub fn flat_bars(n: usize, price: f64, volume: u64) -> Vec<PriceBar> {
    (0..n)
        .map(|i| bar_at(u32::try_from(i * 5).unwrap_or(u32::MAX), price, price, volume))
        .collect()
}

/// Builds a successful `intraday_prices` record entry for 5-minute bars.
#[must_use]
pub fn price_series_entry(ticker: &str, bars: Vec<PriceBar>) -> RecordEntry {
    let payload = serde_json::to_value(PriceSeries {
        ticker: ticker.to_string(),
        interval: "5min".to_string(),
        bars,
    })
    .unwrap_or_default();
    RecordEntry::new(
        format!("{}_{ticker}_5min", kinds::INTRADAY_PRICES),
        kinds::INTRADAY_PRICES,
        ItemResult::success(payload),
    )
}

/// Builds a successful `news_feed` record entry.
#[must_use]
pub fn news_entry(keyword: &str, sentiments: &[f64]) -> RecordEntry {
    let articles = sentiments
        .iter()
        .enumerate()
        .map(|(i, sentiment)| NewsArticle {
            headline: format!("{keyword} headline {i}"),
            source: "newswire".to_string(),
            published_at: session_open() + Duration::minutes(i64::try_from(i).unwrap_or_default() * 15),
            sentiment: *sentiment,
        })
        .collect();
    let payload = serde_json::to_value(NewsBatch {
        keywords: vec![keyword.to_string()],
        sources: vec!["newswire".to_string()],
        articles,
    })
    .unwrap_or_default();
    RecordEntry::new(
        format!("{}_{keyword}", kinds::NEWS_FEED),
        kinds::NEWS_FEED,
        ItemResult::success(payload),
    )
}

/// An `intraday_prices` request item.
#[must_use]
pub fn prices_request(ticker: &str, interval: &str, count: u64) -> RequestItem {
    RequestItem::new(kinds::INTRADAY_PRICES)
        .param("ticker", ticker)
        .param("interval", interval)
        .param("count", count)
}

/// A `news_feed` request item.
#[must_use]
pub fn news_request(keywords: &[&str], max_articles: u64) -> RequestItem {
    RequestItem::new(kinds::NEWS_FEED)
        .param("keywords", keywords.to_vec())
        .param("max_articles", max_articles)
}

/// An `economic_data` request item.
#[must_use]
pub fn economic_request(indicator_name: &str, country: &str) -> RequestItem {
    RequestItem::new(kinds::ECONOMIC_DATA)
        .param("indicator_name", indicator_name)
        .param("country", country)
}

/// The AAPL scalping session: 12 five-minute bars and a surge check.
#[must_use]
pub fn aapl_surge_request() -> PipelineRequest {
    PipelineRequest::new("AAPL")
        .with_data_request(prices_request("AAPL", "5min", 12))
        .with_pattern(kinds::PRICE_VOLUME_SURGE)
        .with_risk_tolerance("high")
        .with_goals("scalp profits")
}

/// A registry with one healthy, one failing, one panicking and one
/// error-shaped handler, under the kinds `ok`, `fails`, `panics` and
/// `error_shaped`.
///
/// # Errors
///
/// Returns the registry error if a fixture kind is rejected.
pub fn faulty_registry(name: &str) -> Result<CapabilityRegistry, IntraflowError> {
    CapabilityRegistry::new(name)
        .with(CapabilityEntry::new(
            "ok",
            Arc::new(RecordingHandler::returning(serde_json::json!({"ok": true}))),
        ))?
        .with(CapabilityEntry::new("fails", Arc::new(FailingHandler::new("handler failed"))))?
        .with(CapabilityEntry::new("panics", Arc::new(PanickingHandler::new("handler panicked"))))?
        .with(CapabilityEntry::new(
            "error_shaped",
            Arc::new(ErrorShapedHandler::new("Unavailable", "source offline")),
        ))
}

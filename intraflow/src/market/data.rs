//! Read-only market data view assembled from fetch output.

use super::{EconomicDataPoint, NewsArticle, NewsBatch, PriceBar, PriceSeries};
use crate::core::StageOutputRecord;
use crate::handlers::kinds;
use chrono::Duration;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// The data a handler may need beyond its own params.
///
/// Built once per stage from the upstream fetch record and shared
/// read-only by every item the stage dispatches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    /// Intraday price bars for the session instrument.
    #[serde(default)]
    pub intraday_prices: Vec<PriceBar>,
    /// News articles from every successful news request.
    #[serde(default)]
    pub news_articles: Vec<NewsArticle>,
    /// Economic indicators from every successful economic request.
    #[serde(default)]
    pub economic_data_points: Vec<EconomicDataPoint>,
}

impl MarketData {
    /// Creates an empty view.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the price bars.
    #[must_use]
    pub fn with_prices(mut self, bars: Vec<PriceBar>) -> Self {
        self.intraday_prices = bars;
        self
    }

    /// Sets the news articles.
    #[must_use]
    pub fn with_news(mut self, articles: Vec<NewsArticle>) -> Self {
        self.news_articles = articles;
        self
    }

    /// Builds the view from a fetch-stage record.
    ///
    /// Only successful entries contribute. Price bars come from the first
    /// series whose ticker matches `ticker`; series for other instruments
    /// are ignored.
    #[must_use]
    pub fn from_record(record: &StageOutputRecord, ticker: &str) -> Self {
        let mut data = Self::default();

        for entry in record.successes() {
            let Some(payload) = entry.result.payload() else {
                continue;
            };
            match entry.kind.as_str() {
                kinds::INTRADAY_PRICES => {
                    if let Some(parsed) = parse_payload::<PriceSeries>(&entry.key, payload) {
                        if data.intraday_prices.is_empty() && parsed.ticker.eq_ignore_ascii_case(ticker) {
                            data.intraday_prices = parsed.bars;
                        }
                    }
                }
                kinds::NEWS_FEED => {
                    if let Some(batch) = parse_payload::<NewsBatch>(&entry.key, payload) {
                        data.news_articles.extend(batch.articles);
                    }
                }
                kinds::ECONOMIC_DATA => {
                    if let Some(point) = parse_payload::<EconomicDataPoint>(&entry.key, payload) {
                        data.economic_data_points.push(point);
                    }
                }
                _ => {}
            }
        }

        data
    }

    /// Returns true if price bars are available.
    #[must_use]
    pub fn has_prices(&self) -> bool {
        !self.intraday_prices.is_empty()
    }

    /// Returns true if news articles are available.
    #[must_use]
    pub fn has_news(&self) -> bool {
        !self.news_articles.is_empty()
    }

    /// Returns true if nothing is available at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intraday_prices.is_empty()
            && self.news_articles.is_empty()
            && self.economic_data_points.is_empty()
    }

    /// The latest close.
    #[must_use]
    pub fn last_price(&self) -> Option<f64> {
        self.intraday_prices.last().map(|b| b.close)
    }

    /// Move from the first bar's open to the last bar's close, in percent.
    #[must_use]
    pub fn session_change_pct(&self) -> Option<f64> {
        let first = self.intraday_prices.first()?;
        let last = self.intraday_prices.last()?;
        Some(last.change_pct_from(first.open))
    }

    /// Move over the trailing `minutes` of the session, in percent.
    ///
    /// Needs at least two bars.
    #[must_use]
    pub fn trailing_change_pct(&self, minutes: i64) -> Option<f64> {
        let last = self.intraday_prices.last()?;
        if self.intraday_prices.len() < 2 {
            return None;
        }
        let cutoff = last.timestamp - Duration::minutes(minutes);
        let anchor = self
            .intraday_prices
            .iter()
            .rev()
            .skip(1)
            .find(|b| b.timestamp <= cutoff)
            .or_else(|| self.intraday_prices.first())?;
        Some(last.change_pct_from(anchor.close))
    }

    /// Close-to-close returns in percent, paired with the bar index.
    #[must_use]
    pub fn bar_returns(&self) -> Vec<(usize, f64)> {
        self.intraday_prices
            .windows(2)
            .enumerate()
            .map(|(i, pair)| (i + 1, pair[1].change_pct_from(pair[0].close)))
            .collect()
    }

    /// Mean news sentiment.
    #[must_use]
    pub fn average_sentiment(&self) -> Option<f64> {
        if self.news_articles.is_empty() {
            return None;
        }
        let total: f64 = self.news_articles.iter().map(|a| a.sentiment).sum();
        Some(total / self.news_articles.len() as f64)
    }
}

fn parse_payload<T: DeserializeOwned>(key: &str, payload: &serde_json::Value) -> Option<T> {
    match serde_json::from_value(payload.clone()) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            warn!(key = %key, error = %err, "Skipping unparseable fetch payload");
            None
        }
    }
}

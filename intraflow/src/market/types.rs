//! Price bars, news articles and economic data points.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Bar open time (exchange-local).
    pub timestamp: NaiveDateTime,
    /// Open price.
    pub open: f64,
    /// High price.
    pub high: f64,
    /// Low price.
    pub low: f64,
    /// Close price.
    pub close: f64,
    /// Traded volume.
    pub volume: u64,
}

impl PriceBar {
    /// Percentage move from `previous_close` to this bar's close.
    #[must_use]
    pub fn change_pct_from(&self, previous_close: f64) -> f64 {
        if previous_close.abs() < f64::EPSILON {
            return 0.0;
        }
        (self.close - previous_close) / previous_close * 100.0
    }
}

/// Payload of the `intraday_prices` capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    /// Instrument symbol.
    pub ticker: String,
    /// Bar interval as requested (e.g. "5min").
    pub interval: String,
    /// Bars in chronological order.
    pub bars: Vec<PriceBar>,
}

/// One news article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    /// Headline text.
    pub headline: String,
    /// Publishing source.
    pub source: String,
    /// Publication time.
    pub published_at: NaiveDateTime,
    /// Sentiment score in [-1, 1].
    pub sentiment: f64,
}

/// Payload of the `news_feed` capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsBatch {
    /// Keywords searched.
    pub keywords: Vec<String>,
    /// Sources searched.
    pub sources: Vec<String>,
    /// Matching articles, newest last.
    pub articles: Vec<NewsArticle>,
}

/// Payload of the `economic_data` capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicDataPoint {
    /// Indicator name (e.g. "Non-Farm Payroll").
    pub indicator_name: String,
    /// Country code or name.
    pub country: String,
    /// Latest value.
    pub value: f64,
    /// Previous value.
    pub previous: f64,
    /// Reporting period label.
    pub period: String,
}

impl EconomicDataPoint {
    /// Change from the previous reading.
    #[must_use]
    pub fn change(&self) -> f64 {
        self.value - self.previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_change_pct_from() {
        let bar = PriceBar {
            timestamp: NaiveDate::from_ymd_opt(2023, 10, 27)
                .unwrap()
                .and_hms_opt(10, 30, 0)
                .unwrap(),
            open: 100.0,
            high: 102.5,
            low: 99.5,
            close: 102.0,
            volume: 1_000,
        };

        assert!((bar.change_pct_from(100.0) - 2.0).abs() < 1e-9);
        assert_eq!(bar.change_pct_from(0.0), 0.0);
    }

    #[test]
    fn test_bar_timestamp_round_trip_format() {
        let json = serde_json::json!({
            "timestamp": "2023-10-27T09:30:00",
            "open": 1.0, "high": 1.0, "low": 1.0, "close": 1.0, "volume": 10
        });
        let bar: PriceBar = serde_json::from_value(json).unwrap();
        assert_eq!(bar.timestamp.to_string(), "2023-10-27 09:30:00");
    }
}

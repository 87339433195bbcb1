//! Pattern detectors over the fetched market data.

use super::round2;
use crate::config::DetectorConfig;
use crate::core::Params;
use crate::market::MarketData;
use crate::registry::{CapabilityHandler, HandlerFailure};
use crate::utils::format_bar_time;
use chrono::Duration;
use serde_json::json;

/// Smallest session move news correlation will consider, in percent.
const MIN_SESSION_MOVE_PCT: f64 = 0.1;

/// Finds the bar whose volume stands out most against the rest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceVolumeSurgeDetector {
    /// Minimum volume ratio against the mean of the other bars.
    pub volume_ratio: f64,
    /// Minimum absolute price move in percent.
    pub min_move_pct: f64,
}

impl PriceVolumeSurgeDetector {
    /// Builds the detector from config thresholds.
    #[must_use]
    pub const fn from_config(config: &DetectorConfig) -> Self {
        Self {
            volume_ratio: config.surge_volume_ratio,
            min_move_pct: config.surge_min_price_move_pct,
        }
    }
}

impl CapabilityHandler for PriceVolumeSurgeDetector {
    #[allow(clippy::cast_precision_loss)]
    fn invoke(&self, _params: &Params, data: &MarketData) -> Result<serde_json::Value, HandlerFailure> {
        let bars = &data.intraday_prices;
        if bars.len() < 2 {
            return Ok(json!({
                "detected": false,
                "details": "At least two bars are needed to compare volume.",
            }));
        }

        let total = bars.iter().fold(0_u64, |acc, b| acc.saturating_add(b.volume));
        let others = (bars.len() - 1) as f64;
        let candidate = bars
            .iter()
            .enumerate()
            .filter_map(|(i, bar)| {
                let mean_others = total.saturating_sub(bar.volume) as f64 / others;
                (mean_others > 0.0).then(|| (i, bar.volume as f64 / mean_others))
            })
            .max_by(|a, b| a.1.total_cmp(&b.1));

        let Some((index, ratio)) = candidate else {
            return Ok(json!({
                "detected": false,
                "details": "No traded volume to compare.",
            }));
        };

        let bar = &bars[index];
        let reference = if index == 0 { bar.open } else { bars[index - 1].close };
        let move_pct = bar.change_pct_from(reference);

        if ratio < self.volume_ratio || move_pct.abs() < self.min_move_pct {
            return Ok(json!({
                "detected": false,
                "details": format!(
                    "No bar combined at least {:.1}x average volume with a move of {:.1}% or more.",
                    self.volume_ratio, self.min_move_pct
                ),
            }));
        }

        let direction = if move_pct >= 0.0 { "up" } else { "down" };
        let timestamp = format_bar_time(&bar.timestamp);
        let details = format!(
            "Volume reached {ratio:.1}x the session average at {timestamp} with a {move_pct:+.2}% price move."
        );
        Ok(json!({
            "detected": true,
            "timestamp": timestamp,
            "direction": direction,
            "price_change_pct": round2(move_pct),
            "volume_ratio": round2(ratio),
            "details": details,
        }))
    }
}

/// Checks whether news sentiment and the session move point the same way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewsCorrelationDetector {
    /// Minimum absolute mean sentiment.
    pub min_sentiment: f64,
}

impl NewsCorrelationDetector {
    /// Builds the detector from config thresholds.
    #[must_use]
    pub const fn from_config(config: &DetectorConfig) -> Self {
        Self {
            min_sentiment: config.news_min_sentiment,
        }
    }
}

impl CapabilityHandler for NewsCorrelationDetector {
    fn invoke(&self, _params: &Params, data: &MarketData) -> Result<serde_json::Value, HandlerFailure> {
        let (Some(sentiment), Some(session_move)) =
            (data.average_sentiment(), data.session_change_pct())
        else {
            return Err(HandlerFailure::new("news correlation needs both prices and news"));
        };

        let aligned = sentiment.abs() >= self.min_sentiment
            && session_move.abs() >= MIN_SESSION_MOVE_PCT
            && (sentiment > 0.0) == (session_move > 0.0);

        let tone = if sentiment >= 0.0 { "positive" } else { "negative" };
        let details = if aligned {
            format!(
                "{} {tone} articles (mean sentiment {sentiment:+.2}) line up with a {session_move:+.2}% session move.",
                data.news_articles.len()
            )
        } else {
            format!(
                "News tone (mean sentiment {sentiment:+.2}) does not line up with the {session_move:+.2}% session move."
            )
        };

        Ok(json!({
            "detected": aligned,
            "average_sentiment": round2(sentiment),
            "session_change_pct": round2(session_move),
            "article_count": data.news_articles.len(),
            "details": details,
        }))
    }
}

/// Compares opening-window volatility with the rest of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDayVolatilityDetector {
    /// Length of the opening window in minutes.
    pub first_hour_minutes: u32,
}

impl TimeOfDayVolatilityDetector {
    /// Builds the detector from config thresholds.
    #[must_use]
    pub const fn from_config(config: &DetectorConfig) -> Self {
        Self {
            first_hour_minutes: config.first_hour_minutes,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean_abs(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().map(|v| v.abs()).sum::<f64>() / values.len() as f64)
}

impl CapabilityHandler for TimeOfDayVolatilityDetector {
    fn invoke(&self, _params: &Params, data: &MarketData) -> Result<serde_json::Value, HandlerFailure> {
        let returns = data.bar_returns();
        let Some(first_bar) = data.intraday_prices.first() else {
            return Err(HandlerFailure::new("volatility profile needs price bars"));
        };
        if returns.is_empty() {
            return Ok(json!({
                "detected": false,
                "period": "first_hour",
                "details": "At least two bars are needed to measure volatility.",
            }));
        }

        let cutoff = first_bar.timestamp + Duration::minutes(i64::from(self.first_hour_minutes));
        let (opening, rest): (Vec<_>, Vec<_>) = returns
            .iter()
            .partition(|(i, _)| data.intraday_prices[*i].timestamp < cutoff);
        let opening: Vec<f64> = opening.into_iter().map(|(_, r)| r).collect();
        let rest: Vec<f64> = rest.into_iter().map(|(_, r)| r).collect();

        let first = mean_abs(&opening).unwrap_or(0.0);
        let later = mean_abs(&rest);

        let details = match later {
            Some(later) if first > later => format!(
                "The first {} minutes averaged {first:.2}% per bar versus {later:.2}% afterwards.",
                self.first_hour_minutes
            ),
            Some(later) => format!(
                "The first {} minutes averaged {first:.2}% per bar, calmer than the {later:.2}% seen afterwards.",
                self.first_hour_minutes
            ),
            None => format!(
                "The first {} minutes averaged {first:.2}% per bar. No bars yet after the opening window.",
                self.first_hour_minutes
            ),
        };

        Ok(json!({
            "period": "first_hour",
            "avg_volatility": format!("{first:.2}%"),
            "avg_volatility_pct": round2(first),
            "rest_of_session_volatility_pct": later.map(round2),
            "details": details,
        }))
    }
}

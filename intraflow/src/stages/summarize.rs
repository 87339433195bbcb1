//! Summarize stage: narrative synthesis of fetched data and patterns.

use super::{SlotInput, Stage, StageOutput};
use crate::context::StageInputs;
use crate::core::{SlotKey, StageKind, StageOutputRecord};
use crate::errors::{ErrorKind, IntraflowError};
use crate::handlers::{kinds, round2};
use crate::market::MarketData;
use crate::registry::sanitize_key_part;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Headlines carried into the snapshot.
const MAX_HEADLINES: usize = 5;

/// Trailing window for the last-hour move, in minutes.
const LAST_HOUR_MINUTES: i64 = 60;

/// Smallest session move that counts as directional, in percent.
const DIRECTIONAL_MOVE_PCT: f64 = 0.1;

/// Something the summary could not use, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataGap {
    /// The slot the gap was found in.
    pub slot: SlotKey,
    /// The record key, when the gap is a single failed entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Failure classification.
    pub reason: ErrorKind,
    /// What was missing.
    pub message: String,
}

impl DataGap {
    fn slot_missing(slot: SlotKey) -> Self {
        Self {
            slot,
            key: None,
            reason: ErrorKind::InsufficientData,
            message: format!("{slot} was not produced"),
        }
    }

    fn slot_empty(slot: SlotKey, what: &str) -> Self {
        Self {
            slot,
            key: None,
            reason: ErrorKind::InsufficientData,
            message: format!("no {what} were requested"),
        }
    }
}

/// The market picture at the end of the fetched window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Latest close.
    pub last_price: Option<f64>,
    /// Session move in percent.
    pub session_change_pct: Option<f64>,
    /// Move over the trailing hour in percent.
    pub last_hour_change_pct: Option<f64>,
    /// One-sentence description of price action.
    pub price_action: String,
    /// Recent headlines.
    #[serde(default)]
    pub news_headlines: Vec<String>,
    /// Notes on economic releases.
    #[serde(default)]
    pub economic_notes: Vec<String>,
}

/// One pattern result, as the summary sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternFinding {
    /// Record key.
    pub key: String,
    /// Pattern kind.
    pub kind: String,
    /// Human-readable details.
    pub details: String,
    /// The detector payload, when there is one.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
}

/// Detected, not detected and unavailable patterns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternsSummary {
    /// Patterns whose detector fired.
    #[serde(default)]
    pub detected: Vec<PatternFinding>,
    /// Patterns checked and not found.
    #[serde(default)]
    pub not_detected: Vec<PatternFinding>,
    /// Patterns that could not be evaluated.
    #[serde(default)]
    pub unavailable: Vec<PatternFinding>,
    /// Prose summary of the above.
    pub narrative: String,
}

/// Directional lean of the outlook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bias {
    /// Evidence points up.
    Bullish,
    /// Evidence points down.
    Bearish,
    /// No net direction.
    Neutral,
}

impl fmt::Display for Bias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bullish => write!(f, "Bullish"),
            Self::Bearish => write!(f, "Bearish"),
            Self::Neutral => write!(f, "Neutral"),
        }
    }
}

/// Overall intraday outlook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outlook {
    /// Directional lean.
    pub bias: Bias,
    /// The outlook in one sentence.
    pub statement: String,
}

/// The `intraday_analysis_summary` slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntradaySummary {
    /// Instrument analysed.
    pub ticker_analyzed: String,
    /// Market snapshot.
    pub current_market_snapshot: MarketSnapshot,
    /// Pattern results.
    pub identified_patterns_summary: PatternsSummary,
    /// Absent when there is neither price data nor a detected pattern.
    pub overall_intraday_outlook: Option<Outlook>,
    /// Everything that was missing or failed upstream.
    #[serde(default)]
    pub data_gaps: Vec<DataGap>,
}

impl IntradaySummary {
    /// Returns true if at least one pattern was detected.
    #[must_use]
    pub fn has_detected_patterns(&self) -> bool {
        !self.identified_patterns_summary.detected.is_empty()
    }

    /// Kinds of the detected patterns, in record order.
    #[must_use]
    pub fn detected_kinds(&self) -> Vec<&str> {
        self.identified_patterns_summary
            .detected
            .iter()
            .map(|f| f.kind.as_str())
            .collect()
    }

    /// The detected finding of a kind.
    #[must_use]
    pub fn detected(&self, kind: &str) -> Option<&PatternFinding> {
        self.identified_patterns_summary
            .detected
            .iter()
            .find(|f| f.kind == kind)
    }

    /// Builds the summary from the two upstream records.
    #[must_use]
    pub fn build(
        ticker: &str,
        fetch: Option<&StageOutputRecord>,
        patterns: Option<&StageOutputRecord>,
    ) -> Self {
        let mut gaps = Vec::new();

        let data = match fetch {
            None => {
                gaps.push(DataGap::slot_missing(SlotKey::RealTimeData));
                MarketData::new()
            }
            Some(record) => {
                if record.is_empty() {
                    gaps.push(DataGap::slot_empty(SlotKey::RealTimeData, "data sources"));
                }
                gaps.extend(failure_gaps(SlotKey::RealTimeData, record));
                let data = MarketData::from_record(record, ticker);
                let ticker_key = sanitize_key_part(ticker);
                let session_price_failed = record
                    .entries_of_kind(kinds::INTRADAY_PRICES)
                    .any(|e| e.result.is_failure() && e.key.contains(ticker_key.as_str()));
                if !data.has_prices() && !record.is_empty() && !session_price_failed {
                    let other_series = record
                        .entries_of_kind(kinds::INTRADAY_PRICES)
                        .any(|e| e.result.is_success());
                    let message = if other_series {
                        format!("no intraday price data for {ticker}; series for other tickers were not used")
                    } else {
                        format!("no intraday price data for {ticker}")
                    };
                    gaps.push(DataGap {
                        slot: SlotKey::RealTimeData,
                        key: None,
                        reason: ErrorKind::InsufficientData,
                        message,
                    });
                }
                data
            }
        };

        let patterns_summary = match patterns {
            None => {
                gaps.push(DataGap::slot_missing(SlotKey::PatternRecognition));
                PatternsSummary {
                    narrative: "Pattern recognition did not run.".to_string(),
                    ..PatternsSummary::default()
                }
            }
            Some(record) => {
                if record.is_empty() {
                    gaps.push(DataGap::slot_empty(SlotKey::PatternRecognition, "patterns"));
                }
                gaps.extend(failure_gaps(SlotKey::PatternRecognition, record));
                classify_patterns(record)
            }
        };

        let snapshot = snapshot(ticker, &data);
        let outlook = outlook(ticker, &data, &patterns_summary);

        Self {
            ticker_analyzed: ticker.to_string(),
            current_market_snapshot: snapshot,
            identified_patterns_summary: patterns_summary,
            overall_intraday_outlook: outlook,
            data_gaps: gaps,
        }
    }
}

fn failure_gaps(slot: SlotKey, record: &StageOutputRecord) -> impl Iterator<Item = DataGap> + '_ {
    record.failures().filter_map(move |entry| {
        Some(DataGap {
            slot,
            key: Some(entry.key.clone()),
            reason: entry.result.reason()?,
            message: entry.result.message().unwrap_or_default().to_string(),
        })
    })
}

fn details_of(payload: &serde_json::Value) -> String {
    payload
        .get("details")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn classify_patterns(record: &StageOutputRecord) -> PatternsSummary {
    let mut summary = PatternsSummary::default();

    for entry in record.iter() {
        match entry.result.payload() {
            Some(payload) => {
                let finding = PatternFinding {
                    key: entry.key.clone(),
                    kind: entry.kind.clone(),
                    details: details_of(payload),
                    payload: payload.clone(),
                };
                let negative = payload.get("detected") == Some(&serde_json::Value::Bool(false));
                if negative {
                    summary.not_detected.push(finding);
                } else {
                    summary.detected.push(finding);
                }
            }
            None => summary.unavailable.push(PatternFinding {
                key: entry.key.clone(),
                kind: entry.kind.clone(),
                details: entry.result.message().unwrap_or_default().to_string(),
                payload: serde_json::Value::Null,
            }),
        }
    }

    summary.narrative = narrative(&summary);
    summary
}

fn narrative(summary: &PatternsSummary) -> String {
    let mut parts = Vec::new();

    if !summary.detected.is_empty() {
        let items: Vec<String> = summary
            .detected
            .iter()
            .map(|f| {
                if f.details.is_empty() {
                    f.kind.clone()
                } else {
                    format!("{} ({})", f.kind, f.details)
                }
            })
            .collect();
        parts.push(format!("Detected: {}.", items.join("; ")));
    }
    if !summary.not_detected.is_empty() {
        let kinds: Vec<&str> = summary.not_detected.iter().map(|f| f.kind.as_str()).collect();
        parts.push(format!("Not detected: {}.", kinds.join(", ")));
    }
    if !summary.unavailable.is_empty() {
        let items: Vec<String> = summary
            .unavailable
            .iter()
            .map(|f| format!("{} ({})", f.kind, f.details))
            .collect();
        parts.push(format!("Unavailable: {}.", items.join("; ")));
    }

    if parts.is_empty() {
        "No patterns were analysed.".to_string()
    } else {
        parts.join(" ")
    }
}

fn snapshot(ticker: &str, data: &MarketData) -> MarketSnapshot {
    let last_price = data.last_price();
    let session_change = data.session_change_pct();
    let last_hour = data.trailing_change_pct(LAST_HOUR_MINUTES);

    let price_action = match (last_price, session_change) {
        (Some(price), Some(change)) => {
            let direction = if change >= 0.0 { "up" } else { "down" };
            let mut sentence =
                format!("{ticker} last traded at {price:.2}, {direction} {:.2}% on the session", change.abs());
            if let Some(hour) = last_hour {
                sentence.push_str(&format!(" and {hour:+.2}% over the last hour"));
            }
            sentence.push('.');
            sentence
        }
        _ => format!("No intraday price data was available for {ticker}."),
    };

    let news_headlines = data
        .news_articles
        .iter()
        .rev()
        .take(MAX_HEADLINES)
        .map(|a| a.headline.clone())
        .collect();

    let economic_notes = data
        .economic_data_points
        .iter()
        .map(|p| {
            format!(
                "{} ({}) {}: {} vs {} prior ({:+.2}).",
                p.indicator_name,
                p.country,
                p.period,
                p.value,
                p.previous,
                p.change()
            )
        })
        .collect();

    MarketSnapshot {
        last_price: last_price.map(round2),
        session_change_pct: session_change.map(round2),
        last_hour_change_pct: last_hour.map(round2),
        price_action,
        news_headlines,
        economic_notes,
    }
}

fn outlook(ticker: &str, data: &MarketData, patterns: &PatternsSummary) -> Option<Outlook> {
    if !data.has_prices() && patterns.detected.is_empty() {
        return None;
    }

    let mut score = 0_i32;
    let mut reasons = Vec::new();

    if let Some(change) = data.session_change_pct() {
        if change >= DIRECTIONAL_MOVE_PCT {
            score += 1;
        } else if change <= -DIRECTIONAL_MOVE_PCT {
            score -= 1;
        }
        reasons.push(format!("price {change:+.2}% on the session"));
    }

    for finding in &patterns.detected {
        match finding.kind.as_str() {
            kinds::PRICE_VOLUME_SURGE => {
                let up = finding.payload.get("direction").and_then(serde_json::Value::as_str) != Some("down");
                score += if up { 1 } else { -1 };
                let at = finding
                    .payload
                    .get("timestamp")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("intraday");
                reasons.push(format!(
                    "a {} volume surge at {at}",
                    if up { "bullish" } else { "bearish" }
                ));
            }
            kinds::NEWS_CORRELATION => {
                let sentiment = finding
                    .payload
                    .get("average_sentiment")
                    .and_then(serde_json::Value::as_f64)
                    .unwrap_or_default();
                if sentiment > 0.0 {
                    score += 1;
                } else if sentiment < 0.0 {
                    score -= 1;
                }
                reasons.push("news sentiment moving with price".to_string());
            }
            kinds::TIME_OF_DAY_VOLATILITY => {
                let compared = finding
                    .payload
                    .get("rest_of_session_volatility_pct")
                    .is_some_and(|v| !v.is_null());
                reasons.push(if compared {
                    "a measured opening-hour volatility profile".to_string()
                } else {
                    "an opening-hour volatility reading with no later bars to compare".to_string()
                });
            }
            other => reasons.push(format!("{other} detected")),
        }
    }

    let bias = match score {
        s if s > 0 => Bias::Bullish,
        s if s < 0 => Bias::Bearish,
        _ => Bias::Neutral,
    };
    let statement = if reasons.is_empty() {
        format!("{bias} intraday bias for {ticker} with no directional evidence.")
    } else {
        format!("{bias} intraday bias for {ticker}: {}.", reasons.join(", "))
    };

    Some(Outlook { bias, statement })
}

/// Synthesizes the fetch and pattern records into an [`IntradaySummary`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SummarizeStage;

impl SummarizeStage {
    /// Stage name.
    pub const NAME: &'static str = "summarize";

    /// Creates the stage.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Stage for SummarizeStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn kind(&self) -> StageKind {
        StageKind::Synthesis
    }

    fn output_slot(&self) -> SlotKey {
        SlotKey::AnalysisSummary
    }

    fn input_slots(&self) -> Vec<SlotInput> {
        vec![
            SlotInput::optional(SlotKey::RealTimeData),
            SlotInput::optional(SlotKey::PatternRecognition),
        ]
    }

    async fn execute(&self, inputs: &StageInputs<'_>) -> Result<StageOutput, IntraflowError> {
        let fetch = inputs.record(SlotKey::RealTimeData)?;
        let patterns = inputs.record(SlotKey::PatternRecognition)?;
        let summary = IntradaySummary::build(inputs.ticker(), fetch, patterns);

        info!(
            stage = Self::NAME,
            slot = %SlotKey::AnalysisSummary,
            detected = summary.identified_patterns_summary.detected.len(),
            gaps = summary.data_gaps.len(),
            "Summary complete"
        );
        Ok(StageOutput::new(SlotKey::AnalysisSummary, summary))
    }
}

//! Strategize stage: trading strategy proposals from the summary.

use super::{IntradaySummary, PatternFinding, SlotInput, Stage, StageOutput};
use crate::config::{PipelineConfig, MAX_PROPOSALS_LIMIT};
use crate::context::StageInputs;
use crate::core::{SlotKey, StageKind};
use crate::errors::{ErrorKind, IntraflowError};
use crate::handlers::kinds;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Patterns in the order strategies are built from them. Other kinds follow
/// alphabetically.
const PATTERN_PRIORITY: [&str; 3] = [
    kinds::PRICE_VOLUME_SURGE,
    kinds::NEWS_CORRELATION,
    kinds::TIME_OF_DAY_VOLATILITY,
];

/// The user's appetite for intraday risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskProfile {
    /// Tight targets and stops.
    Conservative,
    /// Balanced targets and stops.
    Moderate,
    /// Wide targets and stops.
    Aggressive,
}

impl RiskProfile {
    /// Parses free-form risk tolerance text, case-insensitively.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" | "conservative" => Some(Self::Conservative),
            "medium" | "moderate" => Some(Self::Moderate),
            "high" | "aggressive" => Some(Self::Aggressive),
            _ => None,
        }
    }

    /// Profit target in percent.
    #[must_use]
    pub const fn profit_target_pct(&self) -> f64 {
        match self {
            Self::Conservative => 0.5,
            Self::Moderate => 1.0,
            Self::Aggressive => 2.0,
        }
    }

    /// Stop loss in percent.
    #[must_use]
    pub const fn stop_loss_pct(&self) -> f64 {
        match self {
            Self::Conservative => 0.25,
            Self::Moderate => 0.5,
            Self::Aggressive => 1.0,
        }
    }
}

impl fmt::Display for RiskProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conservative => write!(f, "conservative"),
            Self::Moderate => write!(f, "moderate"),
            Self::Aggressive => write!(f, "aggressive"),
        }
    }
}

/// Trade direction of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Buy first.
    Long,
    /// Sell first.
    Short,
    /// Either side, depending on the trigger.
    Neutral,
}

impl Direction {
    const fn side(self) -> &'static str {
        match self {
            Self::Long => "long",
            Self::Short => "short",
            Self::Neutral => "in the direction of the break",
        }
    }
}

/// When to get out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitConditions {
    /// Profit target in percent from entry.
    pub profit_target_pct: f64,
    /// Stop loss in percent from entry.
    pub stop_loss_pct: f64,
    /// The exit rule in words.
    pub description: String,
}

/// One proposed intraday strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyProposal {
    /// Short name.
    pub strategy_name: String,
    /// Why the strategy fits the observed patterns.
    pub rationale: String,
    /// Pattern kinds the proposal rests on.
    pub based_on_patterns: Vec<String>,
    /// The analysis the proposal draws from.
    pub based_on_analysis: String,
    /// Trade direction.
    pub direction: Direction,
    /// When to get in.
    pub entry_conditions: String,
    /// When to get out.
    pub exit_conditions: ExitConditions,
    /// How the proposal fits the user's risk tolerance and goals.
    pub alignment: String,
}

/// The explicit no-strategy record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyRejection {
    /// Always `InsufficientAnalysis`.
    pub error: ErrorKind,
    /// What was lacking.
    pub details: String,
}

/// The `intraday_strategy_proposals` slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StrategyOutcome {
    /// One or more proposals.
    Proposals(Vec<StrategyProposal>),
    /// No proposal could be justified.
    Rejected(StrategyRejection),
}

impl StrategyOutcome {
    /// Builds the rejection record for a ticker.
    #[must_use]
    pub fn insufficient_analysis(ticker: &str, reason: &str) -> Self {
        Self::Rejected(StrategyRejection {
            error: ErrorKind::InsufficientAnalysis,
            details: format!(
                "The intraday analysis summary lacked clear patterns or actionable insights for {ticker}. {reason}"
            ),
        })
    }

    /// Returns the proposals, empty when rejected.
    #[must_use]
    pub fn proposals(&self) -> &[StrategyProposal] {
        match self {
            Self::Proposals(proposals) => proposals,
            Self::Rejected(_) => &[],
        }
    }

    /// Returns true for the rejection record.
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

/// Inputs to strategy generation beyond the summary.
#[derive(Debug, Clone)]
struct UserPreferences<'a> {
    profile: RiskProfile,
    raw_tolerance: &'a str,
    recognised: bool,
    goals: &'a str,
}

impl<'a> UserPreferences<'a> {
    fn new(raw_tolerance: &'a str, goals: &'a str) -> Self {
        let parsed = RiskProfile::parse(raw_tolerance);
        Self {
            profile: parsed.unwrap_or(RiskProfile::Moderate),
            raw_tolerance: raw_tolerance.trim(),
            recognised: parsed.is_some(),
            goals: goals.trim(),
        }
    }

    fn alignment(&self) -> String {
        let tolerance = if self.recognised {
            format!("Sized for a {} risk tolerance.", self.profile)
        } else if self.raw_tolerance.is_empty() {
            format!("No risk tolerance was given, so a {} profile was assumed.", self.profile)
        } else {
            format!(
                "Risk tolerance '{}' was not recognised, so a {} profile was assumed.",
                self.raw_tolerance, self.profile
            )
        };
        let goals = if self.goals.is_empty() {
            "No intraday goals were stated.".to_string()
        } else {
            format!("Supports the stated goal: \"{}\".", self.goals)
        };
        format!("{tolerance} {goals}")
    }

    fn exits(&self) -> ExitConditions {
        let target = self.profile.profit_target_pct();
        let stop = self.profile.stop_loss_pct();
        ExitConditions {
            profit_target_pct: target,
            stop_loss_pct: stop,
            description: format!(
                "Take profit at {target:.2}% from entry or stop out at {stop:.2}% against, and be flat before the close."
            ),
        }
    }
}

fn priority(kind: &str) -> usize {
    PATTERN_PRIORITY
        .iter()
        .position(|k| *k == kind)
        .unwrap_or(PATTERN_PRIORITY.len())
}

fn payload_str<'a>(finding: &'a PatternFinding, field: &str) -> Option<&'a str> {
    finding.payload.get(field).and_then(serde_json::Value::as_str)
}

fn payload_f64(finding: &PatternFinding, field: &str) -> Option<f64> {
    finding.payload.get(field).and_then(serde_json::Value::as_f64)
}

fn title_case(kind: &str) -> String {
    kind.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Volatility counts only when compared against the rest of the session
/// and not flat.
fn is_actionable(finding: &PatternFinding) -> bool {
    if finding.kind != kinds::TIME_OF_DAY_VOLATILITY {
        return true;
    }
    let opening = payload_f64(finding, "avg_volatility_pct").unwrap_or_default();
    match payload_f64(finding, "rest_of_session_volatility_pct") {
        Some(rest) => opening > 0.0 || rest > 0.0,
        None => false,
    }
}

/// Builds the strategy outcome for a summary.
#[must_use]
pub fn propose(
    summary: &IntradaySummary,
    risk_tolerance: &str,
    goals: &str,
    max_proposals: usize,
) -> StrategyOutcome {
    let ticker = summary.ticker_analyzed.as_str();
    if !summary.has_detected_patterns() {
        let reason = if summary.data_gaps.is_empty() {
            "None of the requested patterns were detected.".to_string()
        } else {
            let gaps: Vec<String> = summary
                .data_gaps
                .iter()
                .map(|g| format!("{} ({})", g.key.as_deref().unwrap_or(g.slot.as_str()), g.reason))
                .collect();
            format!("No pattern was detected. Data gaps: {}.", gaps.join("; "))
        };
        return StrategyOutcome::insufficient_analysis(ticker, &reason);
    }

    let mut findings: Vec<&PatternFinding> = summary
        .identified_patterns_summary
        .detected
        .iter()
        .filter(|f| is_actionable(f))
        .collect();
    if findings.is_empty() {
        return StrategyOutcome::insufficient_analysis(
            ticker,
            &format!(
                "The detected pattern(s) ({}) gave no comparison to trade on.",
                summary.detected_kinds().join(", ")
            ),
        );
    }

    let prefs = UserPreferences::new(risk_tolerance, goals);
    findings.sort_by(|a, b| {
        priority(&a.kind)
            .cmp(&priority(&b.kind))
            .then_with(|| a.kind.cmp(&b.kind))
    });
    findings.dedup_by(|a, b| a.kind == b.kind);

    let limit = max_proposals.clamp(1, MAX_PROPOSALS_LIMIT);
    let proposals = findings
        .into_iter()
        .take(limit)
        .map(|finding| proposal_for(summary, finding, &prefs))
        .collect();

    StrategyOutcome::Proposals(proposals)
}

fn proposal_for(summary: &IntradaySummary, finding: &PatternFinding, prefs: &UserPreferences<'_>) -> StrategyProposal {
    let ticker = summary.ticker_analyzed.as_str();
    let based_on_analysis = summary
        .overall_intraday_outlook
        .as_ref()
        .map_or_else(
            || summary.identified_patterns_summary.narrative.clone(),
            |o| o.statement.clone(),
        );
    let mut patterns = vec![finding.kind.clone()];

    let (strategy_name, direction, rationale, entry_conditions) = match finding.kind.as_str() {
        kinds::PRICE_VOLUME_SURGE => {
            let direction = if payload_str(finding, "direction") == Some("down") {
                Direction::Short
            } else {
                Direction::Long
            };
            let at = payload_str(finding, "timestamp").unwrap_or("the surge bar");
            let mut rationale = format!(
                "{} Outsized volume behind a sharp move often sees follow-through within the session.",
                finding.details
            )
            .trim()
            .to_string();
            if let Some(news) = summary.detected(kinds::NEWS_CORRELATION) {
                patterns.push(news.kind.clone());
                rationale.push_str(" News sentiment is moving the same way, which supports the move.");
            }
            let name = match direction {
                Direction::Short => "Surge Breakdown Continuation",
                _ => "Surge Momentum Continuation",
            };
            (
                name.to_string(),
                direction,
                rationale,
                format!(
                    "Enter {} on {ticker} when price holds beyond the range of the {at} surge bar with volume above the session average.",
                    direction.side()
                ),
            )
        }
        kinds::NEWS_CORRELATION => {
            let sentiment = payload_f64(finding, "average_sentiment").unwrap_or_default();
            let direction = if sentiment < 0.0 { Direction::Short } else { Direction::Long };
            (
                "News Sentiment Drift".to_string(),
                direction,
                format!("{} Aligned news flow tends to keep pressure on price through the session.", finding.details)
                    .trim()
                    .to_string(),
                format!(
                    "Enter {} on {ticker} on the first pullback that holds the session VWAP while news tone stays {}.",
                    direction.side(),
                    if sentiment < 0.0 { "negative" } else { "positive" }
                ),
            )
        }
        kinds::TIME_OF_DAY_VOLATILITY => {
            let opening = payload_f64(finding, "avg_volatility_pct").unwrap_or_default();
            let rest = payload_f64(finding, "rest_of_session_volatility_pct").unwrap_or_default();
            let opening_heavier = opening > rest;
            if opening_heavier {
                (
                    "Opening Range Breakout".to_string(),
                    Direction::Neutral,
                    format!("{} Most of the session's movement happens early, so the opening range sets the levels.", finding.details)
                        .trim()
                        .to_string(),
                    format!("Mark the first-hour high and low on {ticker} and enter on a close outside that range."),
                )
            } else {
                (
                    "Afternoon Range Expansion".to_string(),
                    Direction::Neutral,
                    format!("{} Volatility builds after the open, so later breaks carry more range.", finding.details)
                        .trim()
                        .to_string(),
                    format!("Wait for the first-hour range on {ticker} to hold, then enter on a break after it."),
                )
            }
        }
        other => {
            let direction = match summary.overall_intraday_outlook.as_ref().map(|o| o.bias) {
                Some(super::Bias::Bullish) => Direction::Long,
                Some(super::Bias::Bearish) => Direction::Short,
                _ => Direction::Neutral,
            };
            (
                format!("{} Follow-Through", title_case(other)),
                direction,
                if finding.details.is_empty() {
                    format!("{other} was detected in the session.")
                } else {
                    finding.details.clone()
                },
                format!("Enter {} on {ticker} once the {other} signal is confirmed by the next bar.", direction.side()),
            )
        }
    };

    StrategyProposal {
        strategy_name,
        rationale,
        based_on_patterns: patterns,
        based_on_analysis,
        direction,
        entry_conditions,
        exit_conditions: prefs.exits(),
        alignment: prefs.alignment(),
    }
}

/// Turns the analysis summary into strategy proposals.
#[derive(Debug, Clone, Copy)]
pub struct StrategizeStage {
    max_proposals: usize,
}

impl Default for StrategizeStage {
    fn default() -> Self {
        Self::new(MAX_PROPOSALS_LIMIT)
    }
}

impl StrategizeStage {
    /// Stage name.
    pub const NAME: &'static str = "strategize";

    /// Creates the stage. `max_proposals` is clamped to the supported range.
    #[must_use]
    pub fn new(max_proposals: usize) -> Self {
        Self {
            max_proposals: max_proposals.clamp(1, MAX_PROPOSALS_LIMIT),
        }
    }

    /// Creates the stage from pipeline configuration.
    #[must_use]
    pub fn standard(config: &PipelineConfig) -> Self {
        Self::new(config.strategy.max_proposals)
    }

    /// Returns the proposal limit.
    #[must_use]
    pub const fn max_proposals(&self) -> usize {
        self.max_proposals
    }
}

#[async_trait]
impl Stage for StrategizeStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn kind(&self) -> StageKind {
        StageKind::Synthesis
    }

    fn output_slot(&self) -> SlotKey {
        SlotKey::StrategyProposals
    }

    fn input_slots(&self) -> Vec<SlotInput> {
        vec![SlotInput::required(SlotKey::AnalysisSummary)]
    }

    async fn execute(&self, inputs: &StageInputs<'_>) -> Result<StageOutput, IntraflowError> {
        let request = inputs.request();
        let outcome = match inputs.summary()? {
            Some(summary) => propose(
                summary,
                &request.user_intraday_risk_tolerance,
                &request.user_intraday_goals,
                self.max_proposals,
            ),
            None => StrategyOutcome::insufficient_analysis(
                inputs.ticker(),
                "No analysis summary was produced.",
            ),
        };

        info!(
            stage = Self::NAME,
            slot = %SlotKey::StrategyProposals,
            proposals = outcome.proposals().len(),
            rejected = outcome.is_rejected(),
            "Strategy generation complete"
        );
        Ok(StageOutput::new(SlotKey::StrategyProposals, outcome))
    }
}

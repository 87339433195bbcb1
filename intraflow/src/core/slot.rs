//! Slot keys and stage kind enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The named output slots of the intraday pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SlotKey {
    /// Raw data retrieved by the fetch stage.
    #[serde(rename = "real_time_data_output")]
    RealTimeData,
    /// Pattern findings produced by the recognize stage.
    #[serde(rename = "pattern_recognition_output")]
    PatternRecognition,
    /// The synthesized intraday summary.
    #[serde(rename = "intraday_analysis_summary")]
    AnalysisSummary,
    /// Strategy proposals, or the explicit insufficient-analysis record.
    #[serde(rename = "intraday_strategy_proposals")]
    StrategyProposals,
}

impl SlotKey {
    /// Every slot, in pipeline order.
    pub const ALL: [Self; 4] = [
        Self::RealTimeData,
        Self::PatternRecognition,
        Self::AnalysisSummary,
        Self::StrategyProposals,
    ];

    /// Returns the wire name of the slot.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RealTimeData => "real_time_data_output",
            Self::PatternRecognition => "pattern_recognition_output",
            Self::AnalysisSummary => "intraday_analysis_summary",
            Self::StrategyProposals => "intraday_strategy_proposals",
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a stage can proceed without an input slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotRequirement {
    /// The slot must be produced by an earlier stage.
    Required,
    /// The stage degrades gracefully when the slot is absent.
    Optional,
}

/// The kind of work a stage performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// A stage that routes request items through a capability registry.
    #[default]
    Dispatch,
    /// A stage that aggregates upstream slots without handlers.
    Synthesis,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dispatch => write!(f, "dispatch"),
            Self::Synthesis => write!(f, "synthesis"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_key_wire_names() {
        for slot in SlotKey::ALL {
            let json = serde_json::to_string(&slot).unwrap();
            assert_eq!(json, format!("\"{}\"", slot.as_str()));
        }
    }

    #[test]
    fn test_slot_key_deserialize() {
        let slot: SlotKey = serde_json::from_str(r#""intraday_analysis_summary""#).unwrap();
        assert_eq!(slot, SlotKey::AnalysisSummary);
    }

    #[test]
    fn test_stage_kind_display() {
        assert_eq!(StageKind::Dispatch.to_string(), "dispatch");
        assert_eq!(StageKind::Synthesis.to_string(), "synthesis");
        assert_eq!(StageKind::default(), StageKind::Dispatch);
    }
}

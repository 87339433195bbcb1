//! Stage input and output ports.

use crate::context::SlotValue;
use crate::core::{SlotKey, SlotRequirement};
use crate::stages::StrategyOutcome;

/// One slot a stage reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotInput {
    /// The slot.
    pub slot: SlotKey,
    /// Whether the stage can run without it.
    pub requirement: SlotRequirement,
}

impl SlotInput {
    /// A slot that must come from an earlier stage.
    #[must_use]
    pub const fn required(slot: SlotKey) -> Self {
        Self {
            slot,
            requirement: SlotRequirement::Required,
        }
    }

    /// A slot the stage tolerates missing.
    #[must_use]
    pub const fn optional(slot: SlotKey) -> Self {
        Self {
            slot,
            requirement: SlotRequirement::Optional,
        }
    }

    /// Returns true if the slot is required.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        matches!(self.requirement, SlotRequirement::Required)
    }
}

/// What a stage produced: one value for its output slot.
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutput {
    /// The slot to write.
    pub slot: SlotKey,
    /// The value to write.
    pub value: SlotValue,
}

impl StageOutput {
    /// Creates a new stage output.
    #[must_use]
    pub fn new(slot: SlotKey, value: impl Into<SlotValue>) -> Self {
        Self {
            slot,
            value: value.into(),
        }
    }

    /// Counts what went wrong: failed record entries, summary gaps, or one
    /// for a strategy rejection.
    #[must_use]
    pub fn failures(&self) -> usize {
        match &self.value {
            SlotValue::Record(record) => record.failure_count(),
            SlotValue::Summary(summary) => summary.data_gaps.len(),
            SlotValue::Strategy(StrategyOutcome::Rejected(_)) => 1,
            SlotValue::Strategy(StrategyOutcome::Proposals(_)) => 0,
        }
    }
}

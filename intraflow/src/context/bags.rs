//! Write-once slot storage.

use crate::core::{SlotKey, StageOutputRecord};
use crate::errors::SlotConflictError;
use crate::stages::{IntradaySummary, StrategyOutcome};
use serde::Serialize;
use std::collections::BTreeMap;

/// The value a stage writes into its slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SlotValue {
    /// A dispatch stage's keyed record.
    Record(StageOutputRecord),
    /// The synthesized analysis summary.
    Summary(IntradaySummary),
    /// Strategy proposals or a rejection.
    Strategy(StrategyOutcome),
}

impl SlotValue {
    /// Returns the record, if this is one.
    #[must_use]
    pub const fn as_record(&self) -> Option<&StageOutputRecord> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Returns the summary, if this is one.
    #[must_use]
    pub const fn as_summary(&self) -> Option<&IntradaySummary> {
        match self {
            Self::Summary(summary) => Some(summary),
            _ => None,
        }
    }

    /// Returns the strategy outcome, if this is one.
    #[must_use]
    pub const fn as_strategy(&self) -> Option<&StrategyOutcome> {
        match self {
            Self::Strategy(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Renders the value as JSON.
    ///
    /// Records render keyed by entry key, one JSON field per entry.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Record(record) => record.to_keyed_json(),
            Self::Summary(summary) => serde_json::to_value(summary).unwrap_or_default(),
            Self::Strategy(outcome) => serde_json::to_value(outcome).unwrap_or_default(),
        }
    }
}

impl From<StageOutputRecord> for SlotValue {
    fn from(record: StageOutputRecord) -> Self {
        Self::Record(record)
    }
}

impl From<IntradaySummary> for SlotValue {
    fn from(summary: IntradaySummary) -> Self {
        Self::Summary(summary)
    }
}

impl From<StrategyOutcome> for SlotValue {
    fn from(outcome: StrategyOutcome) -> Self {
        Self::Strategy(outcome)
    }
}

/// Slot storage where every slot can be written exactly once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotBag {
    slots: BTreeMap<SlotKey, SlotValue>,
}

impl SlotBag {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a slot value.
    #[must_use]
    pub fn get(&self, slot: SlotKey) -> Option<&SlotValue> {
        self.slots.get(&slot)
    }

    /// Checks if a slot was written.
    #[must_use]
    pub fn contains(&self, slot: SlotKey) -> bool {
        self.slots.contains_key(&slot)
    }

    /// Writes a slot.
    ///
    /// # Errors
    ///
    /// Returns `SlotConflictError` if the slot was already written.
    pub fn set(&mut self, slot: SlotKey, value: SlotValue) -> Result<(), SlotConflictError> {
        if self.slots.contains_key(&slot) {
            return Err(SlotConflictError::new(slot));
        }
        self.slots.insert(slot, value);
        Ok(())
    }

    /// Returns the written slots in pipeline order.
    #[must_use]
    pub fn slots(&self) -> Vec<SlotKey> {
        self.slots.keys().copied().collect()
    }

    /// Iterates written slots in pipeline order.
    pub fn iter(&self) -> impl Iterator<Item = (&SlotKey, &SlotValue)> {
        self.slots.iter()
    }

    /// Returns the number of written slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if nothing was written yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

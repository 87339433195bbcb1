//! The per-session pipeline context.

use super::{SessionIdentity, SlotBag, SlotValue};
use crate::core::{SlotKey, StageOutputRecord};
use crate::errors::SlotConflictError;
use crate::pipeline::PipelineRequest;
use crate::stages::{IntradaySummary, StrategyOutcome};

/// Accumulates stage outputs for one session.
///
/// Append-only: each slot is written once and never changed afterwards.
/// A context lives for exactly one session.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    /// Session identity.
    identity: SessionIdentity,
    /// The caller's request.
    request: PipelineRequest,
    /// Written slots.
    slots: SlotBag,
}

impl PipelineContext {
    /// Creates a context for a request with a fresh identity.
    #[must_use]
    pub fn new(request: PipelineRequest) -> Self {
        Self::with_identity(SessionIdentity::for_request(&request), request)
    }

    /// Creates a context with an explicit identity.
    #[must_use]
    pub fn with_identity(identity: SessionIdentity, request: PipelineRequest) -> Self {
        Self {
            identity,
            request,
            slots: SlotBag::new(),
        }
    }

    /// Returns the session identity.
    #[must_use]
    pub const fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    /// Returns the request.
    #[must_use]
    pub const fn request(&self) -> &PipelineRequest {
        &self.request
    }

    /// Returns the ticker under analysis.
    #[must_use]
    pub fn ticker(&self) -> &str {
        &self.request.ticker
    }

    /// Writes a slot.
    ///
    /// # Errors
    ///
    /// Returns `SlotConflictError` if the slot was already written.
    pub fn write(&mut self, slot: SlotKey, value: impl Into<SlotValue>) -> Result<(), SlotConflictError> {
        self.slots.set(slot, value.into())
    }

    /// Gets a slot value.
    #[must_use]
    pub fn get(&self, slot: SlotKey) -> Option<&SlotValue> {
        self.slots.get(slot)
    }

    /// Checks if a slot was written.
    #[must_use]
    pub fn contains(&self, slot: SlotKey) -> bool {
        self.slots.contains(slot)
    }

    /// Returns the written slots in pipeline order.
    #[must_use]
    pub fn written_slots(&self) -> Vec<SlotKey> {
        self.slots.slots()
    }

    /// The fetch record.
    #[must_use]
    pub fn real_time_data(&self) -> Option<&StageOutputRecord> {
        self.get(SlotKey::RealTimeData).and_then(SlotValue::as_record)
    }

    /// The pattern record.
    #[must_use]
    pub fn pattern_recognition(&self) -> Option<&StageOutputRecord> {
        self.get(SlotKey::PatternRecognition).and_then(SlotValue::as_record)
    }

    /// The analysis summary.
    #[must_use]
    pub fn analysis_summary(&self) -> Option<&IntradaySummary> {
        self.get(SlotKey::AnalysisSummary).and_then(SlotValue::as_summary)
    }

    /// The strategy outcome.
    #[must_use]
    pub fn strategy_proposals(&self) -> Option<&StrategyOutcome> {
        self.get(SlotKey::StrategyProposals).and_then(SlotValue::as_strategy)
    }

    /// Renders the combined result: one top-level key per written slot plus
    /// a `session` object.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (slot, value) in self.slots.iter() {
            map.insert(slot.as_str().to_string(), value.to_json());
        }
        map.insert("session".to_string(), self.identity.to_json());
        serde_json::Value::Object(map)
    }
}

//! Stage inputs with strictness enforcement.

use super::{PipelineContext, SessionIdentity, SlotValue};
use crate::core::{SlotKey, StageOutputRecord};
use crate::errors::UndeclaredSlotError;
use crate::pipeline::PipelineRequest;
use crate::stages::IntradaySummary;

/// A read-only view of the context for one stage.
///
/// In strict mode, reading a slot the stage did not declare is an error.
#[derive(Debug, Clone)]
pub struct StageInputs<'a> {
    /// The context being read.
    context: &'a PipelineContext,
    /// Slots the stage declared as inputs.
    declared: Vec<SlotKey>,
    /// The current stage (for error messages).
    stage_name: String,
    /// Whether strict mode is enabled.
    strict: bool,
}

impl<'a> StageInputs<'a> {
    /// Creates new stage inputs.
    #[must_use]
    pub fn new(
        context: &'a PipelineContext,
        stage_name: impl Into<String>,
        declared: impl IntoIterator<Item = SlotKey>,
        strict: bool,
    ) -> Self {
        Self {
            context,
            declared: declared.into_iter().collect(),
            stage_name: stage_name.into(),
            strict,
        }
    }

    /// Creates permissive inputs that may read any slot.
    #[must_use]
    pub fn permissive(context: &'a PipelineContext, stage_name: impl Into<String>) -> Self {
        Self::new(context, stage_name, SlotKey::ALL, false)
    }

    /// Reads a slot.
    ///
    /// # Errors
    ///
    /// Returns `UndeclaredSlotError` in strict mode if the slot is not a
    /// declared input.
    pub fn get(&self, slot: SlotKey) -> Result<Option<&'a SlotValue>, UndeclaredSlotError> {
        if self.strict && !self.declared.contains(&slot) {
            return Err(UndeclaredSlotError::new(&self.stage_name, slot));
        }
        Ok(self.context.get(slot))
    }

    /// Reads a record slot. A slot holding another value type reads as absent.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn record(&self, slot: SlotKey) -> Result<Option<&'a StageOutputRecord>, UndeclaredSlotError> {
        Ok(self.get(slot)?.and_then(SlotValue::as_record))
    }

    /// Reads the analysis summary slot.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn summary(&self) -> Result<Option<&'a IntradaySummary>, UndeclaredSlotError> {
        Ok(self.get(SlotKey::AnalysisSummary)?.and_then(SlotValue::as_summary))
    }

    /// Reads a slot without the strictness check.
    #[must_use]
    pub fn get_unchecked(&self, slot: SlotKey) -> Option<&'a SlotValue> {
        self.context.get(slot)
    }

    /// The caller's request.
    #[must_use]
    pub fn request(&self) -> &'a PipelineRequest {
        self.context.request()
    }

    /// The session identity.
    #[must_use]
    pub fn identity(&self) -> &'a SessionIdentity {
        self.context.identity()
    }

    /// The ticker under analysis.
    #[must_use]
    pub fn ticker(&self) -> &'a str {
        self.context.ticker()
    }

    /// Returns the stage name.
    #[must_use]
    pub fn stage_name(&self) -> &str {
        &self.stage_name
    }

    /// Returns the declared slots.
    #[must_use]
    pub fn declared(&self) -> &[SlotKey] {
        &self.declared
    }

    /// Returns whether strict mode is enabled.
    #[must_use]
    pub const fn is_strict(&self) -> bool {
        self.strict
    }
}

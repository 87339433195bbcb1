//! Stage trait and the four intraday stage adapters.
//!
//! Fetch and recognize dispatch request items through a capability
//! registry. Summarize and strategize are synthesis stages with fixed
//! deterministic rules.

mod fetch;
mod ports;
mod recognize;
mod strategize;
mod summarize;

pub use fetch::FetchStage;
pub use ports::{SlotInput, StageOutput};
pub use recognize::RecognizeStage;
pub use strategize::{
    Direction, ExitConditions, RiskProfile, StrategizeStage, StrategyOutcome, StrategyProposal,
    StrategyRejection,
};
pub use summarize::{
    Bias, DataGap, IntradaySummary, MarketSnapshot, Outlook, PatternFinding, PatternsSummary,
    SummarizeStage,
};

use crate::context::{SlotValue, StageInputs};
use crate::core::{SlotKey, StageKind};
use crate::errors::IntraflowError;
use async_trait::async_trait;
use std::fmt::Debug;

/// Trait for pipeline stages.
///
/// A stage reads declared slots through [`StageInputs`] and produces exactly
/// one value for its output slot. Item-level problems travel inside that
/// value; an `Err` means a wiring invariant was violated.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Returns the name of the stage.
    fn name(&self) -> &str;

    /// Returns whether the stage dispatches items or synthesizes.
    fn kind(&self) -> StageKind;

    /// Returns the slot this stage writes.
    fn output_slot(&self) -> SlotKey;

    /// Returns the slots this stage reads.
    fn input_slots(&self) -> Vec<SlotInput>;

    /// Executes the stage.
    ///
    /// # Errors
    ///
    /// Returns `UndeclaredSlot` if the stage reads an undeclared slot in
    /// strict mode.
    async fn execute(&self, inputs: &StageInputs<'_>) -> Result<StageOutput, IntraflowError>;
}

/// A simple function-based synthesis stage.
pub struct FnStage<F>
where
    F: Fn(&StageInputs<'_>) -> Result<SlotValue, IntraflowError> + Send + Sync,
{
    name: String,
    output: SlotKey,
    inputs: Vec<SlotInput>,
    func: F,
}

impl<F> FnStage<F>
where
    F: Fn(&StageInputs<'_>) -> Result<SlotValue, IntraflowError> + Send + Sync,
{
    /// Creates a new function-based stage with no inputs.
    pub fn new(name: impl Into<String>, output: SlotKey, func: F) -> Self {
        Self {
            name: name.into(),
            output,
            inputs: Vec::new(),
            func,
        }
    }

    /// Sets the declared inputs.
    #[must_use]
    pub fn with_inputs(mut self, inputs: impl IntoIterator<Item = SlotInput>) -> Self {
        self.inputs = inputs.into_iter().collect();
        self
    }
}

impl<F> Debug for FnStage<F>
where
    F: Fn(&StageInputs<'_>) -> Result<SlotValue, IntraflowError> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStage")
            .field("name", &self.name)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> Stage for FnStage<F>
where
    F: Fn(&StageInputs<'_>) -> Result<SlotValue, IntraflowError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StageKind {
        StageKind::Synthesis
    }

    fn output_slot(&self) -> SlotKey {
        self.output
    }

    fn input_slots(&self) -> Vec<SlotInput> {
        self.inputs.clone()
    }

    async fn execute(&self, inputs: &StageInputs<'_>) -> Result<StageOutput, IntraflowError> {
        let value = (self.func)(inputs)?;
        Ok(StageOutput::new(self.output, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::PipelineContext;
    use crate::core::StageOutputRecord;
    use crate::pipeline::PipelineRequest;

    #[tokio::test]
    async fn test_fn_stage() {
        let stage = FnStage::new("custom", SlotKey::RealTimeData, |_inputs| {
            Ok(SlotValue::Record(StageOutputRecord::new()))
        });

        assert_eq!(stage.name(), "custom");
        assert_eq!(stage.kind(), StageKind::Synthesis);
        assert!(stage.input_slots().is_empty());

        let ctx = PipelineContext::new(PipelineRequest::new("AAPL"));
        let inputs = StageInputs::permissive(&ctx, "custom");
        let output = stage.execute(&inputs).await.unwrap();
        assert_eq!(output.slot, SlotKey::RealTimeData);
        assert_eq!(output.failures(), 0);
    }

    #[tokio::test]
    async fn test_fn_stage_strict_read() {
        let stage = FnStage::new("reader", SlotKey::AnalysisSummary, |inputs| {
            inputs.record(SlotKey::PatternRecognition)?;
            Ok(SlotValue::Record(StageOutputRecord::new()))
        })
        .with_inputs([SlotInput::optional(SlotKey::RealTimeData)]);

        let ctx = PipelineContext::new(PipelineRequest::new("AAPL"));
        let inputs = StageInputs::new(&ctx, "reader", [SlotKey::RealTimeData], true);
        let err = stage.execute(&inputs).await.unwrap_err();
        assert!(matches!(err, IntraflowError::UndeclaredSlot(_)));
    }
}

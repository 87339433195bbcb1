//! Pipeline builder with wiring validation.

use super::IntradayPipeline;
use crate::core::SlotKey;
use crate::errors::{ContractErrorInfo, PipelineValidationError};
use crate::events::EventSink;
use crate::stages::Stage;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builder for creating validated pipelines.
///
/// Stages run in the order they are added. Validation runs in
/// [`build`](Self::build).
#[derive(Clone)]
pub struct PipelineBuilder {
    name: String,
    stages: Vec<Arc<dyn Stage>>,
    strict_inputs: bool,
    event_sink: Option<Arc<dyn EventSink>>,
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("name", &self.name)
            .field("stages", &self.stage_names())
            .field("strict_inputs", &self.strict_inputs)
            .finish_non_exhaustive()
    }
}

impl PipelineBuilder {
    /// Creates a new pipeline builder. Strict inputs are on by default.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
            strict_inputs: true,
            event_sink: None,
        }
    }

    /// Appends a stage.
    #[must_use]
    pub fn stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Appends a stage in place.
    pub fn add_stage(&mut self, stage: Arc<dyn Stage>) {
        self.stages.push(stage);
    }

    /// Enables or disables strict input checking.
    #[must_use]
    pub const fn with_strict_inputs(mut self, strict: bool) -> Self {
        self.strict_inputs = strict;
        self
    }

    /// Sets the event sink. Without one, the process-wide sink is used.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Returns the stage names in run order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Validates the wiring and builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns `PipelineValidationError` when the pipeline is empty, two
    /// stages write the same slot, or a required input is not produced by an
    /// earlier stage.
    pub fn build(self) -> Result<IntradayPipeline, PipelineValidationError> {
        self.validate()?;
        Ok(IntradayPipeline::from_parts(
            self.name,
            self.stages,
            self.strict_inputs,
            self.event_sink,
        ))
    }

    fn validate(&self) -> Result<(), PipelineValidationError> {
        if self.stages.is_empty() {
            return Err(PipelineValidationError::new(format!(
                "Pipeline '{}' has no stages",
                self.name
            ))
            .with_error_info(
                ContractErrorInfo::new("PIPELINE-003-EMPTY", "Cannot build an empty pipeline")
                    .with_fix_hint("Add at least one stage to the pipeline before building."),
            ));
        }

        let mut producers: BTreeMap<SlotKey, &str> = BTreeMap::new();
        for stage in &self.stages {
            for input in stage.input_slots().iter().filter(|i| i.is_required()) {
                if !producers.contains_key(&input.slot) {
                    return Err(PipelineValidationError::new(format!(
                        "Stage '{}' requires slot '{}' which no earlier stage produces",
                        stage.name(),
                        input.slot
                    ))
                    .with_stages(vec![stage.name().to_string()])
                    .with_error_info(
                        ContractErrorInfo::new(
                            "PIPELINE-002-MISSING_SLOT",
                            format!("Required slot '{}' is never written before it is read", input.slot),
                        )
                        .with_fix_hint("Add the producing stage earlier, or mark the input optional.")
                        .with_context_entry("slot", input.slot.as_str()),
                    ));
                }
            }

            let slot = stage.output_slot();
            if let Some(existing) = producers.get(&slot) {
                return Err(PipelineValidationError::new(format!(
                    "Stages '{existing}' and '{}' both write slot '{slot}'",
                    stage.name()
                ))
                .with_stages(vec![(*existing).to_string(), stage.name().to_string()])
                .with_error_info(
                    ContractErrorInfo::new(
                        "PIPELINE-001-SLOT_CONFLICT",
                        format!("Slot '{slot}' has more than one producer"),
                    )
                    .with_fix_hint("Each slot is written exactly once. Remove or retarget one of the stages.")
                    .with_context_entry("slot", slot.as_str()),
                ));
            }
            producers.insert(slot, stage.name());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SlotValue;
    use crate::core::StageOutputRecord;
    use crate::stages::{FnStage, SlotInput};
    use pretty_assertions::assert_eq;

    fn writer(name: &str, slot: SlotKey) -> Arc<dyn Stage> {
        Arc::new(FnStage::new(name, slot, |_| {
            Ok(SlotValue::Record(StageOutputRecord::new()))
        }))
    }

    fn reader(name: &str, slot: SlotKey, input: SlotInput) -> Arc<dyn Stage> {
        Arc::new(
            FnStage::new(name, slot, |_| Ok(SlotValue::Record(StageOutputRecord::new())))
                .with_inputs([input]),
        )
    }

    #[test]
    fn test_build_linear_pipeline() {
        let pipeline = PipelineBuilder::new("linear")
            .stage(writer("a", SlotKey::RealTimeData))
            .stage(reader("b", SlotKey::PatternRecognition, SlotInput::required(SlotKey::RealTimeData)))
            .build()
            .unwrap();

        assert_eq!(pipeline.stage_names(), vec!["a", "b"]);
        assert!(pipeline.strict_inputs());
    }

    #[test]
    fn test_empty_pipeline_rejected() {
        let err = PipelineBuilder::new("empty").build().unwrap_err();
        assert_eq!(err.code(), Some("PIPELINE-003-EMPTY"));
    }

    #[test]
    fn test_slot_conflict_rejected() {
        let err = PipelineBuilder::new("dup")
            .stage(writer("first", SlotKey::RealTimeData))
            .stage(writer("second", SlotKey::RealTimeData))
            .build()
            .unwrap_err();

        assert_eq!(err.code(), Some("PIPELINE-001-SLOT_CONFLICT"));
        assert_eq!(err.stages, vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn test_missing_required_slot_rejected() {
        let err = PipelineBuilder::new("gap")
            .stage(reader("b", SlotKey::PatternRecognition, SlotInput::required(SlotKey::RealTimeData)))
            .build()
            .unwrap_err();

        assert_eq!(err.code(), Some("PIPELINE-002-MISSING_SLOT"));
        assert!(err.message.contains("real_time_data_output"));
    }

    #[test]
    fn test_missing_optional_slot_allowed() {
        let mut builder = PipelineBuilder::new("optional");
        builder.add_stage(reader("b", SlotKey::PatternRecognition, SlotInput::optional(SlotKey::RealTimeData)));
        assert_eq!(builder.stage_count(), 1);
        assert!(builder.build().is_ok());
    }

    #[test]
    fn test_input_produced_later_is_missing() {
        let err = PipelineBuilder::new("order")
            .stage(reader("b", SlotKey::PatternRecognition, SlotInput::required(SlotKey::RealTimeData)))
            .stage(writer("a", SlotKey::RealTimeData))
            .build()
            .unwrap_err();
        assert_eq!(err.code(), Some("PIPELINE-002-MISSING_SLOT"));
    }
}

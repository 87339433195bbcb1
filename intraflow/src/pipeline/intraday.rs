//! The intraday pipeline composer.

use super::{PipelineBuilder, PipelineRequest};
use crate::config::PipelineConfig;
use crate::context::{PipelineContext, StageInputs};
use crate::errors::{ContractErrorInfo, IntraflowError, PipelineValidationError};
use crate::events::{self, EventSink};
use crate::stages::{FetchStage, RecognizeStage, Stage, StrategizeStage, SummarizeStage};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Name of the standard four-stage pipeline.
pub const STANDARD_PIPELINE: &str = "intraday_advisory";

/// Runs stages strictly in order over one session context.
///
/// Item-level failures never stop a run; they travel forward as degraded
/// data. `run` only fails when a composer invariant is violated.
#[derive(Clone)]
pub struct IntradayPipeline {
    name: String,
    stages: Vec<Arc<dyn Stage>>,
    strict_inputs: bool,
    event_sink: Option<Arc<dyn EventSink>>,
}

impl std::fmt::Debug for IntradayPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntradayPipeline")
            .field("name", &self.name)
            .field("stages", &self.stage_names())
            .field("strict_inputs", &self.strict_inputs)
            .finish_non_exhaustive()
    }
}

impl IntradayPipeline {
    pub(super) fn from_parts(
        name: String,
        stages: Vec<Arc<dyn Stage>>,
        strict_inputs: bool,
        event_sink: Option<Arc<dyn EventSink>>,
    ) -> Self {
        Self {
            name,
            stages,
            strict_inputs,
            event_sink,
        }
    }

    /// Returns a builder for a custom pipeline.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> PipelineBuilder {
        PipelineBuilder::new(name)
    }

    /// Wires fetch, recognize, summarize and strategize with the built-in
    /// handlers.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the configuration is invalid.
    pub fn standard(config: &PipelineConfig) -> Result<Self, IntraflowError> {
        Self::standard_builder(config)?.build().map_err(Into::into)
    }

    /// Returns a builder preloaded with the four standard stages.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the configuration is invalid.
    pub fn standard_builder(config: &PipelineConfig) -> Result<PipelineBuilder, IntraflowError> {
        config.validate()?;
        Ok(PipelineBuilder::new(STANDARD_PIPELINE)
            .with_strict_inputs(config.strict_inputs)
            .stage(Arc::new(FetchStage::standard(config)?))
            .stage(Arc::new(RecognizeStage::standard(config)?))
            .stage(Arc::new(SummarizeStage::new()))
            .stage(Arc::new(StrategizeStage::standard(config))))
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the stage names in run order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Returns whether stages may only read declared slots.
    #[must_use]
    pub const fn strict_inputs(&self) -> bool {
        self.strict_inputs
    }

    fn sink(&self) -> Arc<dyn EventSink> {
        self.event_sink.clone().unwrap_or_else(events::get_event_sink)
    }

    /// Runs one session for a request.
    ///
    /// # Errors
    ///
    /// Returns `UndeclaredSlot` if a stage reads a slot it did not declare
    /// while strict inputs are on, `SlotConflict` if a slot would be written
    /// twice, or `Validation` if a stage writes a slot other than the one it
    /// declared.
    pub async fn run(&self, request: PipelineRequest) -> Result<PipelineContext, IntraflowError> {
        self.run_with_context(PipelineContext::new(request)).await
    }

    /// Runs one session over a prepared context.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub async fn run_with_context(&self, mut context: PipelineContext) -> Result<PipelineContext, IntraflowError> {
        let sink = self.sink();
        let identity = context.identity().clone();
        let started = Instant::now();

        info!(
            pipeline = %self.name,
            session_id = %identity.session_id,
            ticker = %identity.ticker,
            stages = self.stages.len(),
            "Pipeline started"
        );
        sink.emit(
            events::PIPELINE_STARTED,
            Some(events::session_payload(
                &identity,
                json!({"pipeline": self.name, "stages": self.stage_names()}),
            )),
        )
        .await;

        for stage in &self.stages {
            let slot = stage.output_slot();
            sink.emit(
                events::STAGE_STARTED,
                Some(events::session_payload(
                    &identity,
                    json!({"stage": stage.name(), "kind": stage.kind().to_string(), "slot": slot.as_str()}),
                )),
            )
            .await;

            let stage_start = Instant::now();
            let output = {
                let declared = stage.input_slots().into_iter().map(|i| i.slot);
                let inputs = StageInputs::new(&context, stage.name(), declared, self.strict_inputs);
                stage.execute(&inputs).await?
            };

            if output.slot != slot {
                return Err(PipelineValidationError::new(format!(
                    "Stage '{}' declared slot '{slot}' but wrote '{}'",
                    stage.name(),
                    output.slot
                ))
                .with_stages(vec![stage.name().to_string()])
                .with_error_info(ContractErrorInfo::new(
                    "PIPELINE-004-WRONG_SLOT",
                    "Stage output does not match its declared slot",
                ))
                .into());
            }

            let failures = output.failures();
            context.write(output.slot, output.value)?;
            let duration_ms = stage_start.elapsed().as_secs_f64() * 1000.0;

            debug!(
                stage = stage.name(),
                slot = %slot,
                failures,
                duration_ms,
                "Stage completed"
            );
            sink.emit(
                events::STAGE_COMPLETED,
                Some(events::session_payload(
                    &identity,
                    json!({
                        "stage": stage.name(),
                        "slot": slot.as_str(),
                        "duration_ms": duration_ms,
                        "failures": failures,
                    }),
                )),
            )
            .await;
        }

        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        let slots: Vec<&str> = context.written_slots().iter().map(|s| s.as_str()).collect();
        info!(
            pipeline = %self.name,
            session_id = %identity.session_id,
            duration_ms,
            "Pipeline completed"
        );
        sink.emit(
            events::PIPELINE_COMPLETED,
            Some(events::session_payload(
                &identity,
                json!({"pipeline": self.name, "duration_ms": duration_ms, "slots": slots}),
            )),
        )
        .await;

        Ok(context)
    }
}

//! Recognize stage: pattern detection over fetched data.

use super::{SlotInput, Stage, StageOutput};
use crate::config::PipelineConfig;
use crate::context::StageInputs;
use crate::core::{RequestItem, SlotKey, StageKind};
use crate::dispatch::{DispatchMode, Dispatcher};
use crate::errors::IntraflowError;
use crate::handlers::pattern_capabilities;
use crate::market::MarketData;
use crate::registry::CapabilityRegistry;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Dispatches one item per requested pattern against the detector registry.
///
/// The fetch slot is optional: without it every detector sees empty data
/// and reports insufficient data on its own.
#[derive(Debug, Clone)]
pub struct RecognizeStage {
    dispatcher: Dispatcher,
}

impl RecognizeStage {
    /// Stage name.
    pub const NAME: &'static str = "recognize";

    /// Creates the stage over a custom registry.
    #[must_use]
    pub fn new(registry: CapabilityRegistry) -> Self {
        Self {
            dispatcher: Dispatcher::new(Self::NAME, registry),
        }
    }

    /// Creates the stage with the built-in detectors.
    ///
    /// # Errors
    ///
    /// Fails only if the built-in registry cannot be assembled.
    pub fn standard(config: &PipelineConfig) -> Result<Self, IntraflowError> {
        Ok(Self::new(pattern_capabilities(&config.detectors)?).with_mode(config.dispatch_mode))
    }

    /// Sets the dispatch mode.
    #[must_use]
    pub fn with_mode(mut self, mode: DispatchMode) -> Self {
        self.dispatcher = self.dispatcher.with_mode(mode);
        self
    }

    /// Returns the dispatcher.
    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

#[async_trait]
impl Stage for RecognizeStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn kind(&self) -> StageKind {
        StageKind::Dispatch
    }

    fn output_slot(&self) -> SlotKey {
        SlotKey::PatternRecognition
    }

    fn input_slots(&self) -> Vec<SlotInput> {
        vec![SlotInput::optional(SlotKey::RealTimeData)]
    }

    async fn execute(&self, inputs: &StageInputs<'_>) -> Result<StageOutput, IntraflowError> {
        let data = match inputs.record(SlotKey::RealTimeData)? {
            Some(record) => MarketData::from_record(record, inputs.ticker()),
            None => {
                debug!(stage = Self::NAME, "No fetch output; detectors get empty data");
                MarketData::new()
            }
        };

        let items: Vec<RequestItem> = inputs
            .request()
            .patterns_to_detect
            .iter()
            .map(RequestItem::new)
            .collect();
        let record = self.dispatcher.dispatch(&items, &Arc::new(data)).await;

        info!(
            stage = Self::NAME,
            slot = %SlotKey::PatternRecognition,
            items = record.len(),
            failures = record.failure_count(),
            "Pattern recognition complete"
        );
        Ok(StageOutput::new(SlotKey::PatternRecognition, record))
    }
}

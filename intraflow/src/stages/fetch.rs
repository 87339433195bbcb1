//! Fetch stage: raw data acquisition.

use super::{SlotInput, Stage, StageOutput};
use crate::config::PipelineConfig;
use crate::context::StageInputs;
use crate::core::{SlotKey, StageKind};
use crate::dispatch::{DispatchMode, Dispatcher};
use crate::errors::IntraflowError;
use crate::handlers::data_capabilities;
use crate::market::MarketData;
use crate::registry::CapabilityRegistry;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Dispatches the request's data requests against the data registry.
#[derive(Debug, Clone)]
pub struct FetchStage {
    dispatcher: Dispatcher,
}

impl FetchStage {
    /// Stage name.
    pub const NAME: &'static str = "fetch";

    /// Creates the stage over a custom registry.
    #[must_use]
    pub fn new(registry: CapabilityRegistry) -> Self {
        Self {
            dispatcher: Dispatcher::new(Self::NAME, registry),
        }
    }

    /// Creates the stage with the built-in data sources.
    ///
    /// # Errors
    ///
    /// Fails only if the built-in registry cannot be assembled.
    pub fn standard(config: &PipelineConfig) -> Result<Self, IntraflowError> {
        Ok(Self::new(data_capabilities()?).with_mode(config.dispatch_mode))
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
impl Stage for FetchStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn kind(&self) -> StageKind {
        StageKind::Dispatch
    }

    fn output_slot(&self) -> SlotKey {
        SlotKey::RealTimeData
    }

    fn input_slots(&self) -> Vec<SlotInput> {
        Vec::new()
    }

    async fn execute(&self, inputs: &StageInputs<'_>) -> Result<StageOutput, IntraflowError> {
        let items = &inputs.request().data_requests;
        let record = self
            .dispatcher
            .dispatch(items, &Arc::new(MarketData::new()))
            .await;

        info!(
            stage = Self::NAME,
            slot = %SlotKey::RealTimeData,
            items = record.len(),
            failures = record.failure_count(),
            "Fetch complete"
        );
        Ok(StageOutput::new(SlotKey::RealTimeData, record))
    }
}

//! # Intraflow
//!
//! A four-stage intraday analysis pipeline for one ticker per session.
//!
//! - **Fetch** dispatches data requests through a capability registry
//! - **Recognize** runs pattern detectors over the fetched data
//! - **Summarize** folds both records into an analysis summary
//! - **Strategize** proposes strategies, or explicitly declines
//!
//! Each stage writes exactly one slot of an append-only context. Per-item
//! failures are data and flow forward; a run only fails on a wiring fault.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use intraflow::prelude::*;
//!
//! let pipeline = IntradayPipeline::standard(&PipelineConfig::default())?;
//! let request = PipelineRequest::new("AAPL")
//!     .with_data_request(
//!         RequestItem::new("intraday_prices")
//!             .param("ticker", "AAPL")
//!             .param("interval", "5min")
//!             .param("count", 12),
//!     )
//!     .with_pattern("price_volume_surge")
//!     .with_risk_tolerance("high");
//!
//! let ctx = pipeline.run(request).await?;
//! println!("{}", ctx.to_json());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod core;
pub mod dispatch;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod market;
pub mod observability;
pub mod pipeline;
pub mod registry;
pub mod stages;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{DetectorConfig, PipelineConfig, StrategyConfig};
    pub use crate::context::{PipelineContext, SessionIdentity, SlotValue, StageInputs};
    pub use crate::core::{ItemResult, Params, RecordEntry, RequestItem, SlotKey, StageOutputRecord};
    pub use crate::dispatch::{DispatchMode, Dispatcher};
    pub use crate::errors::{ContractErrorInfo, ErrorKind, IntraflowError, PipelineValidationError};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::market::MarketData;
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::pipeline::{IntradayPipeline, PipelineBuilder, PipelineRequest};
    pub use crate::registry::{CapabilityEntry, CapabilityHandler, CapabilityRegistry, HandlerFailure};
    pub use crate::stages::{IntradaySummary, Stage, StrategyOutcome};
    pub use crate::utils::{iso_timestamp, Timestamp};
}

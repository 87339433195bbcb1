//! Pipeline building and execution.
//!
//! This module provides:
//! - The top-level request
//! - Pipeline builder with wiring validation
//! - The sequential intraday composer

mod builder;
mod intraday;
#[cfg(test)]
mod integration_tests;
mod request;

pub use builder::PipelineBuilder;
pub use intraday::{IntradayPipeline, STANDARD_PIPELINE};
pub use request::PipelineRequest;

//! Context management for pipeline execution.
//!
//! This module provides:
//! - Write-once slot storage
//! - The append-only per-session pipeline context
//! - Strict per-stage views of that context
//! - Session identity

mod bags;
mod execution;
mod identity;
mod inputs;

pub use bags::{SlotBag, SlotValue};
pub use execution::PipelineContext;
pub use identity::SessionIdentity;
pub use inputs::StageInputs;

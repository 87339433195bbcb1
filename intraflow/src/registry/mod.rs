//! Capability registries: per-stage tables from kind tag to handler.
//!
//! This module provides:
//! - The handler trait and a closure adapter
//! - Capability entries with their parameter and data requirements
//! - The registry itself, frozen before any dispatch
//! - Deterministic record-key derivation

mod capability;
mod key;
#[allow(clippy::module_inception)]
mod registry;

#[cfg(test)]
pub use capability::MockCapabilityHandler;
pub use capability::{CapabilityEntry, CapabilityHandler, DataRequirement, FnHandler, HandlerFailure};
pub use key::{derive_key, sanitize_key_part};
pub use registry::CapabilityRegistry;

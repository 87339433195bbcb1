//! Per-item dispatch against a capability registry.
//!
//! This module provides:
//! - The dispatcher shared by the fetch and recognize stages
//! - Sequential and concurrent dispatch modes

mod dispatcher;

pub use dispatcher::{DispatchMode, Dispatcher};

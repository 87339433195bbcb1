//! Core domain model types for intraflow.
//!
//! This module contains the data contract shared by every stage:
//! - Request items (the unit of dispatch)
//! - Per-item results and the keyed stage output record
//! - Slot keys and stage kinds

mod outcome;
mod record;
mod request;
mod slot;

pub use outcome::ItemResult;
pub use record::{RecordEntry, StageOutputRecord};
pub use request::{Params, RequestItem};
pub use slot::{SlotKey, SlotRequirement, StageKind};

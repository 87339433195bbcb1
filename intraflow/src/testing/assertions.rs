//! Assertions over stage output records and pipeline contexts.

use crate::context::PipelineContext;
use crate::core::{SlotKey, StageOutputRecord};
use crate::errors::ErrorKind;

/// Asserts that the entry under `key` succeeded and returns its payload.
#[allow(clippy::panic)]
pub fn assert_entry_success<'a>(record: &'a StageOutputRecord, key: &str) -> &'a serde_json::Value {
    let Some(result) = record.get(key) else {
        panic!("Expected an entry for '{key}'. Keys: {:?}", record.keys());
    };
    match result.payload() {
        Some(payload) => payload,
        None => panic!("Expected '{key}' to succeed, got {result:?}"),
    }
}

/// Asserts that the entry under `key` failed with `reason`.
#[allow(clippy::panic)]
pub fn assert_entry_failure(record: &StageOutputRecord, key: &str, reason: ErrorKind) {
    let Some(result) = record.get(key) else {
        panic!("Expected an entry for '{key}'. Keys: {:?}", record.keys());
    };
    assert_eq!(
        result.reason(),
        Some(reason),
        "Expected '{key}' to fail with {reason:?}, got {result:?}"
    );
}

/// Asserts the record's keys, in order.
pub fn assert_record_keys(record: &StageOutputRecord, expected: &[&str]) {
    assert_eq!(record.keys(), expected, "Record keys differ");
}

/// Asserts that exactly `expected` slots were written, in slot order.
pub fn assert_slots_written(context: &PipelineContext, expected: &[SlotKey]) {
    assert_eq!(context.written_slots(), expected, "Written slots differ");
}

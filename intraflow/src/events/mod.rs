//! Pipeline lifecycle events.
//!
//! The composer emits one event when a session starts, two per stage and
//! one when the session completes. Every payload carries the session id
//! and ticker.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, RecordedEvent};

use crate::context::SessionIdentity;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Emitted before the first stage runs.
pub const PIPELINE_STARTED: &str = "pipeline.started";
/// Emitted before each stage runs.
pub const STAGE_STARTED: &str = "stage.started";
/// Emitted after a stage's output slot is written.
pub const STAGE_COMPLETED: &str = "stage.completed";
/// Emitted after the last stage completes.
pub const PIPELINE_COMPLETED: &str = "pipeline.completed";

static GLOBAL_EVENT_SINK: RwLock<Option<Arc<dyn EventSink>>> = RwLock::new(None);

/// Sets the process-wide event sink.
pub fn set_event_sink(sink: Arc<dyn EventSink>) {
    *GLOBAL_EVENT_SINK.write() = Some(sink);
}

/// Clears the process-wide event sink.
pub fn clear_event_sink() {
    *GLOBAL_EVENT_SINK.write() = None;
}

/// Gets the process-wide event sink.
///
/// Returns a `NoOpEventSink` if no sink is set.
#[must_use]
pub fn get_event_sink() -> Arc<dyn EventSink> {
    GLOBAL_EVENT_SINK
        .read()
        .clone()
        .unwrap_or_else(|| Arc::new(NoOpEventSink))
}

/// Builds an event payload tagged with the session.
#[must_use]
pub fn session_payload(identity: &SessionIdentity, fields: Value) -> Value {
    let mut data = match fields {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    };
    data.insert("session_id".to_string(), Value::String(identity.session_id.to_string()));
    data.insert("ticker".to_string(), Value::String(identity.ticker.clone()));
    Value::Object(data)
}

//! The dispatcher: routes each request item to its handler.

use crate::core::{ItemResult, RecordEntry, RequestItem, StageOutputRecord};
use crate::market::MarketData;
use crate::registry::{derive_key, CapabilityEntry, CapabilityRegistry};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// How a dispatcher runs the items of one stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// One item after another on the calling task.
    #[default]
    Sequential,
    /// Every item on the blocking pool, results restored to input order.
    Concurrent,
}

/// Routes request items to handlers and collects a keyed record.
///
/// One item's failure never affects another. Whatever happens, the record
/// holds exactly one entry per item, in input order.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    /// Stage name, used in logs.
    name: String,
    /// The frozen registry.
    registry: Arc<CapabilityRegistry>,
    /// Execution mode.
    mode: DispatchMode,
}

impl Dispatcher {
    /// Creates a sequential dispatcher, taking ownership of the registry.
    #[must_use]
    pub fn new(name: impl Into<String>, registry: CapabilityRegistry) -> Self {
        Self {
            name: name.into(),
            registry: Arc::new(registry),
            mode: DispatchMode::Sequential,
        }
    }

    /// Sets the execution mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Returns the execution mode.
    #[must_use]
    pub const fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Dispatches every item and collects the record.
    pub async fn dispatch(&self, items: &[RequestItem], data: &Arc<MarketData>) -> StageOutputRecord {
        let record = match self.mode {
            DispatchMode::Sequential => items
                .iter()
                .map(|item| dispatch_item(&self.name, &self.registry, item, data))
                .collect(),
            DispatchMode::Concurrent => self.dispatch_concurrent(items, data).await,
        };

        debug!(
            stage = %self.name,
            items = items.len(),
            failures = record.failure_count(),
            "Dispatch finished"
        );
        record
    }

    /// Dispatches a single item on the calling thread.
    #[must_use]
    pub fn dispatch_one(&self, item: &RequestItem, data: &MarketData) -> RecordEntry {
        dispatch_item(&self.name, &self.registry, item, data)
    }

    async fn dispatch_concurrent(&self, items: &[RequestItem], data: &Arc<MarketData>) -> StageOutputRecord {
        let handles: Vec<_> = items
            .iter()
            .map(|item| {
                let name = self.name.clone();
                let registry = Arc::clone(&self.registry);
                let item = item.clone();
                let data = Arc::clone(data);
                tokio::task::spawn_blocking(move || dispatch_item(&name, &registry, &item, &data))
            })
            .collect();

        let joined = futures::future::join_all(handles).await;

        items
            .iter()
            .zip(joined)
            .map(|(item, outcome)| match outcome {
                Ok(entry) => entry,
                Err(err) => {
                    let key = derive_key(item, self.registry.lookup(item.kind()));
                    let result = ItemResult::handler_error(format!("dispatch task failed: {err}"));
                    log_failure(&self.name, &key, item.kind(), &result);
                    RecordEntry::new(key, item.kind(), result)
                }
            })
            .collect()
    }
}

fn dispatch_item(
    stage: &str,
    registry: &CapabilityRegistry,
    item: &RequestItem,
    data: &MarketData,
) -> RecordEntry {
    let entry = registry.lookup(item.kind());
    let key = derive_key(item, entry);
    debug!(stage = %stage, key = %key, kind = %item.kind(), "Dispatching item");

    let result = match entry {
        None => ItemResult::unknown_kind(item.kind()),
        Some(entry) => run_entry(entry, item, data),
    };

    if result.is_failure() {
        log_failure(stage, &key, item.kind(), &result);
    }
    RecordEntry::new(key, item.kind(), result)
}

fn run_entry(entry: &CapabilityEntry, item: &RequestItem, data: &MarketData) -> ItemResult {
    if let Some(message) = entry.unmet_requirement(item, data) {
        return ItemResult::insufficient_data(message);
    }

    let outcome = catch_unwind(AssertUnwindSafe(|| entry.handler.invoke(item.params(), data)));
    match outcome {
        Ok(Ok(payload)) => match error_shape(&payload) {
            Some(message) => ItemResult::handler_error(message),
            None => ItemResult::success(payload),
        },
        Ok(Err(failure)) => ItemResult::handler_error(failure.message),
        Err(panic) => ItemResult::handler_error(format!(
            "handler panicked: {}",
            panic_message(panic.as_ref())
        )),
    }
}

/// Detects payloads that report an error instead of data.
///
/// An object with a string `error` field counts, with an optional string
/// `details` appended to the message.
fn error_shape(payload: &serde_json::Value) -> Option<String> {
    let object = payload.as_object()?;
    let error = object.get("error")?.as_str()?;
    match object.get("details").and_then(serde_json::Value::as_str) {
        Some(details) => Some(format!("{error}: {details}")),
        None => Some(error.to_string()),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn log_failure(stage: &str, key: &str, kind: &str, result: &ItemResult) {
    warn!(
        stage = %stage,
        key = %key,
        kind = %kind,
        reason = ?result.reason(),
        message = result.message().unwrap_or_default(),
        "Item failed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_shape() {
        assert_eq!(
            error_shape(&json!({"error": "rate limited", "details": "retry later"})),
            Some("rate limited: retry later".to_string())
        );
        assert_eq!(error_shape(&json!({"error": "boom"})), Some("boom".to_string()));
        assert_eq!(error_shape(&json!({"error": 42})), None);
        assert_eq!(error_shape(&json!({"detected": false})), None);
        assert_eq!(error_shape(&json!(["error"])), None);
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(boxed.as_ref()), "static message");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(boxed.as_ref()), "owned message");
        let boxed: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic payload");
    }

    #[test]
    fn test_dispatch_mode_serde() {
        assert_eq!(serde_json::to_value(DispatchMode::Concurrent).unwrap(), json!("concurrent"));
        let mode: DispatchMode = serde_json::from_value(json!("sequential")).unwrap();
        assert_eq!(mode, DispatchMode::Sequential);
    }
}

//! Hand-written capability handlers for tests.

use crate::core::Params;
use crate::market::MarketData;
use crate::registry::{CapabilityHandler, HandlerFailure};
use parking_lot::Mutex;
use serde_json::{json, Value};

/// Returns a fixed payload and records every call's params.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    payload: Value,
    calls: Mutex<Vec<Params>>,
    bars_seen: Mutex<Vec<usize>>,
}

impl RecordingHandler {
    /// Creates a handler returning `payload`.
    #[must_use]
    pub fn returning(payload: Value) -> Self {
        Self {
            payload,
            ..Self::default()
        }
    }

    /// Returns the number of calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns the params of each call, in call order.
    #[must_use]
    pub fn recorded_params(&self) -> Vec<Params> {
        self.calls.lock().clone()
    }

    /// Returns the number of price bars visible on each call.
    #[must_use]
    pub fn bars_seen(&self) -> Vec<usize> {
        self.bars_seen.lock().clone()
    }

    /// Resets call tracking.
    pub fn reset(&self) {
        self.calls.lock().clear();
        self.bars_seen.lock().clear();
    }
}

impl CapabilityHandler for RecordingHandler {
    fn invoke(&self, params: &Params, data: &MarketData) -> Result<Value, HandlerFailure> {
        self.calls.lock().push(params.clone());
        self.bars_seen.lock().push(data.intraday_prices.len());
        Ok(self.payload.clone())
    }
}

/// Always returns a handler failure.
#[derive(Debug, Clone)]
pub struct FailingHandler {
    message: String,
}

impl FailingHandler {
    /// Creates a handler failing with `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl CapabilityHandler for FailingHandler {
    fn invoke(&self, _params: &Params, _data: &MarketData) -> Result<Value, HandlerFailure> {
        Err(HandlerFailure::new(&self.message))
    }
}

/// Panics on every call.
#[derive(Debug, Clone)]
pub struct PanickingHandler {
    message: String,
}

impl PanickingHandler {
    /// Creates a handler panicking with `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl CapabilityHandler for PanickingHandler {
    #[allow(clippy::panic)]
    fn invoke(&self, _params: &Params, _data: &MarketData) -> Result<Value, HandlerFailure> {
        panic!("{}", self.message)
    }
}

/// Reports failure in-band with an `{"error": ..., "details": ...}` payload.
#[derive(Debug, Clone)]
pub struct ErrorShapedHandler {
    error: String,
    details: String,
}

impl ErrorShapedHandler {
    /// Creates a handler returning the given error shape.
    #[must_use]
    pub fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

impl CapabilityHandler for ErrorShapedHandler {
    fn invoke(&self, _params: &Params, _data: &MarketData) -> Result<Value, HandlerFailure> {
        Ok(json!({"error": self.error, "details": self.details}))
    }
}

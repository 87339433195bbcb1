//! Per-item result union.

use crate::errors::ErrorKind;
use serde::{Deserialize, Serialize};

/// The outcome of one request item.
///
/// Failures are data: they never escape a dispatcher as Rust errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemResult {
    /// The handler produced a payload.
    Success {
        /// The handler payload.
        payload: serde_json::Value,
    },
    /// The item could not be processed.
    Failure {
        /// Why the item failed.
        reason: ErrorKind,
        /// A message naming the affected request and the cause.
        message: String,
    },
}

impl ItemResult {
    /// Creates a success result.
    #[must_use]
    pub const fn success(payload: serde_json::Value) -> Self {
        Self::Success { payload }
    }

    /// Creates a failure result.
    #[must_use]
    pub fn failure(reason: ErrorKind, message: impl Into<String>) -> Self {
        Self::Failure {
            reason,
            message: message.into(),
        }
    }

    /// Creates an `UnknownKind` failure for the given kind.
    #[must_use]
    pub fn unknown_kind(kind: &str) -> Self {
        Self::failure(ErrorKind::UnknownKind, format!("no handler for kind={kind}"))
    }

    /// Creates an `InsufficientData` failure.
    #[must_use]
    pub fn insufficient_data(message: impl Into<String>) -> Self {
        Self::failure(ErrorKind::InsufficientData, message)
    }

    /// Creates a `HandlerError` failure.
    #[must_use]
    pub fn handler_error(message: impl Into<String>) -> Self {
        Self::failure(ErrorKind::HandlerError, message)
    }

    /// Returns true for a success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns true for a failure.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    /// Returns the payload of a success.
    #[must_use]
    pub const fn payload(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Success { payload } => Some(payload),
            Self::Failure { .. } => None,
        }
    }

    /// Returns the failure reason.
    #[must_use]
    pub const fn reason(&self) -> Option<ErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { reason, .. } => Some(*reason),
        }
    }

    /// Returns the failure message.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { message, .. } => Some(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_accessors() {
        let result = ItemResult::success(json!({"detected": true}));
        assert!(result.is_success());
        assert_eq!(result.payload(), Some(&json!({"detected": true})));
        assert!(result.reason().is_none());
    }

    #[test]
    fn test_unknown_kind_message() {
        let result = ItemResult::unknown_kind("unsupported_pattern");
        assert_eq!(result.reason(), Some(ErrorKind::UnknownKind));
        assert_eq!(result.message(), Some("no handler for kind=unsupported_pattern"));
    }

    #[test]
    fn test_wire_shape() {
        let failure = ItemResult::insufficient_data("intraday_prices is empty");
        assert_eq!(
            serde_json::to_value(&failure).unwrap(),
            json!({
                "status": "failure",
                "reason": "InsufficientData",
                "message": "intraday_prices is empty"
            })
        );

        let success = ItemResult::success(json!([1, 2]));
        assert_eq!(
            serde_json::to_value(&success).unwrap(),
            json!({"status": "success", "payload": [1, 2]})
        );
    }
}

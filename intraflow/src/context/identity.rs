//! Session identity for one analysis run.

use crate::pipeline::PipelineRequest;
use crate::utils::{now_utc, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one session of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    /// Unique ID of this session.
    pub session_id: Uuid,
    /// Instrument under analysis.
    pub ticker: String,
    /// When the session started.
    pub started_at: Timestamp,
    /// Fingerprint of the request; equal requests share it.
    pub request_fingerprint: String,
}

impl SessionIdentity {
    /// Creates an identity with a fresh session ID.
    #[must_use]
    pub fn new(ticker: impl Into<String>, request_fingerprint: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            ticker: ticker.into(),
            started_at: now_utc(),
            request_fingerprint: request_fingerprint.into(),
        }
    }

    /// Creates an identity for a request.
    #[must_use]
    pub fn for_request(request: &PipelineRequest) -> Self {
        Self::new(&request.ticker, request.fingerprint())
    }

    /// Sets the session ID.
    #[must_use]
    pub const fn with_session_id(mut self, session_id: Uuid) -> Self {
        self.session_id = session_id;
        self
    }

    /// Returns true if both sessions ran the same request.
    #[must_use]
    pub fn same_request(&self, other: &Self) -> bool {
        self.request_fingerprint == other.request_fingerprint
    }

    /// Renders the identity as JSON.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "session_id": self.session_id.to_string(),
            "ticker": self.ticker,
            "started_at": self.started_at.to_rfc3339(),
            "request_fingerprint": self.request_fingerprint,
        })
    }
}

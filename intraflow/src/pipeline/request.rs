//! The top-level pipeline request.

use crate::core::RequestItem;
use crate::errors::IntraflowError;
use crate::utils::fingerprint;
use serde::{Deserialize, Serialize};

/// Everything one session needs from the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineRequest {
    /// Instrument under analysis.
    #[serde(default)]
    pub ticker: String,
    /// Data items for the fetch stage.
    #[serde(default)]
    pub data_requests: Vec<RequestItem>,
    /// Pattern kinds for the recognize stage.
    #[serde(default)]
    pub patterns_to_detect: Vec<String>,
    /// Free-form risk tolerance, e.g. `"high"`.
    #[serde(default)]
    pub user_intraday_risk_tolerance: String,
    /// Free-form trading goals.
    #[serde(default)]
    pub user_intraday_goals: String,
}

impl PipelineRequest {
    /// Creates an empty request for a ticker.
    #[must_use]
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            ..Self::default()
        }
    }

    /// Adds a data request.
    #[must_use]
    pub fn with_data_request(mut self, item: RequestItem) -> Self {
        self.data_requests.push(item);
        self
    }

    /// Adds a pattern to detect.
    #[must_use]
    pub fn with_pattern(mut self, kind: impl Into<String>) -> Self {
        self.patterns_to_detect.push(kind.into());
        self
    }

    /// Sets the risk tolerance.
    #[must_use]
    pub fn with_risk_tolerance(mut self, tolerance: impl Into<String>) -> Self {
        self.user_intraday_risk_tolerance = tolerance.into();
        self
    }

    /// Sets the trading goals.
    #[must_use]
    pub fn with_goals(mut self, goals: impl Into<String>) -> Self {
        self.user_intraday_goals = goals.into();
        self
    }

    /// Parses a request from JSON.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the JSON does not match the request shape.
    pub fn from_json_str(json: &str) -> Result<Self, IntraflowError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Returns a stable fingerprint of the request contents.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        serde_json::to_value(self)
            .map(|value| fingerprint(&value))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_from_json_str() {
        let request = PipelineRequest::from_json_str(
            r#"{
                "ticker": "AAPL",
                "data_requests": [
                    {"type": "intraday_prices", "ticker": "AAPL", "interval": "5min", "count": 12}
                ],
                "patterns_to_detect": ["price_volume_surge"],
                "user_intraday_risk_tolerance": "high",
                "user_intraday_goals": "scalp profits"
            }"#,
        )
        .unwrap();

        assert_eq!(request.ticker, "AAPL");
        assert_eq!(request.data_requests[0].kind(), "intraday_prices");
        assert_eq!(request.data_requests[0].get("count"), Some(&json!(12)));
        assert_eq!(request.patterns_to_detect, vec!["price_volume_surge"]);
        assert_eq!(request.user_intraday_goals, "scalp profits");
    }

    #[test]
    fn test_missing_fields_default() {
        let request = PipelineRequest::from_json_str(r#"{"ticker": "MSFT"}"#).unwrap();
        assert_eq!(request, PipelineRequest::new("MSFT"));
    }

    #[test]
    fn test_malformed_json_is_serialization_error() {
        let err = PipelineRequest::from_json_str(r#"{"patterns_to_detect": 5}"#).unwrap_err();
        assert!(matches!(err, IntraflowError::Serialization(_)));
    }

    #[test]
    fn test_fingerprint_tracks_contents() {
        let a = PipelineRequest::new("AAPL").with_pattern("price_volume_surge");
        let b = PipelineRequest::new("AAPL").with_pattern("price_volume_surge");
        let c = PipelineRequest::new("AAPL").with_risk_tolerance("low");

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 32);
    }
}

//! Request items: the unit of work routed by a dispatcher.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Handler parameters, sorted by name so derived keys are deterministic.
pub type Params = BTreeMap<String, serde_json::Value>;

/// A tagged request: `kind` selects the handler, `params` feed it.
///
/// Serialized flat, e.g. `{"kind": "intraday_prices", "ticker": "AAPL"}`.
/// Deserialization also accepts `type` in place of `kind`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestItem {
    kind: String,
    #[serde(flatten)]
    params: Params,
}

impl RequestItem {
    /// Creates a request with no parameters.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: Params::new(),
        }
    }

    /// Creates a request from a kind and a full parameter map.
    #[must_use]
    pub fn with_params(kind: impl Into<String>, params: Params) -> Self {
        Self {
            kind: kind.into(),
            params,
        }
    }

    /// Adds a parameter.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Returns the kind tag.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns all parameters.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Gets a parameter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.params.get(name)
    }
}

impl<'de> Deserialize<'de> for RequestItem {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut params = Params::deserialize(deserializer)?;
        let kind = match params.remove("kind").or_else(|| params.remove("type")) {
            Some(serde_json::Value::String(kind)) => kind,
            Some(other) => {
                return Err(de::Error::custom(format!(
                    "request kind must be a string, got {other}"
                )))
            }
            None => return Err(de::Error::missing_field("kind")),
        };
        Ok(Self { kind, params })
    }
}

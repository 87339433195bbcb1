//! Handler trait and capability entries.

use crate::core::{Params, RequestItem};
use crate::market::MarketData;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A handler-side failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerFailure {
    /// What went wrong.
    pub message: String,
}

impl HandlerFailure {
    /// Creates a new handler failure.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Creates a failure for a parameter that is present but unusable.
    #[must_use]
    pub fn invalid_param(name: &str, reason: impl fmt::Display) -> Self {
        Self::new(format!("invalid param '{name}': {reason}"))
    }
}

/// The logic behind one capability kind.
///
/// Handlers are pure: given params and the stage's read-only data they
/// return a payload or fail. They keep no state between calls.
#[cfg_attr(test, mockall::automock)]
pub trait CapabilityHandler: Send + Sync {
    /// Runs the handler.
    fn invoke(&self, params: &Params, data: &MarketData) -> Result<serde_json::Value, HandlerFailure>;
}

/// A closure-backed handler.
pub struct FnHandler<F>
where
    F: Fn(&Params, &MarketData) -> Result<serde_json::Value, HandlerFailure> + Send + Sync,
{
    func: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&Params, &MarketData) -> Result<serde_json::Value, HandlerFailure> + Send + Sync,
{
    /// Wraps a closure.
    pub const fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> CapabilityHandler for FnHandler<F>
where
    F: Fn(&Params, &MarketData) -> Result<serde_json::Value, HandlerFailure> + Send + Sync,
{
    fn invoke(&self, params: &Params, data: &MarketData) -> Result<serde_json::Value, HandlerFailure> {
        (self.func)(params, data)
    }
}

/// Upstream data a capability cannot run without.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataRequirement {
    /// A non-empty intraday price series.
    IntradayPrices,
    /// At least one news article.
    NewsArticles,
    /// At least one economic data point.
    EconomicData,
}

impl DataRequirement {
    /// Returns the data-payload field name this requirement refers to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::IntradayPrices => "intraday_prices",
            Self::NewsArticles => "news_articles",
            Self::EconomicData => "economic_data_points",
        }
    }

    /// Checks the requirement against the available data.
    #[must_use]
    pub fn is_satisfied_by(&self, data: &MarketData) -> bool {
        match self {
            Self::IntradayPrices => data.has_prices(),
            Self::NewsArticles => data.has_news(),
            Self::EconomicData => !data.economic_data_points.is_empty(),
        }
    }
}

impl fmt::Display for DataRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field())
    }
}

/// One row of a capability registry.
#[derive(Clone)]
pub struct CapabilityEntry {
    /// The kind tag this entry handles.
    pub kind: String,
    /// What the capability does.
    pub description: String,
    /// The handler.
    pub handler: Arc<dyn CapabilityHandler>,
    /// Params that must be present, non-null and non-empty.
    pub required_params: Vec<String>,
    /// Upstream data that must be available.
    pub required_data: Vec<DataRequirement>,
    /// Params that identify a request, in key order.
    pub key_params: Vec<String>,
}

impl CapabilityEntry {
    /// Creates a new entry with no requirements.
    #[must_use]
    pub fn new(kind: impl Into<String>, handler: Arc<dyn CapabilityHandler>) -> Self {
        Self {
            kind: kind.into(),
            description: String::new(),
            handler,
            required_params: Vec::new(),
            required_data: Vec::new(),
            key_params: Vec::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Sets the required params.
    #[must_use]
    pub fn requires_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_params = params.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the required upstream data.
    #[must_use]
    pub fn requires_data(mut self, data: impl IntoIterator<Item = DataRequirement>) -> Self {
        self.required_data = data.into_iter().collect();
        self
    }

    /// Sets the params used for key derivation.
    #[must_use]
    pub fn keyed_by<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_params = params.into_iter().map(Into::into).collect();
        self
    }

    /// Describes the first unmet requirement for an item, if any.
    #[must_use]
    pub fn unmet_requirement(&self, item: &RequestItem, data: &MarketData) -> Option<String> {
        for name in &self.required_params {
            if !is_present(item.get(name)) {
                return Some(format!(
                    "kind={} is missing required param '{name}'",
                    item.kind()
                ));
            }
        }
        for requirement in &self.required_data {
            if !requirement.is_satisfied_by(data) {
                return Some(format!(
                    "kind={} requires non-empty {requirement} but none is available",
                    item.kind()
                ));
            }
        }
        None
    }
}

impl fmt::Debug for CapabilityEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityEntry")
            .field("kind", &self.kind)
            .field("required_params", &self.required_params)
            .field("required_data", &self.required_data)
            .field("key_params", &self.key_params)
            .finish_non_exhaustive()
    }
}

fn is_present(value: Option<&serde_json::Value>) -> bool {
    match value {
        None | Some(serde_json::Value::Null) => false,
        Some(serde_json::Value::String(s)) => !s.trim().is_empty(),
        Some(serde_json::Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::flat_bars;
    use serde_json::json;

    fn echo() -> Arc<dyn CapabilityHandler> {
        Arc::new(FnHandler::new(|params: &Params, _data: &MarketData| {
            Ok(json!(params))
        }))
    }

    #[test]
    fn test_fn_handler_invokes_closure() {
        let handler = echo();
        let mut params = Params::new();
        params.insert("ticker".to_string(), json!("AAPL"));

        let out = handler.invoke(&params, &MarketData::new()).unwrap();
        assert_eq!(out, json!({"ticker": "AAPL"}));
    }

    #[test]
    fn test_unmet_param() {
        let entry = CapabilityEntry::new("intraday_prices", echo())
            .requires_params(["ticker", "interval", "count"]);

        let item = RequestItem::new("intraday_prices")
            .param("ticker", "AAPL")
            .param("interval", "");
        let message = entry.unmet_requirement(&item, &MarketData::new()).unwrap();
        assert!(message.contains("'interval'"));
    }

    #[test]
    fn test_unmet_data() {
        let entry = CapabilityEntry::new("price_volume_surge", echo())
            .requires_data([DataRequirement::IntradayPrices]);
        let item = RequestItem::new("price_volume_surge");

        let message = entry.unmet_requirement(&item, &MarketData::new()).unwrap();
        assert!(message.contains("intraday_prices"));

        let data = MarketData::new().with_prices(flat_bars(3, 10.0, 100));
        assert!(entry.unmet_requirement(&item, &data).is_none());
    }

    #[test]
    fn test_null_and_empty_array_are_missing() {
        let entry = CapabilityEntry::new("news_feed", echo()).requires_params(["keywords"]);
        let null_item = RequestItem::new("news_feed").param("keywords", serde_json::Value::Null);
        let empty_item = RequestItem::new("news_feed").param("keywords", json!([]));
        let ok_item = RequestItem::new("news_feed").param("keywords", json!(["AAPL"]));

        assert!(entry.unmet_requirement(&null_item, &MarketData::new()).is_some());
        assert!(entry.unmet_requirement(&empty_item, &MarketData::new()).is_some());
        assert!(entry.unmet_requirement(&ok_item, &MarketData::new()).is_none());
    }

    #[test]
    fn test_handler_failure_invalid_param() {
        let err = HandlerFailure::invalid_param("count", "must be at least 1");
        assert_eq!(err.to_string(), "invalid param 'count': must be at least 1");
    }
}

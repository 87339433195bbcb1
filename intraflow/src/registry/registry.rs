//! Capability registry for one stage.

use super::{CapabilityEntry, CapabilityHandler, FnHandler, HandlerFailure};
use crate::core::Params;
use crate::errors::{DuplicateKindError, IntraflowError, InvalidKindError};
use crate::market::MarketData;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

fn kind_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    PATTERN.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("static kind pattern compiles"))
}

/// Maps kind tags to capability entries.
///
/// Built eagerly at stage construction. Once moved into a dispatcher it is
/// only ever read.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    /// Registry name, used in diagnostics.
    name: String,
    /// Registered entries.
    entries: HashMap<String, CapabilityEntry>,
    /// Registration order.
    order: Vec<String>,
}

impl CapabilityRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Registers an entry.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateKind` if the kind is already registered, or
    /// `InvalidKind` if the tag is not lowercase snake_case.
    pub fn register(&mut self, entry: CapabilityEntry) -> Result<(), IntraflowError> {
        if !kind_pattern().is_match(&entry.kind) {
            return Err(InvalidKindError::new(&entry.kind).into());
        }
        if self.entries.contains_key(&entry.kind) {
            return Err(DuplicateKindError::new(&self.name, &entry.kind).into());
        }

        self.order.push(entry.kind.clone());
        self.entries.insert(entry.kind.clone(), entry);
        Ok(())
    }

    /// Registers a closure as the handler for `kind`, with no requirements.
    ///
    /// # Errors
    ///
    /// Same as [`register`](Self::register).
    pub fn register_fn<F>(&mut self, kind: impl Into<String>, func: F) -> Result<(), IntraflowError>
    where
        F: Fn(&Params, &MarketData) -> Result<serde_json::Value, HandlerFailure> + Send + Sync + 'static,
    {
        let handler: Arc<dyn CapabilityHandler> = Arc::new(FnHandler::new(func));
        self.register(CapabilityEntry::new(kind, handler))
    }

    /// Registers an entry, consuming and returning the registry.
    ///
    /// # Errors
    ///
    /// Same as [`register`](Self::register).
    pub fn with(mut self, entry: CapabilityEntry) -> Result<Self, IntraflowError> {
        self.register(entry)?;
        Ok(self)
    }

    /// Looks up the entry for a kind.
    #[must_use]
    pub fn lookup(&self, kind: &str) -> Option<&CapabilityEntry> {
        self.entries.get(kind)
    }

    /// Checks if a kind is registered.
    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.entries.contains_key(kind)
    }

    /// Returns the registered kinds in registration order.
    #[must_use]
    pub fn kinds(&self) -> &[String] {
        &self.order
    }

    /// Returns the registry name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the registry has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn constant(value: serde_json::Value) -> Arc<dyn CapabilityHandler> {
        Arc::new(FnHandler::new(move |_: &Params, _: &MarketData| Ok(value.clone())))
    }

    #[test]
    fn test_registry_creation() {
        let registry = CapabilityRegistry::new("fetch");
        assert!(registry.is_empty());
        assert_eq!(registry.name(), "fetch");
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = CapabilityRegistry::new("fetch");
        registry
            .register(CapabilityEntry::new("intraday_prices", constant(json!([]))))
            .unwrap();

        assert!(registry.contains("intraday_prices"));
        assert!(registry.lookup("intraday_prices").is_some());
        assert!(registry.lookup("news_feed").is_none());
    }

    #[test]
    fn test_duplicate_kind_rejected() {
        let mut registry = CapabilityRegistry::new("recognize");
        registry
            .register(CapabilityEntry::new("price_volume_surge", constant(json!(1))))
            .unwrap();

        let err = registry
            .register(CapabilityEntry::new("price_volume_surge", constant(json!(2))))
            .unwrap_err();
        match err {
            IntraflowError::DuplicateKind(dup) => {
                assert_eq!(dup.kind, "price_volume_surge");
                assert_eq!(dup.registry, "recognize");
            }
            other => panic!("expected DuplicateKind, got {other:?}"),
        }
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_invalid_kind_rejected() {
        let mut registry = CapabilityRegistry::new("fetch");
        for bad in ["", "Intraday", "news-feed", "9lives", "has space"] {
            let result = registry.register(CapabilityEntry::new(bad, constant(json!(null))));
            assert!(matches!(result, Err(IntraflowError::InvalidKind(_))), "kind {bad:?}");
        }
    }

    #[test]
    fn test_kinds_in_registration_order() {
        let registry = CapabilityRegistry::new("fetch")
            .with(CapabilityEntry::new("news_feed", constant(json!(null))))
            .unwrap()
            .with(CapabilityEntry::new("economic_data", constant(json!(null))))
            .unwrap()
            .with(CapabilityEntry::new("intraday_prices", constant(json!(null))))
            .unwrap();

        assert_eq!(
            registry.kinds(),
            &["news_feed", "economic_data", "intraday_prices"]
        );
    }

    #[test]
    fn test_register_fn() {
        let mut registry = CapabilityRegistry::new("custom");
        registry
            .register_fn("echo_ticker", |params, _data| {
                params
                    .get("ticker")
                    .cloned()
                    .ok_or_else(|| HandlerFailure::new("no ticker"))
            })
            .unwrap();

        let entry = registry.lookup("echo_ticker").unwrap();
        let mut params = Params::new();
        params.insert("ticker".to_string(), json!("MSFT"));
        assert_eq!(entry.handler.invoke(&params, &MarketData::new()).unwrap(), json!("MSFT"));
    }
}

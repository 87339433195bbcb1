//! Keyed, order-preserving stage output record.

use super::ItemResult;
use crate::errors::ErrorKind;
use serde::{Deserialize, Serialize};

/// One entry of a stage output record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordEntry {
    /// Deterministic key derived from the originating request.
    pub key: String,
    /// The kind of the originating request.
    pub kind: String,
    /// The outcome for that request.
    pub result: ItemResult,
}

impl RecordEntry {
    /// Creates a new record entry.
    #[must_use]
    pub fn new(key: impl Into<String>, kind: impl Into<String>, result: ItemResult) -> Self {
        Self {
            key: key.into(),
            kind: kind.into(),
            result,
        }
    }
}

/// The output of a dispatching stage: one entry per input item.
///
/// Entries enumerate in input order. Keys are not required to be unique:
/// dispatching the same request twice yields two entries with the same key.
/// Keyed lookups return the first matching entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageOutputRecord {
    entries: Vec<RecordEntry>,
}

impl StageOutputRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty record with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Appends an entry.
    pub fn push(&mut self, entry: RecordEntry) {
        self.entries.push(entry);
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the record has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entries in input order.
    #[must_use]
    pub fn entries(&self) -> &[RecordEntry] {
        &self.entries
    }

    /// Iterates over the entries in input order.
    pub fn iter(&self) -> std::slice::Iter<'_, RecordEntry> {
        self.entries.iter()
    }

    /// Returns the keys in input order.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.key.as_str()).collect()
    }

    /// Gets the result for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ItemResult> {
        self.get_entry(key).map(|e| &e.result)
    }

    /// Gets the full entry for a key.
    #[must_use]
    pub fn get_entry(&self, key: &str) -> Option<&RecordEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// Returns true if an entry exists for the key.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get_entry(key).is_some()
    }

    /// Iterates over entries originating from the given kind.
    pub fn entries_of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a RecordEntry> + 'a {
        self.entries.iter().filter(move |e| e.kind == kind)
    }

    /// Iterates over successful entries.
    pub fn successes(&self) -> impl Iterator<Item = &RecordEntry> {
        self.entries.iter().filter(|e| e.result.is_success())
    }

    /// Iterates over failed entries.
    pub fn failures(&self) -> impl Iterator<Item = &RecordEntry> {
        self.entries.iter().filter(|e| e.result.is_failure())
    }

    /// Returns the number of failed entries.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// Returns the number of failed entries with the given reason.
    #[must_use]
    pub fn count_reason(&self, reason: ErrorKind) -> usize {
        self.entries
            .iter()
            .filter(|e| e.result.reason() == Some(reason))
            .count()
    }

    /// Returns true if the record is non-empty and every entry failed.
    #[must_use]
    pub fn all_failed(&self) -> bool {
        !self.entries.is_empty() && self.entries.iter().all(|e| e.result.is_failure())
    }

    /// Renders the record as a `key -> result` JSON object.
    ///
    /// Every entry appears once. A repeated key is shown under
    /// `{key}_2`, `{key}_3` and so on, in input order.
    #[must_use]
    pub fn to_keyed_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::with_capacity(self.entries.len());
        for entry in &self.entries {
            let mut key = entry.key.clone();
            let mut occurrence = 1_usize;
            while map.contains_key(&key) {
                occurrence += 1;
                key = format!("{}_{occurrence}", entry.key);
            }
            map.insert(
                key,
                serde_json::to_value(&entry.result).unwrap_or(serde_json::Value::Null),
            );
        }
        serde_json::Value::Object(map)
    }
}

impl FromIterator<RecordEntry> for StageOutputRecord {
    fn from_iter<I: IntoIterator<Item = RecordEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a StageOutputRecord {
    type Item = &'a RecordEntry;
    type IntoIter = std::slice::Iter<'a, RecordEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl IntoIterator for StageOutputRecord {
    type Item = RecordEntry;
    type IntoIter = std::vec::IntoIter<RecordEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

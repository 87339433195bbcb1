//! Error types for the intraflow pipeline.
//!
//! Two families live here. [`ErrorKind`] tags per-item failures that are
//! carried as data inside stage output records. The remaining types are
//! fatal construction-time errors (registry wiring, pipeline wiring,
//! configuration) collected under [`IntraflowError`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::core::SlotKey;

/// Classification of a failure reported inline in a stage output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// No handler is registered for the requested kind.
    UnknownKind,
    /// Required upstream data or parameters are absent or empty.
    InsufficientData,
    /// The handler itself failed.
    HandlerError,
    /// The strategy stage has nothing actionable to build on.
    InsufficientAnalysis,
    /// A kind was registered twice.
    DuplicateKind,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownKind => write!(f, "UnknownKind"),
            Self::InsufficientData => write!(f, "InsufficientData"),
            Self::HandlerError => write!(f, "HandlerError"),
            Self::InsufficientAnalysis => write!(f, "InsufficientAnalysis"),
            Self::DuplicateKind => write!(f, "DuplicateKind"),
        }
    }
}

/// The main error type for intraflow construction and composition.
#[derive(Debug, Error)]
pub enum IntraflowError {
    /// A capability kind was registered twice.
    #[error("{0}")]
    DuplicateKind(#[from] DuplicateKindError),

    /// A capability kind tag is malformed.
    #[error("{0}")]
    InvalidKind(#[from] InvalidKindError),

    /// Pipeline wiring is invalid.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// A pipeline slot was written twice.
    #[error("{0}")]
    SlotConflict(#[from] SlotConflictError),

    /// A stage read a slot it did not declare.
    #[error("{0}")]
    UndeclaredSlot(#[from] UndeclaredSlotError),

    /// Configuration could not be loaded or is invalid.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for IntraflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Metadata about a wiring error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "PIPELINE-002-MISSING_SLOT").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised when pipeline wiring fails validation.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
    /// Optional contract error info.
    pub error_info: Option<ContractErrorInfo>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }

    /// Sets the contract error info.
    #[must_use]
    pub fn with_error_info(mut self, info: ContractErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Returns the contract error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_info.as_ref().map(|info| info.code.as_str())
    }
}

/// Error raised when a kind is registered twice in one registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Duplicate kind '{kind}' in capability registry '{registry}'")]
pub struct DuplicateKindError {
    /// The registry name.
    pub registry: String,
    /// The duplicated kind.
    pub kind: String,
}

impl DuplicateKindError {
    /// Creates a new duplicate kind error.
    #[must_use]
    pub fn new(registry: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            registry: registry.into(),
            kind: kind.into(),
        }
    }

    /// The taxonomy tag for this error.
    #[must_use]
    pub const fn error_kind(&self) -> ErrorKind {
        ErrorKind::DuplicateKind
    }
}

/// Error raised when a kind tag does not match the accepted pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid kind '{kind}': kinds must be lowercase snake_case starting with a letter")]
pub struct InvalidKindError {
    /// The rejected kind.
    pub kind: String,
}

impl InvalidKindError {
    /// Creates a new invalid kind error.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }
}

/// Error raised when a pipeline slot is written more than once.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Slot conflict: '{slot}' was already written by an earlier stage")]
pub struct SlotConflictError {
    /// The conflicting slot.
    pub slot: SlotKey,
}

impl SlotConflictError {
    /// Creates a new slot conflict error.
    #[must_use]
    pub const fn new(slot: SlotKey) -> Self {
        Self { slot }
    }
}

/// Error raised when a stage reads a slot it did not declare as an input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Undeclared slot: stage '{stage}' attempted to read '{slot}' which was not declared as an input")]
pub struct UndeclaredSlotError {
    /// The stage attempting access.
    pub stage: String,
    /// The undeclared slot.
    pub slot: SlotKey,
}

impl UndeclaredSlotError {
    /// Creates a new undeclared slot error.
    #[must_use]
    pub fn new(stage: impl Into<String>, slot: SlotKey) -> Self {
        Self {
            stage: stage.into(),
            slot,
        }
    }
}

/// Errors related to loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        /// The file path.
        path: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration could not be parsed.
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// A configuration value is out of range.
    #[error("Invalid config value for '{field}': {reason}")]
    Invalid {
        /// The offending field.
        field: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Creates an invalid-value error.
    #[must_use]
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

//! Pipeline configuration.

use crate::dispatch::DispatchMode;
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Upper bound on strategy proposals per session.
pub const MAX_PROPOSALS_LIMIT: usize = 2;

/// Top-level configuration for an intraday pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// How dispatch stages run their items.
    #[serde(default)]
    pub dispatch_mode: DispatchMode,
    /// Whether reading an undeclared slot is an error.
    #[serde(default = "default_strict_inputs")]
    pub strict_inputs: bool,
    /// Pattern detector thresholds.
    #[serde(default)]
    pub detectors: DetectorConfig,
    /// Strategy generation settings.
    #[serde(default)]
    pub strategy: StrategyConfig,
}

fn default_strict_inputs() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dispatch_mode: DispatchMode::default(),
            strict_inputs: default_strict_inputs(),
            detectors: DetectorConfig::default(),
            strategy: StrategyConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the dispatch mode.
    #[must_use]
    pub fn with_dispatch_mode(mut self, mode: DispatchMode) -> Self {
        self.dispatch_mode = mode;
        self
    }

    /// Sets strict input checking.
    #[must_use]
    pub fn with_strict_inputs(mut self, strict: bool) -> Self {
        self.strict_inputs = strict;
        self
    }

    /// Sets the detector thresholds.
    #[must_use]
    pub fn with_detectors(mut self, detectors: DetectorConfig) -> Self {
        self.detectors = detectors;
        self
    }

    /// Sets the maximum number of proposals.
    #[must_use]
    pub fn with_max_proposals(mut self, max: usize) -> Self {
        self.strategy.max_proposals = max;
        self
    }

    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed JSON and
    /// `ConfigError::Invalid` for out-of-range values.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` if the file cannot be read, otherwise the
    /// same errors as [`from_json_str`](Self::from_json_str).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Checks every value is in range.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detectors.validate()?;
        self.strategy.validate()
    }
}

/// Thresholds for the built-in pattern detectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Minimum ratio of a bar's volume to the mean of the others.
    #[serde(default = "default_surge_volume_ratio")]
    pub surge_volume_ratio: f64,
    /// Minimum absolute close-to-close move for a surge, in percent.
    #[serde(default = "default_surge_min_price_move_pct")]
    pub surge_min_price_move_pct: f64,
    /// Minimum absolute mean sentiment for news correlation.
    #[serde(default = "default_news_min_sentiment")]
    pub news_min_sentiment: f64,
    /// Length of the opening window, in minutes.
    #[serde(default = "default_first_hour_minutes")]
    pub first_hour_minutes: u32,
}

fn default_surge_volume_ratio() -> f64 {
    2.0
}

fn default_surge_min_price_move_pct() -> f64 {
    1.0
}

fn default_news_min_sentiment() -> f64 {
    0.2
}

fn default_first_hour_minutes() -> u32 {
    60
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            surge_volume_ratio: default_surge_volume_ratio(),
            surge_min_price_move_pct: default_surge_min_price_move_pct(),
            news_min_sentiment: default_news_min_sentiment(),
            first_hour_minutes: default_first_hour_minutes(),
        }
    }
}

impl DetectorConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !is_positive(self.surge_volume_ratio) {
            return Err(ConfigError::invalid(
                "detectors.surge_volume_ratio",
                "must be positive",
            ));
        }
        if !is_positive(self.surge_min_price_move_pct) {
            return Err(ConfigError::invalid(
                "detectors.surge_min_price_move_pct",
                "must be positive",
            ));
        }
        if !is_positive(self.news_min_sentiment) || self.news_min_sentiment > 1.0 {
            return Err(ConfigError::invalid(
                "detectors.news_min_sentiment",
                "must be in (0, 1]",
            ));
        }
        if self.first_hour_minutes == 0 {
            return Err(ConfigError::invalid(
                "detectors.first_hour_minutes",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Strategy generation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Maximum proposals per session.
    #[serde(default = "default_max_proposals")]
    pub max_proposals: usize,
}

fn default_max_proposals() -> usize {
    MAX_PROPOSALS_LIMIT
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            max_proposals: default_max_proposals(),
        }
    }
}

impl StrategyConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_PROPOSALS_LIMIT).contains(&self.max_proposals) {
            return Err(ConfigError::invalid(
                "strategy.max_proposals",
                format!("must be between 1 and {MAX_PROPOSALS_LIMIT}"),
            ));
        }
        Ok(())
    }
}

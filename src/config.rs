//! Engine configuration
//!
//! Loaded from YAML (or JSON). Every field has a default, so a partial file
//! only overrides what it names.

use crate::algo::{BetweennessConfig, EigenvectorConfig, MetricSettings, ShortestPathConfig};
use crate::duplicates::DuplicateSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub use netgraph_algorithms::{BETWEENNESS_SAMPLE_BUDGET, EIGENVECTOR_MAX_ITERATIONS, EIGENVECTOR_TOLERANCE, TIE_TOLERANCE};

/// Compiled queries remembered by default
pub const DEFAULT_COMPILED_QUERY_CACHE_SIZE: usize = 256;
pub const DEFAULT_LOCALE: &str = "en";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub compiled_query_cache_size: usize,
    pub default_locale: String,
    pub eigenvector: EigenvectorConfig,
    pub betweenness: BetweennessConfig,
    pub path_length: ShortestPathConfig,
    pub duplicates: DuplicateSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            compiled_query_cache_size: DEFAULT_COMPILED_QUERY_CACHE_SIZE,
            default_locale: DEFAULT_LOCALE.to_string(),
            eigenvector: EigenvectorConfig::default(),
            betweenness: BetweennessConfig::default(),
            path_length: ShortestPathConfig::default(),
            duplicates: DuplicateSettings::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file; `.json` files are read as JSON, anything else as YAML
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(&path)?;
        if path.as_ref().extension().and_then(|s| s.to_str()) == Some("json") {
            let config: Self = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.eigenvector.iterations == 0 {
            return Err(ConfigError::Invalid("eigenvector.iterations must be positive".into()));
        }
        if self.duplicates.label_prop.trim().is_empty() {
            return Err(ConfigError::Invalid("duplicates.label_prop must not be empty".into()));
        }
        if self.betweenness.sample_budget == 0 {
            return Err(ConfigError::Invalid("betweenness.sample_budget must be positive".into()));
        }
        let tolerances = [
            ("eigenvector.tolerance", self.eigenvector.tolerance),
            ("betweenness.tie_tolerance", self.betweenness.tie_tolerance),
            ("path_length.tie_tolerance", self.path_length.tie_tolerance),
        ];
        for (name, value) in tolerances {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Invalid(format!("{} must be a non-negative number", name)));
            }
        }
        Ok(())
    }

    /// Algorithm parameters handed to compiled metrics
    pub fn metric_settings(&self) -> MetricSettings {
        MetricSettings {
            eigenvector: self.eigenvector.clone(),
            betweenness: self.betweenness.clone(),
            path_length: self.path_length.clone(),
        }
    }
}

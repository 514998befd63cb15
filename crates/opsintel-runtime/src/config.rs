//! Runtime configuration.
//!
//! Loaded from YAML. Durations are human-readable strings (`"500ms"`,
//! `"30s"`, `"5m"`). Every section has defaults, so an empty document is a
//! valid configuration.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::providers::CompletionConfig;
use crate::resilience::{self, RetryPolicy};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Which provider to build and its provider-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(rename = "type")]
    pub provider_type: String,

    /// Passed through to the provider factory.
    #[serde(default)]
    pub options: JsonValue,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            provider_type: "anthropic".to_string(),
            options: JsonValue::Object(Default::default()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: u64,

    #[serde(with = "duration_str")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_entries: 1000,
            ttl: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Locations sampled by the global health score.
    pub health_sample_size: usize,

    /// Cap on merged daily-summary recommendations.
    pub max_recommendations: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            health_sample_size: 5,
            max_recommendations: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Gateway concurrency bound.
    pub max_in_flight: usize,

    pub provider: ProviderSettings,
    pub completion: CompletionConfig,
    #[serde(deserialize_with = "resilience::structured_section")]
    pub structured_retry: RetryPolicy,
    #[serde(deserialize_with = "resilience::text_section")]
    pub text_retry: RetryPolicy,
    pub cache: CacheConfig,
    pub analysis: AnalysisConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 2,
            provider: ProviderSettings::default(),
            completion: CompletionConfig::default(),
            structured_retry: RetryPolicy::structured(),
            text_retry: RetryPolicy::text(),
            cache: CacheConfig::default(),
            analysis: AnalysisConfig::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_in_flight == 0 {
            return Err(ConfigError::Invalid(
                "max_in_flight must be at least 1".to_string(),
            ));
        }
        self.structured_retry
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("structured_retry: {}", e)))?;
        self.text_retry
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("text_retry: {}", e)))?;
        if self.cache.enabled && self.cache.max_entries == 0 {
            return Err(ConfigError::Invalid(
                "cache.max_entries must be positive when the cache is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

/// Serde adapter for `Duration` as a humantime string.
pub(crate) mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }

    pub fn deserialize_option<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| humantime::parse_duration(&raw).map_err(serde::de::Error::custom))
            .transpose()
    }
}

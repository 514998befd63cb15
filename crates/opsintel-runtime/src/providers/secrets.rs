//! API keys for generation providers.
//!
//! A key is moved into a [`SecretString`] as soon as it is read and only
//! leaves it when a request header is built.

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value as JsonValue;
use std::fmt;

use super::ProviderError;

/// Where a provider looks for its key: a field of its JSON config, then an
/// environment variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialSpec {
    pub config_key: &'static str,
    pub env_var: &'static str,
    /// Human name used in errors and logs
    pub label: &'static str,
}

impl CredentialSpec {
    fn from_config<'a>(&self, config: &'a JsonValue) -> Option<&'a str> {
        config.get(self.config_key).and_then(JsonValue::as_str)
    }

    fn from_env(&self) -> Option<String> {
        std::env::var(self.env_var).ok()
    }

    /// True when a key would resolve, without reading it into memory.
    pub fn is_satisfied(&self, config: &JsonValue) -> bool {
        self.from_config(config).is_some() || std::env::var_os(self.env_var).is_some()
    }

    pub fn missing(&self) -> ProviderError {
        ProviderError::NotConfigured(format!(
            "{} missing: set '{}' in the provider options or export {}",
            self.label, self.config_key, self.env_var
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Config,
    Environment,
    Programmatic,
}

impl CredentialSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Environment => "environment",
            Self::Programmatic => "programmatic",
        }
    }
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct ApiCredential {
    secret: SecretString,
    source: CredentialSource,
    label: &'static str,
}

impl ApiCredential {
    pub fn new(secret: impl Into<String>, source: CredentialSource, label: &'static str) -> Self {
        Self {
            secret: SecretString::from(secret.into()),
            source,
            label,
        }
    }

    /// Resolve a key for `spec`. Config takes precedence over the
    /// environment.
    pub fn resolve(spec: &CredentialSpec, config: &JsonValue) -> Result<Self, ProviderError> {
        if let Some(secret) = spec.from_config(config) {
            return Ok(Self::new(secret, CredentialSource::Config, spec.label));
        }
        spec.from_env()
            .map(|secret| Self::new(secret, CredentialSource::Environment, spec.label))
            .ok_or_else(|| spec.missing())
    }

    /// The raw key. Only the request builder should call this.
    pub fn expose(&self) -> &str {
        self.secret.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.expose().is_empty()
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("label", &self.label)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, redacted)", self.label, self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const KEY: &str = "sk-ops-secret-0042";

    fn spec(env_var: &'static str) -> CredentialSpec {
        CredentialSpec {
            config_key: "api_key",
            env_var,
            label: "Generation API key",
        }
    }

    #[test]
    fn test_key_never_formatted() {
        let cred = ApiCredential::new(KEY, CredentialSource::Config, "Generation API key");

        for rendered in [format!("{:?}", cred), cred.to_string()] {
            assert!(!rendered.contains(KEY), "leaked in {rendered}");
        }
        assert_eq!(cred.to_string(), "Generation API key (config, redacted)");
        assert_eq!(cred.expose(), KEY);
    }

    #[test]
    fn test_config_key_beats_environment() {
        let spec = spec("OPSINTEL_TEST_KEY_PRIORITY");
        std::env::set_var(spec.env_var, "from-env");
        let cred = ApiCredential::resolve(&spec, &json!({"api_key": "from-config"})).unwrap();
        std::env::remove_var(spec.env_var);

        assert_eq!(cred.expose(), "from-config");
        assert_eq!(cred.source(), CredentialSource::Config);
    }

    #[test]
    fn test_environment_used_when_config_silent() {
        let spec = spec("OPSINTEL_TEST_KEY_FALLBACK");
        std::env::set_var(spec.env_var, "from-env");
        let cred = ApiCredential::resolve(&spec, &json!({})).unwrap();
        std::env::remove_var(spec.env_var);

        assert_eq!(cred.source(), CredentialSource::Environment);
        assert_eq!(cred.expose(), "from-env");
    }

    #[test]
    fn test_missing_key_names_both_places() {
        let spec = spec("OPSINTEL_TEST_KEY_MISSING");
        assert!(!spec.is_satisfied(&json!({})));
        assert!(spec.is_satisfied(&json!({"api_key": "k"})));

        let message = ApiCredential::resolve(&spec, &json!({})).unwrap_err().to_string();
        assert!(message.contains("'api_key'"));
        assert!(message.contains("OPSINTEL_TEST_KEY_MISSING"));
    }
}

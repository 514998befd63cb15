//! Provider lookup by type name.
//!
//! The runtime config names a provider type and passes it a free-form
//! options object. Each backend contributes a [`ProviderFactory`]; the
//! [`ProviderRegistry`] maps type names to factories.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use super::{GenerationProvider, ProviderError};

pub trait ProviderFactory: Send + Sync {
    /// Name used in config, e.g. "anthropic".
    fn provider_type(&self) -> &'static str;

    fn create(&self, options: &JsonValue) -> Result<Arc<dyn GenerationProvider>, ProviderError>;

    /// Reject bad options up front. The default accepts anything.
    fn validate_config(&self, _options: &JsonValue) -> Result<(), ProviderError> {
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct ProviderRegistry {
    factories: BTreeMap<&'static str, Arc<dyn ProviderFactory>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every backend compiled into this build.
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();
        #[cfg(feature = "anthropic")]
        registry.register(Arc::new(super::AnthropicProviderFactory));
        registry
    }

    /// Later registrations replace earlier ones of the same type.
    pub fn register(&mut self, factory: Arc<dyn ProviderFactory>) -> &mut Self {
        self.factories.insert(factory.provider_type(), factory);
        self
    }

    pub fn create(
        &self,
        provider_type: &str,
        options: &JsonValue,
    ) -> Result<Arc<dyn GenerationProvider>, ProviderError> {
        let factory = self.lookup(provider_type)?;
        factory.validate_config(options)?;
        let provider = factory.create(options)?;
        tracing::debug!(provider = provider_type, "Generation provider created");
        Ok(provider)
    }

    pub fn validate(&self, provider_type: &str, options: &JsonValue) -> Result<(), ProviderError> {
        self.lookup(provider_type)?.validate_config(options)
    }

    pub fn contains(&self, provider_type: &str) -> bool {
        self.factories.contains_key(provider_type)
    }

    pub fn types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }

    fn lookup(&self, provider_type: &str) -> Result<&dyn ProviderFactory, ProviderError> {
        match self.factories.get(provider_type) {
            Some(factory) => Ok(factory.as_ref()),
            None => {
                let known = self.types().collect::<Vec<_>>().join(", ");
                Err(ProviderError::NotConfigured(format!(
                    "no provider named '{}' (known: {})",
                    provider_type,
                    if known.is_empty() { "none" } else { known.as_str() }
                )))
            }
        }
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.types()).finish()
    }
}

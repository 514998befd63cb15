//! Model backends.
//!
//! A [`GenerationProvider`] sends one conversation to a model and returns its
//! text. Only the gateway calls providers: it owns concurrency, retries and
//! schema checks, so a provider makes exactly one attempt per call and
//! reports what went wrong as a [`ProviderError`].
//!
//! API keys are held as [`ApiCredential`]s and never appear in logs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;
use thiserror::Error;

mod factory;
pub mod secrets;

#[cfg(feature = "anthropic")]
mod anthropic;

pub use factory::{ProviderFactory, ProviderRegistry};
pub use secrets::{ApiCredential, CredentialSource, CredentialSpec};

#[cfg(feature = "anthropic")]
pub use anthropic::{AnthropicProvider, AnthropicProviderFactory};

/// One failed provider attempt.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The backend asked us to slow down (HTTP 429 or equivalent).
    #[error("Rate limited by provider (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unreadable provider response: {0}")]
    Decode(String),

    #[error("Provider rejected the API key")]
    Unauthorized,

    #[error("No response within {0:?}")]
    TimedOut(Duration),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// Model settings for a single request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,

    /// Upper bound on one HTTP exchange
    #[serde(with = "crate::config::duration_str")]
    pub timeout: Duration,

    /// Set by the gateway on structured calls. Providers without a native
    /// schema mode pass it to the model as an instruction.
    #[serde(skip)]
    pub response_schema: Option<JsonValue>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-5".to_string(),
            max_tokens: 1024,
            temperature: 0.0,
            timeout: Duration::from_secs(60),
            response_schema: None,
        }
    }
}

impl CompletionConfig {
    /// Copy of these settings carrying `schema`.
    pub fn with_schema(&self, schema: &JsonValue) -> Self {
        let mut config = self.clone();
        config.response_schema = Some(schema.clone());
        config
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }
}

/// Text plus accounting for one successful attempt.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub usage: TokenUsage,
    pub model: String,
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// One attempt, no retries.
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError>;

    fn name(&self) -> &str;

    /// Cheap estimate for backends that do not report usage.
    fn estimate_tokens(&self, text: &str) -> u32 {
        u32::try_from(text.chars().count().div_ceil(4)).unwrap_or(u32::MAX)
    }
}

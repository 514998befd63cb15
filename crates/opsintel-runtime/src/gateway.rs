//! Structured Generation Gateway.
//!
//! Every model call in the runtime goes through [`GenerationGateway`]. It
//! bounds how many calls are in flight, retries rate-limit and quota
//! failures with exponential backoff, and checks structured responses
//! against a JSON schema before handing them back.
//!
//! A call holds its concurrency permit for its whole retry sequence, so
//! `max_in_flight` bounds provider traffic including retries.

use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Semaphore, SemaphorePermit};

use backon::Retryable;

use crate::cache::{CacheKey, CachedResponse, ResponseCache};
use crate::config::RuntimeConfig;
use crate::providers::{
    ChatMessage, CompletionConfig, CompletionResponse, GenerationProvider, ProviderError,
    ProviderRegistry,
};
use crate::resilience::{RetryPolicy, UsageTracker};
use crate::structured;

lazy_static! {
    static ref RATE_LIMIT_TEXT: Regex = Regex::new(r"(?i)too many requests|quota|rate limit").unwrap();
}

const STRUCTURED_SYSTEM_PROMPT: &str =
    "You are an operations analyst for a retail chain. Answer with JSON only.";

#[derive(Error, Debug, Clone)]
pub enum GenerationError {
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Provider error: {0}")]
    Provider(ProviderError),

    #[error("Malformed JSON in response: {0}")]
    MalformedJson(String),

    #[error("Response violates schema: {}", .0.join("; "))]
    SchemaViolation(Vec<String>),

    #[error("Invalid response schema: {0}")]
    InvalidSchema(String),

    #[error("Retry budget exhausted after {attempts} attempts: {last}")]
    Exhausted {
        attempts: usize,
        last: Box<GenerationError>,
    },

    #[error("Gateway is closed")]
    Closed,
}

impl GenerationError {
    /// Only rate-limit and quota failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GenerationError::RateLimited(_))
    }
}

impl From<ProviderError> for GenerationError {
    fn from(error: ProviderError) -> Self {
        match &error {
            ProviderError::RateLimited { .. } => GenerationError::RateLimited(error.to_string()),
            other if RATE_LIMIT_TEXT.is_match(&other.to_string()) => {
                GenerationError::RateLimited(error.to_string())
            }
            _ => GenerationError::Provider(error),
        }
    }
}

pub struct GenerationGateway {
    provider: Arc<dyn GenerationProvider>,
    permits: Semaphore,
    max_in_flight: usize,
    completion: CompletionConfig,
    structured_retry: RetryPolicy,
    text_retry: RetryPolicy,
    cache: Option<ResponseCache>,
    usage: Arc<UsageTracker>,
}

impl GenerationGateway {
    pub fn new(provider: Arc<dyn GenerationProvider>, config: &RuntimeConfig) -> Self {
        let max_in_flight = config.max_in_flight.max(1);
        Self {
            provider,
            permits: Semaphore::new(max_in_flight),
            max_in_flight,
            completion: config.completion.clone(),
            structured_retry: config.structured_retry.clone(),
            text_retry: config.text_retry.clone(),
            cache: ResponseCache::from_config(&config.cache),
            usage: Arc::new(UsageTracker::new()),
        }
    }

    /// Build the configured provider from `registry` and wrap it.
    pub fn from_config(
        config: &RuntimeConfig,
        registry: &ProviderRegistry,
    ) -> Result<Self, ProviderError> {
        let provider = registry.create(&config.provider.provider_type, &config.provider.options)?;
        tracing::info!(
            provider = provider.name(),
            max_in_flight = config.max_in_flight,
            "Generation gateway ready"
        );
        Ok(Self::new(provider, config))
    }

    pub fn usage(&self) -> &Arc<UsageTracker> {
        &self.usage
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Free-text generation with the text retry budget.
    pub async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.usage.record_call();

        let key = CacheKey::text(prompt);
        if let Some(CachedResponse::Text(text)) = self.cached(&key).await {
            return Ok(text);
        }

        let _permit = self.acquire().await?;

        let this = self;
        let config = &self.completion;
        let messages = vec![ChatMessage::user(prompt)];

        let result = self
            .with_retry(&self.text_retry, "text", move || {
                let messages = messages.clone();
                async move {
                    let response = this.call_provider(messages, config).await?;
                    Ok(response.content)
                }
            })
            .await;

        self.finish(key, result, |text| CachedResponse::Text(text.clone()))
            .await
    }

    /// Schema-checked generation, deserialized into `T`.
    pub async fn generate_structured<T: DeserializeOwned>(
        &self,
        prompt: &str,
        schema: &JsonValue,
    ) -> Result<T, GenerationError> {
        let value = self.generate_structured_value(prompt, schema).await?;
        structured::decode(value).inspect_err(|error| {
            self.usage.record_failure();
            tracing::warn!(error = %error, "Structured reply did not decode");
        })
    }

    /// Schema-checked generation returning the validated JSON value.
    pub async fn generate_structured_value(
        &self,
        prompt: &str,
        schema: &JsonValue,
    ) -> Result<JsonValue, GenerationError> {
        self.usage.record_call();

        let key = CacheKey::structured(prompt, schema);
        if let Some(CachedResponse::Structured(value)) = self.cached(&key).await {
            return Ok(value);
        }

        let _permit = self.acquire().await?;

        let this = self;
        let config = self.completion.with_schema(schema);
        let config = &config;
        let messages = vec![
            ChatMessage::system(STRUCTURED_SYSTEM_PROMPT),
            ChatMessage::user(prompt),
        ];

        let result = self
            .with_retry(&self.structured_retry, "structured", move || {
                let messages = messages.clone();
                async move {
                    let response = this.call_provider(messages, config).await?;
                    structured::parse_and_validate(&response.content, schema)
                }
            })
            .await;

        self.finish(key, result, |value| CachedResponse::Structured(value.clone()))
            .await
    }

    async fn acquire(&self) -> Result<SemaphorePermit<'_>, GenerationError> {
        self.permits
            .acquire()
            .await
            .map_err(|_| GenerationError::Closed)
    }

    async fn cached(&self, key: &CacheKey) -> Option<CachedResponse> {
        let hit = self.cache.as_ref()?.get(key).await?;
        self.usage.record_cache_hit();
        tracing::debug!("Gateway cache hit");
        Some(hit)
    }

    async fn call_provider(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, GenerationError> {
        let response = self.provider.complete(messages, config).await?;
        self.usage.record_tokens(&response.usage);
        Ok(response)
    }

    async fn with_retry<T, F, Fut>(
        &self,
        policy: &RetryPolicy,
        kind: &'static str,
        mut operation: F,
    ) -> Result<T, GenerationError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GenerationError>>,
    {
        let attempts = AtomicUsize::new(0);

        let result = (|| {
            attempts.fetch_add(1, Ordering::SeqCst);
            operation()
        })
        .retry(policy.backoff())
        .sleep(tokio::time::sleep)
        .when(|e: &GenerationError| e.is_retryable())
        .notify(|e: &GenerationError, delay: Duration| {
            self.usage.record_retry();
            tracing::warn!(
                kind,
                attempt = attempts.load(Ordering::SeqCst),
                delay = ?delay,
                error = %e,
                "Retryable generation failure"
            );
        })
        .await;

        match result {
            Err(e) if e.is_retryable() => Err(GenerationError::Exhausted {
                attempts: attempts.load(Ordering::SeqCst),
                last: Box::new(e),
            }),
            other => other,
        }
    }

    async fn finish<T>(
        &self,
        key: CacheKey,
        result: Result<T, GenerationError>,
        to_cached: impl FnOnce(&T) -> CachedResponse,
    ) -> Result<T, GenerationError> {
        match &result {
            Ok(value) => {
                if let Some(cache) = &self.cache {
                    cache.insert(key, to_cached(value)).await;
                }
            }
            Err(error) => {
                self.usage.record_failure();
                tracing::warn!(error = %error, "Generation failed");
            }
        }
        result
    }
}

//! Scripted provider for unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::providers::{
    ChatMessage, CompletionConfig, CompletionResponse, GenerationProvider, MessageRole, ProviderError,
    TokenUsage,
};

type Responder = Box<dyn Fn(&str, Option<&JsonValue>) -> Result<String, ProviderError> + Send + Sync>;

/// Replies from a queue of scripted results, then from a responder
/// function. Tracks call counts and peak concurrency.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    responder: Responder,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    last_schema: Mutex<Option<JsonValue>>,
}

impl ScriptedProvider {
    /// Reply with `prompt, schema -> result`.
    pub fn responding<F>(responder: F) -> Self
    where
        F: Fn(&str, Option<&JsonValue>) -> Result<String, ProviderError> + Send + Sync + 'static,
    {
        Self {
            script: Mutex::new(VecDeque::new()),
            responder: Box::new(responder),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            last_schema: Mutex::new(None),
        }
    }

    pub fn always(reply: impl Into<String>) -> Self {
        let reply = reply.into();
        Self::responding(move |_, _| Ok(reply.clone()))
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::responding(move |_, _| Err(error.clone()))
    }

    /// Queue a failure ahead of the steady-state reply.
    pub fn then_fail(self, error: ProviderError) -> Self {
        self.script.lock().push_back(Err(error));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn last_schema(&self) -> Option<JsonValue> {
        self.last_schema.lock().clone()
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        *self.last_schema.lock() = config.response_schema.clone();

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let prompt = messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        let scripted = self.script.lock().pop_front();
        let result = match scripted {
            Some(result) => result,
            None => (self.responder)(prompt, config.response_schema.as_ref()),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        result.map(|content| CompletionResponse {
            usage: TokenUsage {
                prompt_tokens: self.estimate_tokens(prompt),
                completion_tokens: self.estimate_tokens(&content),
            },
            content,
            model: "scripted".to_string(),
            stop_reason: Some("end_turn".to_string()),
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

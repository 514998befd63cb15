//! Anthropic Messages API backend.
//!
//! The Messages API takes system text out of band and has no schema mode, so
//! a structured request appends its schema to the system text. The gateway
//! validates the reply either way.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::{
    factory::ProviderFactory,
    secrets::{ApiCredential, CredentialSource, CredentialSpec},
    ChatMessage, CompletionConfig, CompletionResponse, GenerationProvider, MessageRole,
    ProviderError, TokenUsage,
};

pub const API_KEY: CredentialSpec = CredentialSpec {
    config_key: "api_key",
    env_var: "ANTHROPIC_API_KEY",
    label: "Anthropic API key",
};

const API_VERSION: &str = "2023-06-01";

/// Provider options as they appear under `provider.options`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct AnthropicSettings {
    base_url: String,
}

impl Default for AnthropicSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.anthropic.com/v1".to_string(),
        }
    }
}

impl AnthropicSettings {
    fn parse(options: &JsonValue) -> Result<Self, ProviderError> {
        let mut settings: Self = serde_json::from_value(options.clone())
            .map_err(|e| ProviderError::NotConfigured(format!("anthropic options: {}", e)))?;
        if !settings.base_url.starts_with("https://") && !settings.base_url.starts_with("http://") {
            return Err(ProviderError::NotConfigured(format!(
                "anthropic base_url is not an http(s) URL: {}",
                settings.base_url
            )));
        }
        settings.base_url.truncate(settings.base_url.trim_end_matches('/').len());
        Ok(settings)
    }
}

pub struct AnthropicProvider {
    credential: ApiCredential,
    endpoint: String,
    http: reqwest::Client,
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("endpoint", &self.endpoint)
            .field("credential", &self.credential)
            .finish()
    }
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        let credential = ApiCredential::new(api_key, CredentialSource::Programmatic, API_KEY.label);
        Self::build(credential, AnthropicSettings::default())
    }

    pub fn from_options(options: &JsonValue) -> Result<Self, ProviderError> {
        let settings = AnthropicSettings::parse(options)?;
        let credential = ApiCredential::resolve(&API_KEY, options)?;
        tracing::debug!(source = %credential.source(), base_url = %settings.base_url, "Anthropic provider configured");
        Ok(Self::build(credential, settings))
    }

    fn build(credential: ApiCredential, settings: AnthropicSettings) -> Self {
        Self {
            credential,
            endpoint: format!("{}/messages", settings.base_url),
            http: reqwest::Client::new(),
        }
    }

    fn request_body(messages: Vec<ChatMessage>, config: &CompletionConfig) -> MessagesRequest {
        let (system, turns): (Vec<_>, Vec<_>) = messages
            .into_iter()
            .partition(|m| m.role == MessageRole::System);

        let mut system: Vec<String> = system.into_iter().map(|m| m.content).collect();
        if let Some(schema) = &config.response_schema {
            system.push(format!(
                "Reply with exactly one JSON object matching this JSON schema. No prose, no code fences.\n{}",
                schema
            ));
        }

        MessagesRequest {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            system: if system.is_empty() {
                None
            } else {
                Some(system.join("\n\n"))
            },
            messages: turns,
        }
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct MessagesReply {
    model: String,
    #[serde(default)]
    stop_reason: Option<String>,
    content: Vec<ContentBlock>,
    usage: ReplyUsage,
}

/// Only text blocks carry content we use.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ReplyUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let seconds = headers.get(reqwest::header::RETRY_AFTER)?.to_str().ok()?;
    seconds.trim().parse().ok().map(Duration::from_secs)
}

fn transport_error(error: reqwest::Error, timeout: Duration) -> ProviderError {
    if error.is_timeout() {
        ProviderError::TimedOut(timeout)
    } else {
        ProviderError::Transport(error.to_string())
    }
}

async fn status_error(status: StatusCode, response: reqwest::Response) -> ProviderError {
    let wait = retry_after(response.headers());
    let body = response.text().await.unwrap_or_default();
    error_for_status(status, wait, body)
}

/// 403 keeps its body: quota exhaustion arrives as a 403 with a message.
fn error_for_status(status: StatusCode, retry_after: Option<Duration>, body: String) -> ProviderError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited { retry_after },
        StatusCode::UNAUTHORIZED => ProviderError::Unauthorized,
        _ => {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or(body);
            ProviderError::Api {
                status: status.as_u16(),
                message,
            }
        }
    }
}

#[async_trait]
impl GenerationProvider for AnthropicProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        let body = Self::request_body(messages, config);

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", self.credential.expose())
            .header("anthropic-version", API_VERSION)
            .timeout(config.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, config.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response).await);
        }

        let reply: MessagesReply = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        let content: String = reply
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect();

        Ok(CompletionResponse {
            content,
            usage: TokenUsage {
                prompt_tokens: reply.usage.input_tokens,
                completion_tokens: reply.usage.output_tokens,
            },
            model: reply.model,
            stop_reason: reply.stop_reason,
        })
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}

/// Registered as `anthropic`. Options: `api_key` (falls back to
/// `ANTHROPIC_API_KEY`) and `base_url`.
pub struct AnthropicProviderFactory;

impl ProviderFactory for AnthropicProviderFactory {
    fn provider_type(&self) -> &'static str {
        "anthropic"
    }

    fn create(&self, options: &JsonValue) -> Result<Arc<dyn GenerationProvider>, ProviderError> {
        Ok(Arc::new(AnthropicProvider::from_options(options)?))
    }

    fn validate_config(&self, options: &JsonValue) -> Result<(), ProviderError> {
        AnthropicSettings::parse(options)?;
        if !API_KEY.is_satisfied(options) {
            return Err(API_KEY.missing());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_system_text_and_schema_move_out_of_turns() {
        let schema = json!({"type": "object", "required": ["score"]});
        let config = CompletionConfig::default().with_schema(&schema);

        let body = AnthropicProvider::request_body(
            vec![ChatMessage::system("You audit stores."), ChatMessage::user("Go")],
            &config,
        );

        let system = body.system.unwrap();
        assert!(system.starts_with("You audit stores.\n\n"));
        assert!(system.contains(r#""required":["score"]"#));
        assert_eq!(body.messages, vec![ChatMessage::user("Go")]);
    }

    #[test]
    fn test_wire_format() {
        let body = AnthropicProvider::request_body(vec![ChatMessage::user("Hi")], &CompletionConfig::default());
        let wire = serde_json::to_value(&body).unwrap();

        assert!(wire.get("system").is_none());
        assert_eq!(wire["messages"][0], json!({"role": "user", "content": "Hi"}));
    }

    #[test]
    fn test_reply_keeps_text_blocks_only() {
        let reply: MessagesReply = serde_json::from_value(json!({
            "model": "m",
            "stop_reason": "end_turn",
            "content": [
                {"type": "text", "text": "{\"score\":"},
                {"type": "tool_use", "id": "t1", "name": "x", "input": {}},
                {"type": "text", "text": "90}"}
            ],
            "usage": {"input_tokens": 10, "output_tokens": 4}
        }))
        .unwrap();

        let texts: Vec<_> = reply
            .content
            .iter()
            .filter(|b| matches!(b, ContentBlock::Text { .. }))
            .collect();
        assert_eq!(texts.len(), 2);
    }

    #[test]
    fn test_options_base_url() {
        let provider = AnthropicProvider::from_options(&json!({
            "api_key": "k",
            "base_url": "https://proxy.internal/v1/"
        }))
        .unwrap();
        assert_eq!(provider.endpoint, "https://proxy.internal/v1/messages");
        assert_eq!(provider.credential.source(), CredentialSource::Config);
    }

    #[test]
    fn test_key_absent_from_debug() {
        let provider = AnthropicProvider::new("sk-ant-very-secret");
        assert!(!format!("{:?}", provider).contains("sk-ant-very-secret"));
    }

    #[test]
    fn test_factory_rejects_non_http_url() {
        let err = AnthropicProviderFactory
            .validate_config(&json!({"api_key": "k", "base_url": "ftp://nope"}))
            .unwrap_err();
        assert!(err.to_string().contains("ftp://nope"));
    }

    #[test]
    fn test_forbidden_keeps_body() {
        let body = r#"{"type":"error","error":{"type":"permission_error","message":"Monthly quota exceeded"}}"#;
        match error_for_status(StatusCode::FORBIDDEN, None, body.to_string()) {
            ProviderError::Api { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "Monthly quota exceeded");
            }
            other => panic!("expected Api, got {other:?}"),
        }
        assert!(matches!(
            error_for_status(StatusCode::UNAUTHORIZED, None, String::new()),
            ProviderError::Unauthorized
        ));
        assert!(matches!(
            error_for_status(StatusCode::TOO_MANY_REQUESTS, Some(Duration::from_secs(3)), String::new()),
            ProviderError::RateLimited { retry_after: Some(d) } if d == Duration::from_secs(3)
        ));
    }

    #[test]
    fn test_retry_after_header() {
        let mut headers = HeaderMap::new();
        headers.insert(reqwest::header::RETRY_AFTER, "7".parse().unwrap());
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(7)));
        assert_eq!(retry_after(&HeaderMap::new()), None);
    }
}

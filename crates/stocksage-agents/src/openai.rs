use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use stocksage_models::ModelConfig;
use tracing::{debug, warn};

use crate::error::AgentError;
use crate::model::{CompletionRequest, LanguageModel};

const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Settings for an OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub max_tokens: u32,
    /// Attempts per completion, including the first.
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>, model: &ModelConfig) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: model
                .api_base
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENAI_API_BASE.to_string()),
            model: model.model.clone(),
            max_tokens: model.max_tokens,
            max_attempts: model.max_attempts.max(1),
            retry_backoff: Duration::from_millis(model.retry_backoff_ms),
        }
    }

    /// Read `OPENAI_API_KEY`, and `OPENAI_API_BASE` when the configuration
    /// does not set a base URL.
    pub fn from_env(model: &ModelConfig) -> Result<Self, AgentError> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            AgentError::ModelUnavailable("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        let mut config = Self::new(api_key, model);
        if model.api_base.is_none() {
            if let Ok(base) = std::env::var("OPENAI_API_BASE") {
                config.api_base = base;
            }
        }
        Ok(config)
    }
}

/// Chat completions over HTTP.
///
/// Rate limiting, server errors and connection failures are retried with a
/// fixed backoff up to `max_attempts`. Authentication and request errors are
/// reported immediately.
pub struct OpenAiChatModel {
    client: Client,
    config: OpenAiConfig,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

enum Attempt {
    Retry(String),
    Fail(AgentError),
}

impl OpenAiChatModel {
    pub fn new(config: OpenAiConfig) -> Result<Self, AgentError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AgentError::ModelUnavailable(format!("HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    async fn attempt(&self, request: &CompletionRequest) -> Result<String, Attempt> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.config.api_base.trim_end_matches('/')
            ))
            .bearer_auth(&self.config.api_key)
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Attempt::Fail(AgentError::ModelTimeout(request.timeout))
                } else if e.is_connect() || e.is_request() {
                    Attempt::Retry(format!("request failed: {e}"))
                } else {
                    Attempt::Fail(AgentError::ModelUnavailable(e.to_string()))
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Attempt::Retry(format!("reading response: {e}")))?;

        if status.is_success() {
            parse_chat_response(&text).map_err(Attempt::Fail)
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Err(Attempt::Fail(AgentError::ModelUnavailable(
                "authentication failed".to_string(),
            )))
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            Err(Attempt::Retry(format!("rate limited: {text}")))
        } else if status.is_server_error() {
            Err(Attempt::Retry(format!("HTTP {status}: {text}")))
        } else {
            Err(Attempt::Fail(AgentError::ModelUnavailable(format!(
                "HTTP {status}: {text}"
            ))))
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiChatModel {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, AgentError> {
        let attempts = self.config.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            debug!(model = %self.config.model, attempt, "Requesting chat completion");
            match self.attempt(request).await {
                Ok(text) => return Ok(text),
                Err(Attempt::Fail(e)) => return Err(e),
                Err(Attempt::Retry(reason)) => {
                    warn!(model = %self.config.model, attempt, reason = %reason, "Completion attempt failed");
                    last_error = reason;
                    if attempt < attempts {
                        tokio::time::sleep(self.config.retry_backoff).await;
                    }
                }
            }
        }

        Err(AgentError::ModelUnavailable(format!(
            "gave up after {attempts} attempts: {last_error}"
        )))
    }
}

/// Extract the first choice's text from a chat completions response body.
pub fn parse_chat_response(body: &str) -> Result<String, AgentError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| AgentError::ModelUnavailable(format!("malformed completion: {e}")))?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AgentError::ModelUnavailable("empty completion".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_uses_model_settings() {
        let model = ModelConfig {
            max_attempts: 0,
            ..Default::default()
        };
        let config = OpenAiConfig::new("sk-test", &model);
        assert_eq!(config.model, "gpt-3.5-turbo");
        assert_eq!(config.api_base, DEFAULT_OPENAI_API_BASE);
        assert_eq!(config.max_attempts, 1);
    }

    #[test]
    fn config_respects_api_base_override() {
        let model = ModelConfig {
            api_base: Some("http://localhost:8000/v1".to_string()),
            ..Default::default()
        };
        assert_eq!(
            OpenAiConfig::new("k", &model).api_base,
            "http://localhost:8000/v1"
        );
    }

    #[test]
    fn parses_first_choice() {
        let body = r#"{
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "  AAPL looks strong.\nPICK: AAPL \n"}, "finish_reason": "stop"}
            ]
        }"#;
        assert_eq!(
            parse_chat_response(body).unwrap(),
            "AAPL looks strong.\nPICK: AAPL"
        );
    }

    #[test]
    fn empty_choices_are_unavailable() {
        assert!(matches!(
            parse_chat_response(r#"{"choices": []}"#),
            Err(AgentError::ModelUnavailable(_))
        ));
        assert!(matches!(
            parse_chat_response(r#"{"choices": [{"message": {"content": null}}]}"#),
            Err(AgentError::ModelUnavailable(_))
        ));
    }

    #[test]
    fn malformed_body_is_unavailable() {
        match parse_chat_response("<html>") {
            Err(AgentError::ModelUnavailable(msg)) => {
                assert!(msg.starts_with("malformed completion"))
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}

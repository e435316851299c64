use std::time::Duration;

use async_trait::async_trait;

use crate::error::AgentError;

/// One chat-style completion: system instructions plus a single user message.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    /// Upper bound on the whole call, retries included.
    pub timeout: Duration,
}

/// Hosted or local language model. Shared across runs; implementations
/// must be stateless apart from connection handling.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> Result<String, AgentError>;
}

/// Call `model`, failing with [`AgentError::ModelTimeout`] once
/// `request.timeout` has elapsed.
pub async fn complete_within_timeout(
    model: &dyn LanguageModel,
    request: &CompletionRequest,
) -> Result<String, AgentError> {
    match tokio::time::timeout(request.timeout, model.complete(request)).await {
        Ok(result) => result,
        Err(_) => Err(AgentError::ModelTimeout(request.timeout)),
    }
}

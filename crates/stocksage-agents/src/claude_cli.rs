use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::AgentError;
use crate::model::{CompletionRequest, LanguageModel};

/// Language model backed by the local `claude` CLI.
///
/// The CLI has no temperature control, so `CompletionRequest::temperature`
/// is ignored.
#[derive(Debug, Clone)]
pub struct ClaudeCliModel {
    pub model: String,
}

impl Default for ClaudeCliModel {
    fn default() -> Self {
        Self {
            model: "claude-3-5-haiku-latest".to_string(),
        }
    }
}

impl ClaudeCliModel {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }
}

#[async_trait]
impl LanguageModel for ClaudeCliModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, AgentError> {
        invoke_claude(&request.system, &request.user, &self.model, request.timeout).await
    }
}

/// Invoke the `claude` CLI with a system prompt and user prompt.
/// Returns the trimmed stdout text.
pub async fn invoke_claude(
    system_prompt: &str,
    user_prompt: &str,
    model: &str,
    timeout: Duration,
) -> Result<String, AgentError> {
    debug!(model = %model, "Invoking claude CLI");

    let result = tokio::time::timeout(timeout, async {
        Command::new("claude")
            .args([
                "-p",
                user_prompt,
                "--system-prompt",
                system_prompt,
                "--model",
                model,
                "--output-format",
                "text",
            ])
            .kill_on_drop(true)
            .output()
            .await
    })
    .await
    .map_err(|_| AgentError::ModelTimeout(timeout))?
    .map_err(|e| AgentError::ModelUnavailable(format!("Failed to spawn claude: {e}")))?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        warn!(status = %result.status, stderr = %stderr, "Claude CLI failed");
        return Err(AgentError::ModelUnavailable(format!(
            "claude exited {}: {}",
            result.status, stderr
        )));
    }

    let stdout = String::from_utf8_lossy(&result.stdout).trim().to_string();
    if stdout.is_empty() {
        return Err(AgentError::ModelUnavailable(
            "Claude returned empty response".to_string(),
        ));
    }

    Ok(stdout)
}

/// Check if the `claude` CLI is available on the system.
pub async fn check_cli_available() -> bool {
    match Command::new("claude").arg("--version").output().await {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use stocksage_models::{AgentRole, AnalysisState, ConversationLog, ModelConfig, SymbolSnapshot};
use tracing::{debug, info};

use crate::error::AgentError;
use crate::model::{complete_within_timeout, CompletionRequest, LanguageModel};
use crate::prompts;

/// A rendered model input plus the short description recorded in the audit log.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
    pub input_summary: String,
}

/// Per-call settings shared by the analysis agents.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub temperature: f32,
    pub timeout: Duration,
    /// Headlines per symbol included in prompts.
    pub max_headlines: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            timeout: Duration::from_secs(30),
            max_headlines: 5,
        }
    }
}

impl AgentSettings {
    pub fn from_config(model: &ModelConfig, max_headlines: usize) -> Self {
        Self {
            temperature: model.temperature,
            timeout: Duration::from_secs(model.timeout_seconds),
            max_headlines,
        }
    }
}

/// One stage of the analysis pipeline backed by a language model. Mockable for testing.
///
/// Agents read the state they are handed and return text; they never write
/// to the state and never retry.
#[async_trait]
pub trait AnalysisAgent: Send + Sync {
    fn role(&self) -> AgentRole;

    /// Build the model input from the fields this agent reads.
    fn render_prompt(&self, state: &AnalysisState) -> Result<Prompt, AgentError>;

    async fn run(
        &self,
        state: &AnalysisState,
        log: &mut ConversationLog,
    ) -> Result<String, AgentError>;
}

/// Send `prompt` to `model` and record the exchange on success.
async fn call_model(
    role: AgentRole,
    model: &dyn LanguageModel,
    settings: &AgentSettings,
    prompt: Prompt,
    log: &mut ConversationLog,
) -> Result<String, AgentError> {
    let request = CompletionRequest {
        system: prompt.system,
        user: prompt.user,
        temperature: settings.temperature,
        timeout: settings.timeout,
    };

    let start = Instant::now();
    debug!(role = %role, model = %model.name(), "Calling language model");
    let output = complete_within_timeout(model, &request).await?;
    let output = output.trim().to_string();
    if output.is_empty() {
        return Err(AgentError::ModelUnavailable(format!(
            "{role} agent received an empty response"
        )));
    }

    info!(
        role = %role,
        elapsed_ms = start.elapsed().as_millis() as u64,
        chars = output.len(),
        "Agent completed"
    );
    log.record(role, prompt.input_summary, output.clone());
    Ok(output)
}

fn focus_snapshot(state: &AnalysisState) -> Result<&SymbolSnapshot, AgentError> {
    state
        .focus_snapshot()
        .ok_or_else(|| AgentError::MissingContext("focus symbol".to_string()))
}

/// Reads every symbol snapshot and names the most promising candidates.
pub struct SuggestionAgent {
    model: Arc<dyn LanguageModel>,
    settings: AgentSettings,
}

impl SuggestionAgent {
    pub fn new(model: Arc<dyn LanguageModel>, settings: AgentSettings) -> Self {
        Self { model, settings }
    }
}

#[async_trait]
impl AnalysisAgent for SuggestionAgent {
    fn role(&self) -> AgentRole {
        AgentRole::Suggestion
    }

    fn render_prompt(&self, state: &AnalysisState) -> Result<Prompt, AgentError> {
        if state.snapshots().is_empty() {
            return Err(AgentError::MissingContext("market data".to_string()));
        }
        Ok(Prompt {
            system: prompts::suggestion_system_prompt(),
            user: prompts::suggestion_user_prompt(state, self.settings.max_headlines),
            input_summary: format!("Analyzed stocks: {}", state.symbols().join(", ")),
        })
    }

    async fn run(
        &self,
        state: &AnalysisState,
        log: &mut ConversationLog,
    ) -> Result<String, AgentError> {
        let prompt = self.render_prompt(state)?;
        call_model(self.role(), self.model.as_ref(), &self.settings, prompt, log).await
    }
}

/// Reads the suggestion and the focus symbol's data; predicts profit and timeframe.
pub struct PredictionAgent {
    model: Arc<dyn LanguageModel>,
    settings: AgentSettings,
}

impl PredictionAgent {
    pub fn new(model: Arc<dyn LanguageModel>, settings: AgentSettings) -> Self {
        Self { model, settings }
    }
}

#[async_trait]
impl AnalysisAgent for PredictionAgent {
    fn role(&self) -> AgentRole {
        AgentRole::Prediction
    }

    fn render_prompt(&self, state: &AnalysisState) -> Result<Prompt, AgentError> {
        let suggestion = state
            .suggestion()
            .ok_or_else(|| AgentError::MissingContext("suggestion".to_string()))?;
        let snapshot = focus_snapshot(state)?;
        Ok(Prompt {
            system: prompts::prediction_system_prompt(),
            user: prompts::prediction_user_prompt(
                suggestion,
                snapshot,
                self.settings.max_headlines,
            ),
            input_summary: format!("Predicted performance for {}", snapshot.symbol()),
        })
    }

    async fn run(
        &self,
        state: &AnalysisState,
        log: &mut ConversationLog,
    ) -> Result<String, AgentError> {
        let prompt = self.render_prompt(state)?;
        call_model(self.role(), self.model.as_ref(), &self.settings, prompt, log).await
    }
}

/// Reads the prediction and the focus symbol's data; lists risks and alternatives.
pub struct CriticAgent {
    model: Arc<dyn LanguageModel>,
    settings: AgentSettings,
}

impl CriticAgent {
    pub fn new(model: Arc<dyn LanguageModel>, settings: AgentSettings) -> Self {
        Self { model, settings }
    }
}

#[async_trait]
impl AnalysisAgent for CriticAgent {
    fn role(&self) -> AgentRole {
        AgentRole::Critique
    }

    fn render_prompt(&self, state: &AnalysisState) -> Result<Prompt, AgentError> {
        let prediction = state
            .prediction()
            .ok_or_else(|| AgentError::MissingContext("prediction".to_string()))?;
        let snapshot = focus_snapshot(state)?;
        Ok(Prompt {
            system: prompts::critique_system_prompt(),
            user: prompts::critique_user_prompt(
                prediction,
                snapshot,
                self.settings.max_headlines,
            ),
            input_summary: format!("Critiqued the prediction for {}", snapshot.symbol()),
        })
    }

    async fn run(
        &self,
        state: &AnalysisState,
        log: &mut ConversationLog,
    ) -> Result<String, AgentError> {
        let prompt = self.render_prompt(state)?;
        call_model(self.role(), self.model.as_ref(), &self.settings, prompt, log).await
    }
}

pub mod agent;
pub mod claude_cli;
pub mod error;
pub mod model;
pub mod openai;
pub mod orchestrator;
pub mod prompts;
pub mod symbols;

pub mod test_support;

pub use agent::{AgentSettings, AnalysisAgent, CriticAgent, PredictionAgent, Prompt, SuggestionAgent};
pub use claude_cli::ClaudeCliModel;
pub use error::{AgentError, AnalysisError};
pub use model::{complete_within_timeout, CompletionRequest, LanguageModel};
pub use openai::{OpenAiChatModel, OpenAiConfig};
pub use orchestrator::{AgentSet, Orchestrator};
pub use symbols::{normalize_symbols, resolve_focus_symbol, Resolution};

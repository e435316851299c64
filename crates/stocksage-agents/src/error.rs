use std::time::Duration;

use stocksage_models::{AgentRole, RunStage, StateError};
use thiserror::Error;

/// Failures of a single language-model backed agent call.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Language model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Language model call timed out after {}s", .0.as_secs_f64())]
    ModelTimeout(Duration),

    #[error("Agent input not ready: {0}")]
    MissingContext(String),
}

/// Why an analysis run did not produce a result.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("No symbols to analyze")]
    NoSymbols,

    #[error("Market data unavailable for every requested symbol: {}", .symbols.join(", "))]
    AllSymbolsFailed { symbols: Vec<String> },

    #[error("{role} agent failed after stage `{stage}`: {source}")]
    Agent {
        stage: RunStage,
        role: AgentRole,
        #[source]
        source: AgentError,
    },

    #[error("Analysis state error: {0}")]
    State(#[from] StateError),

    #[error("Analysis cancelled after stage `{stage}`")]
    Cancelled { stage: RunStage },
}

impl AnalysisError {
    /// The last stage the run completed before failing.
    pub fn stage(&self) -> RunStage {
        match self {
            AnalysisError::NoSymbols | AnalysisError::AllSymbolsFailed { .. } => RunStage::Init,
            AnalysisError::Agent { stage, .. } | AnalysisError::Cancelled { stage } => *stage,
            AnalysisError::State(_) => RunStage::Failed,
        }
    }
}

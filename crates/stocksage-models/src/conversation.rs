use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The analysis roles that call the language model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Suggestion,
    Prediction,
    Critique,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Suggestion => "suggestion",
            AgentRole::Prediction => "prediction",
            AgentRole::Critique => "critique",
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One model exchange recorded for audit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    pub role: AgentRole,
    /// Short description of what the agent was given.
    pub input_summary: String,
    pub output: String,
    pub recorded_at: DateTime<Utc>,
}

/// Run-scoped record of agent exchanges.
///
/// Created per orchestration run and handed to each agent call by reference.
/// A disabled log accepts records and drops them.
#[derive(Debug, Clone, Default)]
pub struct ConversationLog {
    enabled: bool,
    entries: Vec<AuditEntry>,
}

impl ConversationLog {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: Vec::new(),
        }
    }

    pub fn disabled() -> Self {
        Self::new(false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn record(
        &mut self,
        role: AgentRole,
        input_summary: impl Into<String>,
        output: impl Into<String>,
    ) {
        if !self.enabled {
            return;
        }
        self.entries.push(AuditEntry {
            role,
            input_summary: input_summary.into(),
            output: output.into(),
            recorded_at: Utc::now(),
        });
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn for_role(&self, role: AgentRole) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter().filter(move |e| e.role == role)
    }

    pub fn into_entries(self) -> Vec<AuditEntry> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_log_records_in_order() {
        let mut log = ConversationLog::new(true);
        log.record(AgentRole::Suggestion, "Analyzed AAPL, MSFT", "AAPL looks strong");
        log.record(AgentRole::Prediction, "Predicted AAPL", "+8% in 3 months");

        assert_eq!(log.entries().len(), 2);
        assert_eq!(log.entries()[0].role, AgentRole::Suggestion);
        assert_eq!(log.for_role(AgentRole::Prediction).count(), 1);
        assert_eq!(log.for_role(AgentRole::Critique).count(), 0);
    }

    #[test]
    fn disabled_log_drops_records() {
        let mut log = ConversationLog::disabled();
        log.record(AgentRole::Critique, "input", "output");
        assert!(log.entries().is_empty());
        assert!(!log.is_enabled());
    }

    #[test]
    fn role_serialization() {
        assert_eq!(
            serde_json::to_string(&AgentRole::Critique).unwrap(),
            "\"critique\""
        );
    }
}

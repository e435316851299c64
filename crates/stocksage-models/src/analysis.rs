use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::company::{CompanyProfile, NewsItem};
use crate::conversation::{AuditEntry, ConversationLog};
use crate::error::StateError;
use crate::forecast::{Forecast, SignalRow};
use crate::price::PriceSeries;

/// Pipeline position of an orchestration run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Init,
    DataFetched,
    Forecasted,
    Suggested,
    Predicted,
    Critiqued,
    Done,
    Failed,
}

impl std::fmt::Display for RunStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunStage::Init => "init",
            RunStage::DataFetched => "data_fetched",
            RunStage::Forecasted => "forecasted",
            RunStage::Suggested => "suggested",
            RunStage::Predicted => "predicted",
            RunStage::Critiqued => "critiqued",
            RunStage::Done => "done",
            RunStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// The write-once fields of an [`AnalysisState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateField {
    Forecast,
    Suggestion,
    FocusSymbol,
    Prediction,
    Critique,
}

impl std::fmt::Display for StateField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StateField::Forecast => "forecast",
            StateField::Suggestion => "suggestion",
            StateField::FocusSymbol => "focus_symbol",
            StateField::Prediction => "prediction",
            StateField::Critique => "critique",
        };
        f.write_str(name)
    }
}

/// Forecast output attached to a symbol.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SymbolForecast {
    pub forecast: Forecast,
    pub signals: Vec<SignalRow>,
}

impl SymbolForecast {
    /// Signal rows for dates after the last observation.
    pub fn future_signals(&self) -> &[SignalRow] {
        let start = self.forecast.history_len.min(self.signals.len());
        &self.signals[start..]
    }
}

/// Everything fetched for one symbol during a run.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SymbolSnapshot {
    pub prices: PriceSeries,
    pub profile: Option<CompanyProfile>,
    pub news: Vec<NewsItem>,
    pub forecast: Option<SymbolForecast>,
}

impl SymbolSnapshot {
    pub fn new(prices: PriceSeries) -> Self {
        Self {
            prices,
            profile: None,
            news: Vec::new(),
            forecast: None,
        }
    }

    pub fn symbol(&self) -> &str {
        self.prices.symbol()
    }
}

/// State threaded through a single orchestration run.
///
/// Market data is fixed at construction. The remaining fields are populated
/// in pipeline order, each exactly once: every `with_*` consumes the state and
/// returns a new one with one more field set.
#[derive(Debug, Clone)]
pub struct AnalysisState {
    run_id: Uuid,
    requested: Vec<String>,
    snapshots: Vec<SymbolSnapshot>,
    focus_symbol: Option<String>,
    suggestion: Option<String>,
    prediction: Option<String>,
    critique: Option<String>,
}

impl AnalysisState {
    pub fn new(run_id: Uuid, requested: Vec<String>, snapshots: Vec<SymbolSnapshot>) -> Self {
        Self {
            run_id,
            requested,
            snapshots,
            focus_symbol: None,
            suggestion: None,
            prediction: None,
            critique: None,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn requested(&self) -> &[String] {
        &self.requested
    }

    pub fn snapshots(&self) -> &[SymbolSnapshot] {
        &self.snapshots
    }

    pub fn symbols(&self) -> Vec<String> {
        self.snapshots.iter().map(|s| s.symbol().to_string()).collect()
    }

    pub fn snapshot(&self, symbol: &str) -> Option<&SymbolSnapshot> {
        self.snapshots.iter().find(|s| s.symbol() == symbol)
    }

    pub fn focus_symbol(&self) -> Option<&str> {
        self.focus_symbol.as_deref()
    }

    pub fn focus_snapshot(&self) -> Option<&SymbolSnapshot> {
        self.focus_symbol().and_then(|s| self.snapshot(s))
    }

    pub fn suggestion(&self) -> Option<&str> {
        self.suggestion.as_deref()
    }

    pub fn prediction(&self) -> Option<&str> {
        self.prediction.as_deref()
    }

    pub fn critique(&self) -> Option<&str> {
        self.critique.as_deref()
    }

    /// Attach a forecast to one symbol. Only allowed before the suggestion stage.
    pub fn with_forecast(
        mut self,
        symbol: &str,
        forecast: SymbolForecast,
    ) -> Result<Self, StateError> {
        if self.suggestion.is_some() {
            return Err(StateError::TooLate {
                field: StateField::Forecast,
                after: StateField::Suggestion,
            });
        }
        let snapshot = self
            .snapshots
            .iter_mut()
            .find(|s| s.symbol() == symbol)
            .ok_or_else(|| StateError::UnknownSymbol(symbol.to_string()))?;
        if snapshot.forecast.is_some() {
            return Err(StateError::AlreadySet(StateField::Forecast));
        }
        snapshot.forecast = Some(forecast);
        Ok(self)
    }

    pub fn with_suggestion(mut self, text: String) -> Result<Self, StateError> {
        if self.suggestion.is_some() {
            return Err(StateError::AlreadySet(StateField::Suggestion));
        }
        self.suggestion = Some(text);
        Ok(self)
    }

    pub fn with_focus_symbol(mut self, symbol: String) -> Result<Self, StateError> {
        if self.focus_symbol.is_some() {
            return Err(StateError::AlreadySet(StateField::FocusSymbol));
        }
        if self.suggestion.is_none() {
            return Err(StateError::OutOfOrder {
                field: StateField::FocusSymbol,
                missing: StateField::Suggestion,
            });
        }
        if self.snapshot(&symbol).is_none() {
            return Err(StateError::UnknownSymbol(symbol));
        }
        self.focus_symbol = Some(symbol);
        Ok(self)
    }

    pub fn with_prediction(mut self, text: String) -> Result<Self, StateError> {
        if self.prediction.is_some() {
            return Err(StateError::AlreadySet(StateField::Prediction));
        }
        if self.focus_symbol.is_none() {
            return Err(StateError::OutOfOrder {
                field: StateField::Prediction,
                missing: StateField::FocusSymbol,
            });
        }
        self.prediction = Some(text);
        Ok(self)
    }

    pub fn with_critique(mut self, text: String) -> Result<Self, StateError> {
        if self.critique.is_some() {
            return Err(StateError::AlreadySet(StateField::Critique));
        }
        if self.prediction.is_none() {
            return Err(StateError::OutOfOrder {
                field: StateField::Critique,
                missing: StateField::Prediction,
            });
        }
        self.critique = Some(text);
        Ok(self)
    }

    /// Freeze a fully populated state into the caller-facing result.
    pub fn finish(
        self,
        conversation: ConversationLog,
        elapsed: Duration,
    ) -> Result<AnalysisResult, StateError> {
        let focus_symbol = self
            .focus_symbol
            .ok_or(StateError::Incomplete(StateField::FocusSymbol))?;
        let suggestion = self
            .suggestion
            .ok_or(StateError::Incomplete(StateField::Suggestion))?;
        let prediction = self
            .prediction
            .ok_or(StateError::Incomplete(StateField::Prediction))?;
        let critique = self
            .critique
            .ok_or(StateError::Incomplete(StateField::Critique))?;

        let signals = self
            .snapshots
            .iter()
            .find(|s| s.symbol() == focus_symbol)
            .and_then(|s| s.forecast.as_ref())
            .map(|f| f.future_signals().to_vec())
            .unwrap_or_default();

        Ok(AnalysisResult {
            run_id: self.run_id,
            symbols: self
                .snapshots
                .iter()
                .map(|s| s.symbol().to_string())
                .collect(),
            focus_symbol,
            suggestion,
            prediction,
            critique,
            signals,
            conversation: conversation.into_entries(),
            processing_time_ms: elapsed.as_millis() as u64,
            completed_at: Utc::now(),
        })
    }
}

/// Final output of a successful run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub run_id: Uuid,
    /// Symbols whose market data was available for the run.
    pub symbols: Vec<String>,
    /// Symbol the prediction and critique are about.
    pub focus_symbol: String,
    pub suggestion: String,
    pub prediction: String,
    pub critique: String,
    /// Forward-looking signal rows for the focus symbol (empty without a forecast).
    #[serde(default)]
    pub signals: Vec<SignalRow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conversation: Vec<AuditEntry>,
    pub processing_time_ms: u64,
    pub completed_at: DateTime<Utc>,
}

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration as ChronoDuration, Utc};
use stocksage_forecast::{derive_signals, ForecastError, ForecastModel};
use stocksage_market::MarketDataProvider;
use stocksage_models::{
    AnalysisResult, AnalysisState, ConversationLog, RunStage, StateError, StateField,
    StockSageConfig, SymbolForecast, SymbolSnapshot,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::agent::{AgentSettings, AnalysisAgent, CriticAgent, PredictionAgent, SuggestionAgent};
use crate::error::AnalysisError;
use crate::model::LanguageModel;
use crate::symbols::{normalize_symbols, resolve_focus_symbol, Resolution};

/// The three agents a run calls, in pipeline order.
#[derive(Clone)]
pub struct AgentSet {
    pub suggestion: Arc<dyn AnalysisAgent>,
    pub prediction: Arc<dyn AnalysisAgent>,
    pub critic: Arc<dyn AnalysisAgent>,
}

impl AgentSet {
    /// Suggestion, prediction and critic agents sharing one model.
    pub fn from_model(model: Arc<dyn LanguageModel>, settings: AgentSettings) -> Self {
        Self {
            suggestion: Arc::new(SuggestionAgent::new(model.clone(), settings.clone())),
            prediction: Arc::new(PredictionAgent::new(model.clone(), settings.clone())),
            critic: Arc::new(CriticAgent::new(model, settings)),
        }
    }
}

/// Drives one analysis run through fetch, forecast, suggest, predict and critique.
///
/// Holds only shared, immutable collaborators. Every run gets its own state,
/// conversation log and cancellation token, so one orchestrator can serve
/// concurrent runs from behind an `Arc`.
pub struct Orchestrator {
    provider: Arc<dyn MarketDataProvider>,
    forecaster: Option<ForecastModel>,
    agents: AgentSet,
    config: StockSageConfig,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        model: Arc<dyn LanguageModel>,
        config: StockSageConfig,
    ) -> Result<Self, ForecastError> {
        let settings = AgentSettings::from_config(&config.model, config.pipeline.max_headlines);
        Self::with_agents(provider, AgentSet::from_model(model, settings), config)
    }

    pub fn with_agents(
        provider: Arc<dyn MarketDataProvider>,
        agents: AgentSet,
        config: StockSageConfig,
    ) -> Result<Self, ForecastError> {
        let forecaster = if config.forecast.enabled {
            Some(ForecastModel::new(config.forecast.clone())?)
        } else {
            None
        };
        Ok(Self {
            provider,
            forecaster,
            agents,
            config,
        })
    }

    pub fn config(&self) -> &StockSageConfig {
        &self.config
    }

    pub async fn analyze<S: AsRef<str>>(
        &self,
        symbols: &[S],
    ) -> Result<AnalysisResult, AnalysisError> {
        self.analyze_with_cancel(symbols, CancellationToken::new())
            .await
    }

    /// Run the pipeline; cancelling `token` aborts the in-flight step of this
    /// run only.
    pub async fn analyze_with_cancel<S: AsRef<str>>(
        &self,
        symbols: &[S],
        token: CancellationToken,
    ) -> Result<AnalysisResult, AnalysisError> {
        let start = Instant::now();
        let run_id = Uuid::new_v4();
        let requested = normalize_symbols(symbols);
        if requested.is_empty() {
            return Err(AnalysisError::NoSymbols);
        }
        info!(run_id = %run_id, symbols = ?requested, "Starting analysis");

        let result = self.run(run_id, requested, &token, start).await;
        match &result {
            Ok(r) => info!(
                run_id = %run_id,
                focus = %r.focus_symbol,
                elapsed_ms = r.processing_time_ms,
                "Analysis complete"
            ),
            Err(e) => warn!(run_id = %run_id, stage = %e.stage(), error = %e, "Analysis failed"),
        }
        result
    }

    async fn run(
        &self,
        run_id: Uuid,
        requested: Vec<String>,
        token: &CancellationToken,
        start: Instant,
    ) -> Result<AnalysisResult, AnalysisError> {
        // 1. Market data
        let snapshots = self.fetch_all(run_id, &requested, token).await?;
        if snapshots.is_empty() {
            return Err(AnalysisError::AllSymbolsFailed { symbols: requested });
        }
        let mut stage = RunStage::DataFetched;
        let mut state = AnalysisState::new(run_id, requested, snapshots);
        info!(run_id = %run_id, stage = %stage, symbols = ?state.symbols(), "Market data ready");

        // 2. Forecasts
        if let Some(model) = &self.forecaster {
            state = self.forecast_all(run_id, model, state, token)?;
            stage = RunStage::Forecasted;
        }

        let mut log = ConversationLog::new(self.config.pipeline.audit_log);

        // 3. Suggestion and focus symbol
        let suggestion = self
            .call_agent(&self.agents.suggestion, &state, &mut log, stage, token)
            .await?;
        state = state.with_suggestion(suggestion)?;
        let (focus, how) = focus_for(&state)?;
        info!(run_id = %run_id, focus = %focus, resolution = ?how, "Focus symbol resolved");
        state = state.with_focus_symbol(focus)?;
        stage = RunStage::Suggested;

        // 4. Prediction
        let prediction = self
            .call_agent(&self.agents.prediction, &state, &mut log, stage, token)
            .await?;
        state = state.with_prediction(prediction)?;
        stage = RunStage::Predicted;

        // 5. Critique
        let critique = self
            .call_agent(&self.agents.critic, &state, &mut log, stage, token)
            .await?;
        state = state.with_critique(critique)?;

        Ok(state.finish(log, start.elapsed())?)
    }

    async fn fetch_all(
        &self,
        run_id: Uuid,
        symbols: &[String],
        token: &CancellationToken,
    ) -> Result<Vec<SymbolSnapshot>, AnalysisError> {
        let market = &self.config.market;
        let pipeline = &self.config.pipeline;
        let mut snapshots = Vec::with_capacity(symbols.len());

        for symbol in symbols {
            let prices = guarded(
                token,
                RunStage::Init,
                self.provider.fetch_prices(symbol, market.lookback_days),
            )
            .await?;
            let prices = match prices {
                Ok(series) => series,
                Err(e) => {
                    warn!(run_id = %run_id, symbol = %symbol, error = %e, "Dropping symbol, no price data");
                    continue;
                }
            };
            let mut snapshot = SymbolSnapshot::new(prices);

            if pipeline.include_company_info {
                match guarded(token, RunStage::Init, self.provider.fetch_company_info(symbol))
                    .await?
                {
                    Ok(profile) => snapshot.profile = Some(profile),
                    Err(e) => {
                        warn!(run_id = %run_id, symbol = %symbol, error = %e, "Company profile unavailable")
                    }
                }
            }

            if pipeline.include_news {
                let to = Utc::now().date_naive();
                let from = to - ChronoDuration::days(i64::from(market.news_days));
                snapshot.news = guarded(
                    token,
                    RunStage::Init,
                    self.provider.fetch_news(symbol, from, to),
                )
                .await?;
            }

            info!(
                run_id = %run_id,
                symbol = %symbol,
                candles = snapshot.prices.len(),
                headlines = snapshot.news.len(),
                "Fetched market data"
            );
            snapshots.push(snapshot);
        }

        Ok(snapshots)
    }

    fn forecast_all(
        &self,
        run_id: Uuid,
        model: &ForecastModel,
        mut state: AnalysisState,
        token: &CancellationToken,
    ) -> Result<AnalysisState, AnalysisError> {
        let horizon = self.config.forecast.horizon_days;
        for symbol in state.symbols() {
            if token.is_cancelled() {
                return Err(AnalysisError::Cancelled {
                    stage: RunStage::DataFetched,
                });
            }
            let Some(snapshot) = state.snapshot(&symbol) else {
                continue;
            };
            let fitted = match model.fit(&snapshot.prices) {
                Ok(fitted) => fitted,
                Err(e) => {
                    warn!(run_id = %run_id, symbol = %symbol, error = %e, "Skipping forecast");
                    continue;
                }
            };
            let forecast = fitted.forecast(horizon);
            let signals = derive_signals(&forecast.points);
            info!(
                run_id = %run_id,
                symbol = %symbol,
                horizon_days = horizon,
                sigma = fitted.residual_sigma(),
                "Forecast ready"
            );
            state = state.with_forecast(&symbol, SymbolForecast { forecast, signals })?;
        }
        Ok(state)
    }

    async fn call_agent(
        &self,
        agent: &Arc<dyn AnalysisAgent>,
        state: &AnalysisState,
        log: &mut ConversationLog,
        stage: RunStage,
        token: &CancellationToken,
    ) -> Result<String, AnalysisError> {
        let role = agent.role();
        info!(run_id = %state.run_id(), role = %role, stage = %stage, "Running agent");
        guarded(token, stage, agent.run(state, log))
            .await?
            .map_err(|source| AnalysisError::Agent {
                stage,
                role,
                source,
            })
    }
}

/// Pick the focus symbol from the suggestion and the surviving symbols.
fn focus_for(state: &AnalysisState) -> Result<(String, Resolution), AnalysisError> {
    state
        .suggestion()
        .and_then(|text| resolve_focus_symbol(text, &state.symbols()))
        .ok_or(StateError::Incomplete(StateField::FocusSymbol).into())
}

/// Await `fut` unless `token` fires first.
async fn guarded<F: Future>(
    token: &CancellationToken,
    stage: RunStage,
    fut: F,
) -> Result<F::Output, AnalysisError> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(AnalysisError::Cancelled { stage }),
        out = fut => Ok(out),
    }
}

//! StockSage - multi-agent stock analysis
//!
//! Fetches daily prices, company profiles and news from Finnhub, fits a
//! trend-plus-seasonality forecaster with BUY/SELL/HOLD signals, and runs a
//! suggestion, prediction and critique pass through a language model.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! # async fn run() -> anyhow::Result<()> {
//! let config = stocksage::load_config(None)?;
//! let orchestrator = stocksage::build_orchestrator(&config)?;
//! let result = stocksage::analyze(&orchestrator, &["AAPL", "MSFT"], Default::default()).await?;
//! println!("{}", result.critique);
//! # Ok(())
//! # }
//! ```

pub use stocksage_agents as agents;
pub use stocksage_forecast as forecast;
pub use stocksage_market as market;
pub use stocksage_models as models;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::Serialize;
use stocksage_agents::{
    AnalysisError, ClaudeCliModel, LanguageModel, OpenAiChatModel, OpenAiConfig, Orchestrator,
};
use stocksage_forecast::{backtest, derive_signals, ForecastModel};
use stocksage_market::{CachingProvider, FinnhubClient, MarketDataProvider};
use stocksage_models::{
    AnalysisResult, MarketConfig, ModelConfig, ModelProviderKind, PerformanceMetrics, SignalRow,
    StockSageConfig,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Read configuration from `path`, or use defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<StockSageConfig> {
    let Some(path) = path else {
        return Ok(StockSageConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("Failed to parse config: {}", path.display()))
}

/// Finnhub client from `FINNHUB_API_KEY`, behind a price cache unless the TTL is zero.
pub fn build_provider(config: &MarketConfig) -> anyhow::Result<Arc<dyn MarketDataProvider>> {
    let client = FinnhubClient::from_env(config).context("Failed to create Finnhub client")?;
    if config.cache_ttl_seconds == 0 {
        return Ok(Arc::new(client));
    }
    Ok(Arc::new(CachingProvider::new(
        client,
        config.cache_max_capacity,
        Duration::from_secs(config.cache_ttl_seconds),
    )))
}

pub fn build_model(config: &ModelConfig) -> anyhow::Result<Arc<dyn LanguageModel>> {
    let model: Arc<dyn LanguageModel> = match config.provider {
        ModelProviderKind::Openai => {
            let openai = OpenAiConfig::from_env(config).context("Failed to configure OpenAI")?;
            Arc::new(OpenAiChatModel::new(openai)?)
        }
        ModelProviderKind::ClaudeCli => Arc::new(ClaudeCliModel::new(config.model.clone())),
    };
    info!(provider = ?config.provider, model = %model.name(), "Language model ready");
    Ok(model)
}

/// Build an Orchestrator from configuration.
pub fn build_orchestrator(config: &StockSageConfig) -> anyhow::Result<Orchestrator> {
    let provider = build_provider(&config.market)?;
    let model = build_model(&config.model)?;
    Orchestrator::new(provider, model, config.clone()).context("Invalid forecast configuration")
}

/// Run one analysis; cancelling `token` aborts it.
pub async fn analyze<S: AsRef<str>>(
    orchestrator: &Orchestrator,
    symbols: &[S],
    token: CancellationToken,
) -> Result<AnalysisResult, AnalysisError> {
    orchestrator.analyze_with_cancel(symbols, token).await
}

/// Output of the forecaster alone for one symbol.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastReport {
    pub symbol: String,
    pub history_len: usize,
    pub horizon_days: u32,
    pub residual_sigma: f64,
    /// Every historical and future row.
    pub signals: Vec<SignalRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backtest: Option<PerformanceMetrics>,
}

/// Fetch prices for `symbol`, fit the forecaster and derive signals.
///
/// `backtest_days` additionally scores the model on that many trailing
/// observations.
pub async fn forecast_symbol(
    provider: &dyn MarketDataProvider,
    config: &StockSageConfig,
    symbol: &str,
    horizon_days: u32,
    backtest_days: Option<usize>,
) -> anyhow::Result<ForecastReport> {
    let symbol = symbol.trim().to_uppercase();
    let series = provider
        .fetch_prices(&symbol, config.market.lookback_days)
        .await
        .with_context(|| format!("Failed to fetch prices for {symbol}"))?;

    let model = ForecastModel::new(config.forecast.clone())?;
    let fitted = model
        .fit(&series)
        .with_context(|| format!("Failed to fit forecast for {symbol}"))?;
    let forecast = fitted.forecast(horizon_days);
    let signals = derive_signals(&forecast.points);

    let backtest = match backtest_days {
        Some(days) => Some(
            backtest(&model, &series, days)
                .with_context(|| format!("Backtest over {days} observations failed"))?,
        ),
        None => None,
    };

    Ok(ForecastReport {
        symbol,
        history_len: forecast.history_len,
        horizon_days,
        residual_sigma: fitted.residual_sigma(),
        signals,
        backtest,
    })
}

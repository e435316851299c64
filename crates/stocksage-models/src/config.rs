use serde::{Deserialize, Serialize};

/// Top-level configuration for StockSage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StockSageConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Which language-model transport the agents use.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModelProviderKind {
    /// OpenAI-compatible `/chat/completions` endpoint.
    #[default]
    Openai,
    /// Local `claude` CLI.
    ClaudeCli,
}

/// Configuration for the language-model calls made by the analysis agents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    #[serde(default)]
    pub provider: ModelProviderKind,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Upper bound on a single model call, in seconds.
    #[serde(default = "default_model_timeout")]
    pub timeout_seconds: u64,
    /// Override for the OpenAI-compatible base URL. Falls back to `OPENAI_API_BASE`.
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Attempts per model call made by the transport (1 = no retry).
    #[serde(default = "default_model_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_model_backoff")]
    pub retry_backoff_ms: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: ModelProviderKind::default(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_seconds: default_model_timeout(),
            api_base: None,
            max_tokens: default_max_tokens(),
            max_attempts: default_model_attempts(),
            retry_backoff_ms: default_model_backoff(),
        }
    }
}

/// Configuration for the market data provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketConfig {
    #[serde(default = "default_market_api_base")]
    pub api_base: String,
    /// Calendar days of daily candles to fetch per symbol.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    /// Calendar days of company news to include.
    #[serde(default = "default_news_days")]
    pub news_days: u32,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Attempts per market data request before the symbol is treated as missing.
    #[serde(default = "default_fetch_attempts")]
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Maximum number of price series held in the in-memory cache.
    #[serde(default = "default_cache_capacity")]
    pub cache_max_capacity: u64,
    /// How long a fetched price series is reused, in seconds. 0 disables caching.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            api_base: default_market_api_base(),
            lookback_days: default_lookback_days(),
            news_days: default_news_days(),
            request_timeout_seconds: default_request_timeout(),
            max_attempts: default_fetch_attempts(),
            retry_delay_ms: default_retry_delay(),
            cache_max_capacity: default_cache_capacity(),
            cache_ttl_seconds: default_cache_ttl(),
        }
    }
}

/// Configuration for the seasonal trend forecaster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForecastConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
    #[serde(default = "default_true")]
    pub yearly_seasonality: bool,
    #[serde(default = "default_true")]
    pub weekly_seasonality: bool,
    #[serde(default = "default_true")]
    pub daily_seasonality: bool,
    /// Coverage of the uncertainty band, in (0, 1).
    #[serde(default = "default_interval_width")]
    pub interval_width: f64,
    #[serde(default = "default_changepoints")]
    pub n_changepoints: usize,
    /// Share of the history in which trend changepoints may be placed.
    #[serde(default = "default_changepoint_range")]
    pub changepoint_range: f64,
    /// Scale of the prior on trend rate changes; smaller values give a stiffer trend.
    #[serde(default = "default_changepoint_prior_scale")]
    pub changepoint_prior_scale: f64,
    #[serde(default = "default_seasonality_prior_scale")]
    pub seasonality_prior_scale: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            horizon_days: default_horizon_days(),
            yearly_seasonality: true,
            weekly_seasonality: true,
            daily_seasonality: true,
            interval_width: default_interval_width(),
            n_changepoints: default_changepoints(),
            changepoint_range: default_changepoint_range(),
            changepoint_prior_scale: default_changepoint_prior_scale(),
            seasonality_prior_scale: default_seasonality_prior_scale(),
        }
    }
}

/// Orchestration switches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Attach the per-role conversation log to the result.
    #[serde(default)]
    pub audit_log: bool,
    #[serde(default = "default_true")]
    pub include_company_info: bool,
    #[serde(default = "default_true")]
    pub include_news: bool,
    /// Maximum headlines per symbol passed to the agents.
    #[serde(default = "default_max_headlines")]
    pub max_headlines: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            audit_log: false,
            include_company_info: true,
            include_news: true,
            max_headlines: default_max_headlines(),
        }
    }
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_model_timeout() -> u64 {
    30
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_model_attempts() -> u32 {
    2
}
fn default_model_backoff() -> u64 {
    1000
}
fn default_market_api_base() -> String {
    "https://finnhub.io/api/v1".to_string()
}
fn default_lookback_days() -> u32 {
    730
}
fn default_news_days() -> u32 {
    30
}
fn default_request_timeout() -> u64 {
    10
}
fn default_fetch_attempts() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    1000
}
fn default_cache_capacity() -> u64 {
    1_000
}
fn default_cache_ttl() -> u64 {
    300
}
fn default_horizon_days() -> u32 {
    30
}
fn default_interval_width() -> f64 {
    0.95
}
fn default_changepoints() -> usize {
    25
}
fn default_changepoint_range() -> f64 {
    0.8
}
fn default_changepoint_prior_scale() -> f64 {
    0.05
}
fn default_seasonality_prior_scale() -> f64 {
    10.0
}
fn default_max_headlines() -> usize {
    5
}
fn default_true() -> bool {
    true
}

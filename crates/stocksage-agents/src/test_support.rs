//! Test support: a scripted language model and an in-memory market data provider.
//!
//! `ScriptedModel` recognises which agent is calling from the system prompt and
//! answers the way a well-behaved model would: the suggestion names one of the
//! candidates listed in the prompt, the prediction and critique name the focus
//! symbol. Individual roles can be told to fail, time out or hang.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use stocksage_market::{MarketDataProvider, MarketError};
use stocksage_models::{
    AgentRole, Candle, CompanyProfile, NewsItem, PriceSeries, StockSageConfig,
};
use tokio::sync::Mutex;

use crate::error::AgentError;
use crate::model::{CompletionRequest, LanguageModel};
use crate::prompts;

/// Daily candles on consecutive calendar days from 2024-01-01, drifting
/// upward with a small weekly wiggle.
pub fn sample_series(symbol: &str, days: usize, start_price: f64) -> PriceSeries {
    let candles = (0..days)
        .map(|i| {
            let close = start_price * (1.0 + 0.002 * i as f64) + ((i % 7) as f64 - 3.0) * 0.1;
            Candle {
                timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                    + chrono::Duration::days(i as i64),
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000_000 + (i as u64) * 1_000,
            }
        })
        .collect();
    PriceSeries::new(symbol, candles).expect("sample candles are finite")
}

/// Defaults with settings suited to short sample series: no yearly
/// seasonality, a two week horizon and audit logging on.
pub fn test_config() -> StockSageConfig {
    let mut config = StockSageConfig::default();
    config.forecast.yearly_seasonality = false;
    config.forecast.horizon_days = 14;
    config.pipeline.audit_log = true;
    config
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    Unavailable,
    Timeout,
    Hang,
}

/// A completion request as the scripted model saw it.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// `None` when the system prompt matched no agent.
    pub role: Option<AgentRole>,
    pub request: CompletionRequest,
}

pub struct ScriptedModel {
    replies: HashMap<AgentRole, String>,
    failures: HashMap<AgentRole, Failure>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl Default for ScriptedModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            replies: HashMap::new(),
            failures: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer `role` with `text` instead of the generated reply.
    pub fn with_reply(mut self, role: AgentRole, text: impl Into<String>) -> Self {
        self.replies.insert(role, text.into());
        self
    }

    pub fn fail_on(mut self, role: AgentRole) -> Self {
        self.failures.insert(role, Failure::Unavailable);
        self
    }

    /// Report a transport timeout for `role` without waiting.
    pub fn time_out_on(mut self, role: AgentRole) -> Self {
        self.failures.insert(role, Failure::Timeout);
        self
    }

    /// Never answer `role`.
    pub fn hang_on(mut self, role: AgentRole) -> Self {
        self.failures.insert(role, Failure::Hang);
        self
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    pub async fn roles(&self) -> Vec<Option<AgentRole>> {
        self.calls.lock().await.iter().map(|c| c.role).collect()
    }

    fn detect_role(system: &str) -> Option<AgentRole> {
        if system == prompts::suggestion_system_prompt() {
            Some(AgentRole::Suggestion)
        } else if system == prompts::prediction_system_prompt() {
            Some(AgentRole::Prediction)
        } else if system == prompts::critique_system_prompt() {
            Some(AgentRole::Critique)
        } else {
            None
        }
    }

    fn generated_reply(role: AgentRole, user: &str) -> String {
        match role {
            AgentRole::Suggestion => {
                let pick = user
                    .rsplit_once("using one of: ")
                    .and_then(|(_, list)| list.split(',').next())
                    .map(|s| s.trim().trim_end_matches('.').to_string())
                    .unwrap_or_else(|| "AAPL".to_string());
                format!(
                    "{pick} shows the steadiest uptrend of the group with rising volume.\n\
                     {} {pick}",
                    prompts::PICK_PREFIX
                )
            }
            AgentRole::Prediction => {
                let symbol = focus_from(user, "Based on the data for ");
                format!(
                    "{symbol}: expected profit +6.5% over 30 days, supported by the \
                     forecast trend and recent BUY signals. Confidence moderate."
                )
            }
            AgentRole::Critique => {
                let symbol = focus_from(user, "Review this prediction for ");
                format!(
                    "{symbol}: the prediction underweights valuation risk and a possible \
                     sector rotation. A flat scenario is about as likely as the upside case."
                )
            }
        }
    }
}

fn focus_from(user: &str, marker: &str) -> String {
    user.split_once(marker)
        .and_then(|(_, rest)| rest.split([' ', ',']).next())
        .unwrap_or("UNKNOWN")
        .to_string()
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, AgentError> {
        let role = Self::detect_role(&request.system);
        self.calls.lock().await.push(RecordedCall {
            role,
            request: request.clone(),
        });

        let Some(role) = role else {
            return Ok("ok".to_string());
        };
        match self.failures.get(&role) {
            Some(Failure::Unavailable) => {
                return Err(AgentError::ModelUnavailable(format!(
                    "scripted failure for {role}"
                )))
            }
            Some(Failure::Timeout) => return Err(AgentError::ModelTimeout(request.timeout)),
            Some(Failure::Hang) => std::future::pending::<()>().await,
            None => {}
        }

        Ok(self
            .replies
            .get(&role)
            .cloned()
            .unwrap_or_else(|| Self::generated_reply(role, &request.user)))
    }
}

/// In-memory provider. Unknown symbols are `NotFound`.
#[derive(Default)]
pub struct StaticProvider {
    series: HashMap<String, PriceSeries>,
    profiles: HashMap<String, CompanyProfile>,
    news: HashMap<String, Vec<NewsItem>>,
    transient: HashSet<String>,
    delay: Option<Duration>,
    price_calls: AtomicUsize,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// 90 days of sample prices, a profile and one headline per symbol.
    pub fn with_samples(symbols: &[&str]) -> Self {
        symbols
            .iter()
            .enumerate()
            .fold(Self::new(), |provider, (i, symbol)| {
                provider
                    .with_series(sample_series(symbol, 90, 100.0 + 50.0 * i as f64))
                    .with_profile(CompanyProfile {
                        ticker: symbol.to_string(),
                        name: Some(format!("{symbol} Corp")),
                        industry: Some("Technology".to_string()),
                        currency: Some("USD".to_string()),
                        market_capitalization: Some(1_000_000.0),
                        ..Default::default()
                    })
                    .with_news(
                        symbol,
                        vec![NewsItem {
                            headline: format!("{symbol} beats earnings estimates"),
                            summary: String::new(),
                            datetime: Utc.with_ymd_and_hms(2024, 3, 28, 14, 0, 0).unwrap(),
                            source: "Reuters".to_string(),
                            url: None,
                        }],
                    )
            })
    }

    pub fn with_series(mut self, series: PriceSeries) -> Self {
        self.series.insert(series.symbol().to_string(), series);
        self
    }

    pub fn with_profile(mut self, profile: CompanyProfile) -> Self {
        self.profiles.insert(profile.ticker.clone(), profile);
        self
    }

    pub fn with_news(mut self, symbol: &str, items: Vec<NewsItem>) -> Self {
        self.news.insert(symbol.to_string(), items);
        self
    }

    /// Price requests for `symbol` fail as if retries were exhausted.
    pub fn with_transient_failure(mut self, symbol: &str) -> Self {
        self.transient.insert(symbol.to_string());
        self
    }

    /// Sleep before answering every request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn price_calls(&self) -> usize {
        self.price_calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl MarketDataProvider for StaticProvider {
    async fn fetch_prices(
        &self,
        symbol: &str,
        _lookback_days: u32,
    ) -> Result<PriceSeries, MarketError> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.transient.contains(symbol) {
            return Err(MarketError::Transient {
                attempts: 3,
                message: "connection reset".to_string(),
            });
        }
        self.series
            .get(symbol)
            .cloned()
            .ok_or_else(|| MarketError::NotFound(symbol.to_string()))
    }

    async fn fetch_company_info(&self, symbol: &str) -> Result<CompanyProfile, MarketError> {
        self.pause().await;
        self.profiles
            .get(symbol)
            .cloned()
            .ok_or_else(|| MarketError::NotFound(symbol.to_string()))
    }

    async fn fetch_news(&self, symbol: &str, _from: NaiveDate, _to: NaiveDate) -> Vec<NewsItem> {
        self.pause().await;
        self.news.get(symbol).cloned().unwrap_or_default()
    }
}

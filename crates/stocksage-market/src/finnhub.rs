use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use stocksage_models::{Candle, CompanyProfile, MarketConfig, NewsItem, PriceSeries};
use tracing::{debug, info, warn};

use crate::error::MarketError;
use crate::provider::MarketDataProvider;
use crate::retry::RetryPolicy;

/// Finnhub REST client.
///
/// Cheap to share: the underlying `reqwest::Client` pools connections and
/// the client carries no per-request state.
pub struct FinnhubClient {
    client: Client,
    api_base: String,
    api_key: String,
    retry: RetryPolicy,
}

impl FinnhubClient {
    pub fn new(api_key: impl Into<String>, config: &MarketConfig) -> Result<Self, MarketError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(MarketError::Config("Finnhub API key is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            retry: RetryPolicy::new(
                config.max_attempts,
                Duration::from_millis(config.retry_delay_ms),
            ),
        })
    }

    /// Read the API key from `FINNHUB_API_KEY`.
    pub fn from_env(config: &MarketConfig) -> Result<Self, MarketError> {
        let api_key = std::env::var("FINNHUB_API_KEY").map_err(|_| {
            MarketError::Config("FINNHUB_API_KEY environment variable not set".to_string())
        })?;
        Self::new(api_key, config)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn get_text(&self, path: &str, query: &[(&str, String)]) -> Result<String, MarketError> {
        let url = format!("{}/{}", self.api_base, path);
        debug!(url = %url, "Finnhub request");

        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[("token", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(MarketError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MarketError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.text().await?)
    }

    async fn get_with_retry(
        &self,
        path: &'static str,
        query: Vec<(&str, String)>,
    ) -> Result<String, MarketError> {
        let query = &query;
        let this = self;
        self.retry
            .execute(path, move || this.get_text(path, query))
            .await
    }
}

#[async_trait]
impl MarketDataProvider for FinnhubClient {
    async fn fetch_prices(
        &self,
        symbol: &str,
        lookback_days: u32,
    ) -> Result<PriceSeries, MarketError> {
        let to = Utc::now();
        let from = to - chrono::Duration::days(i64::from(lookback_days));
        let query = vec![
            ("symbol", symbol.to_string()),
            ("resolution", "D".to_string()),
            ("from", from.timestamp().to_string()),
            ("to", to.timestamp().to_string()),
        ];

        let body = self.get_with_retry("stock/candle", query).await?;
        let series = parse_candles(symbol, &body)?;
        info!(symbol, candles = series.len(), "Fetched daily candles");
        Ok(series)
    }

    async fn fetch_company_info(&self, symbol: &str) -> Result<CompanyProfile, MarketError> {
        let query = vec![("symbol", symbol.to_string())];
        let body = self.get_with_retry("stock/profile2", query).await?;
        parse_profile(symbol, &body)
    }

    async fn fetch_news(&self, symbol: &str, from: NaiveDate, to: NaiveDate) -> Vec<NewsItem> {
        let query = vec![
            ("symbol", symbol.to_string()),
            ("from", from.format("%Y-%m-%d").to_string()),
            ("to", to.format("%Y-%m-%d").to_string()),
        ];

        match self.get_with_retry("company-news", query).await {
            Ok(body) => match parse_news(&body) {
                Ok(items) => items,
                Err(e) => {
                    warn!(symbol, error = %e, "Discarding unparseable company news");
                    Vec::new()
                }
            },
            Err(e) => {
                warn!(symbol, error = %e, "Company news unavailable");
                Vec::new()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct CandleResponse {
    s: String,
    #[serde(default)]
    t: Vec<i64>,
    #[serde(default)]
    o: Vec<f64>,
    #[serde(default)]
    h: Vec<f64>,
    #[serde(default)]
    l: Vec<f64>,
    #[serde(default)]
    c: Vec<f64>,
    #[serde(default)]
    v: Vec<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    #[serde(default)]
    ticker: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    exchange: Option<String>,
    #[serde(default)]
    finnhub_industry: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    market_capitalization: Option<f64>,
    #[serde(default)]
    share_outstanding: Option<f64>,
    #[serde(default)]
    ipo: Option<String>,
    #[serde(default)]
    weburl: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    datetime: i64,
    headline: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    url: Option<String>,
}

/// Convert a `/stock/candle` payload into a price series.
pub fn parse_candles(symbol: &str, body: &str) -> Result<PriceSeries, MarketError> {
    let response: CandleResponse = serde_json::from_str(body)?;
    match response.s.as_str() {
        "ok" => {}
        "no_data" => return Err(MarketError::NotFound(symbol.to_string())),
        other => return Err(MarketError::Api(format!("unexpected candle status `{other}`"))),
    }

    let n = response.t.len();
    let lengths = [
        response.o.len(),
        response.h.len(),
        response.l.len(),
        response.c.len(),
        response.v.len(),
    ];
    if lengths.iter().any(|&len| len != n) {
        return Err(MarketError::Api(format!(
            "candle arrays for {symbol} have mismatched lengths"
        )));
    }
    if n == 0 {
        return Err(MarketError::NotFound(symbol.to_string()));
    }

    let mut candles = Vec::with_capacity(n);
    for i in 0..n {
        let timestamp = DateTime::from_timestamp(response.t[i], 0).ok_or_else(|| {
            MarketError::Api(format!("invalid candle timestamp {}", response.t[i]))
        })?;
        candles.push(Candle {
            timestamp,
            open: response.o[i],
            high: response.h[i],
            low: response.l[i],
            close: response.c[i],
            volume: response.v[i].max(0.0) as u64,
        });
    }

    Ok(PriceSeries::new(symbol, candles)?)
}

/// Convert a `/stock/profile2` payload. Unknown symbols come back as `{}`.
pub fn parse_profile(symbol: &str, body: &str) -> Result<CompanyProfile, MarketError> {
    let response: ProfileResponse = serde_json::from_str(body)?;
    let ticker = match response.ticker {
        Some(t) if !t.is_empty() => t,
        _ => return Err(MarketError::NotFound(symbol.to_string())),
    };

    Ok(CompanyProfile {
        ticker,
        name: response.name,
        exchange: response.exchange,
        industry: response.finnhub_industry,
        country: response.country,
        currency: response.currency,
        market_capitalization: response.market_capitalization,
        share_outstanding: response.share_outstanding,
        ipo: response.ipo,
        weburl: response.weburl,
    })
}

/// Convert a `/company-news` payload, newest first.
pub fn parse_news(body: &str) -> Result<Vec<NewsItem>, MarketError> {
    let response: Vec<NewsResponse> = serde_json::from_str(body)?;
    let mut items: Vec<NewsItem> = response
        .into_iter()
        .filter_map(|n| {
            let datetime = DateTime::<Utc>::from_timestamp(n.datetime, 0)?;
            Some(NewsItem {
                headline: n.headline,
                summary: n.summary,
                datetime,
                source: n.source,
                url: n.url.filter(|u| !u.is_empty()),
            })
        })
        .collect();
    items.sort_by(|a, b| b.datetime.cmp(&a.datetime));
    Ok(items)
}

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use stocksage_models::{CompanyProfile, NewsItem, PriceSeries};

use crate::error::MarketError;

/// Source of daily prices, company profiles and news.
///
/// Implementations are shared between concurrent runs and must not hold
/// run-specific state.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Daily candles covering the last `lookback_days` calendar days.
    async fn fetch_prices(
        &self,
        symbol: &str,
        lookback_days: u32,
    ) -> Result<PriceSeries, MarketError>;

    async fn fetch_company_info(&self, symbol: &str) -> Result<CompanyProfile, MarketError>;

    /// Company news between `from` and `to` inclusive. Failures yield an empty list.
    async fn fetch_news(&self, symbol: &str, from: NaiveDate, to: NaiveDate) -> Vec<NewsItem>;
}

#[async_trait]
impl<P: MarketDataProvider + ?Sized> MarketDataProvider for Arc<P> {
    async fn fetch_prices(
        &self,
        symbol: &str,
        lookback_days: u32,
    ) -> Result<PriceSeries, MarketError> {
        (**self).fetch_prices(symbol, lookback_days).await
    }

    async fn fetch_company_info(&self, symbol: &str) -> Result<CompanyProfile, MarketError> {
        (**self).fetch_company_info(symbol).await
    }

    async fn fetch_news(&self, symbol: &str, from: NaiveDate, to: NaiveDate) -> Vec<NewsItem> {
        (**self).fetch_news(symbol, from, to).await
    }
}

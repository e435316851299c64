use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use stocksage_models::{CompanyProfile, NewsItem, PriceSeries};
use tracing::debug;

use crate::error::MarketError;
use crate::memory::MemoryCache;
use crate::provider::MarketDataProvider;

/// Read-through cache in front of another provider.
///
/// Price series and company profiles are cached per symbol (and lookback for
/// prices). Misses go to the inner provider and successful results are
/// promoted. Errors are never cached. News is always fetched fresh.
pub struct CachingProvider<P> {
    inner: P,
    prices: MemoryCache<Arc<PriceSeries>>,
    profiles: MemoryCache<Arc<CompanyProfile>>,
}

impl<P: MarketDataProvider> CachingProvider<P> {
    pub fn new(inner: P, max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner,
            prices: MemoryCache::new(max_capacity, ttl),
            profiles: MemoryCache::new(max_capacity, ttl),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Number of cached price series.
    pub fn cached_series(&self) -> u64 {
        self.prices.entry_count()
    }

    fn price_key(symbol: &str, lookback_days: u32) -> String {
        format!("prices:{symbol}:{lookback_days}")
    }
}

#[async_trait]
impl<P: MarketDataProvider> MarketDataProvider for CachingProvider<P> {
    async fn fetch_prices(
        &self,
        symbol: &str,
        lookback_days: u32,
    ) -> Result<PriceSeries, MarketError> {
        let (series, lookup) = self
            .prices
            .get_or_fetch(Self::price_key(symbol, lookback_days), || async {
                self.inner
                    .fetch_prices(symbol, lookback_days)
                    .await
                    .map(Arc::new)
            })
            .await?;
        debug!(symbol, lookback_days, ?lookup, "Price series lookup");
        Ok((*series).clone())
    }

    async fn fetch_company_info(&self, symbol: &str) -> Result<CompanyProfile, MarketError> {
        let (profile, _) = self
            .profiles
            .get_or_fetch(symbol.to_string(), || async {
                self.inner.fetch_company_info(symbol).await.map(Arc::new)
            })
            .await?;
        Ok((*profile).clone())
    }

    async fn fetch_news(&self, symbol: &str, from: NaiveDate, to: NaiveDate) -> Vec<NewsItem> {
        self.inner.fetch_news(symbol, from, to).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicU32, Ordering};
    use stocksage_models::Candle;

    #[derive(Default)]
    struct CountingProvider {
        price_calls: AtomicU32,
        profile_calls: AtomicU32,
    }

    #[async_trait]
    impl MarketDataProvider for CountingProvider {
        async fn fetch_prices(
            &self,
            symbol: &str,
            _lookback_days: u32,
        ) -> Result<PriceSeries, MarketError> {
            self.price_calls.fetch_add(1, Ordering::SeqCst);
            if symbol == "MISSING" {
                return Err(MarketError::NotFound(symbol.to_string()));
            }
            let candle = Candle {
                timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
                volume: 1,
            };
            Ok(PriceSeries::new(symbol, vec![candle])?)
        }

        async fn fetch_company_info(&self, symbol: &str) -> Result<CompanyProfile, MarketError> {
            self.profile_calls.fetch_add(1, Ordering::SeqCst);
            Ok(CompanyProfile {
                ticker: symbol.to_string(),
                ..Default::default()
            })
        }

        async fn fetch_news(&self, _: &str, _: NaiveDate, _: NaiveDate) -> Vec<NewsItem> {
            Vec::new()
        }
    }

    fn provider() -> CachingProvider<CountingProvider> {
        CachingProvider::new(
            CountingProvider::default(),
            100,
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn repeated_fetch_hits_cache() {
        let provider = provider();

        let first = provider.fetch_prices("AAPL", 730).await.unwrap();
        let second = provider.fetch_prices("AAPL", 730).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.inner().price_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn lookback_is_part_of_the_key() {
        let provider = provider();

        provider.fetch_prices("AAPL", 730).await.unwrap();
        provider.fetch_prices("AAPL", 365).await.unwrap();

        assert_eq!(provider.inner().price_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let provider = provider();

        assert!(provider.fetch_prices("MISSING", 730).await.is_err());
        assert!(provider.fetch_prices("MISSING", 730).await.is_err());

        assert_eq!(provider.inner().price_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn profiles_are_cached() {
        let provider = provider();

        provider.fetch_company_info("MSFT").await.unwrap();
        provider.fetch_company_info("MSFT").await.unwrap();

        assert_eq!(provider.inner().profile_calls.load(Ordering::SeqCst), 1);
    }
}

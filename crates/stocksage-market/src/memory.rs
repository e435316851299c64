use std::future::Future;
use std::time::Duration;

use moka::future::Cache;

/// Where a [`MemoryCache::get_or_fetch`] value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Hit,
    Miss,
}

/// TTL cache keyed by string, backed by moka.
///
/// Values are cloned out on read; store `Arc`s for anything large.
pub struct MemoryCache<V: Clone + Send + Sync + 'static> {
    inner: Cache<String, V>,
}

impl<V: Clone + Send + Sync + 'static> MemoryCache<V> {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        self.inner.get(key).await
    }

    pub async fn insert(&self, key: String, value: V) {
        self.inner.insert(key, value).await;
    }

    /// Serve `key` from the cache, or run `fetch` and keep its value.
    /// Errors pass through and leave the cache untouched.
    pub async fn get_or_fetch<E, F, Fut>(&self, key: String, fetch: F) -> Result<(V, Lookup), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.inner.get(&key).await {
            return Ok((value, Lookup::Hit));
        }
        let value = fetch().await?;
        self.inner.insert(key, value.clone()).await;
        Ok((value, Lookup::Miss))
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

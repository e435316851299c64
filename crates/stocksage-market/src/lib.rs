pub mod cache;
pub mod error;
pub mod finnhub;
pub mod memory;
pub mod provider;
pub mod retry;

pub use cache::CachingProvider;
pub use error::MarketError;
pub use finnhub::FinnhubClient;
pub use memory::MemoryCache;
pub use provider::MarketDataProvider;
pub use retry::RetryPolicy;

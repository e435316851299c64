pub mod analysis;
pub mod company;
pub mod config;
pub mod conversation;
pub mod error;
pub mod forecast;
pub mod price;

pub use analysis::{
    AnalysisResult, AnalysisState, RunStage, StateField, SymbolForecast, SymbolSnapshot,
};
pub use company::{CompanyProfile, NewsItem};
pub use config::{
    ForecastConfig, MarketConfig, ModelConfig, ModelProviderKind, PipelineConfig, StockSageConfig,
};
pub use conversation::{AgentRole, AuditEntry, ConversationLog};
pub use error::{SeriesError, StateError};
pub use forecast::{Forecast, ForecastPoint, PerformanceMetrics, Signal, SignalRow};
pub use price::{Candle, PriceSeries, PriceSummary};

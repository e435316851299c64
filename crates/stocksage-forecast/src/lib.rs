pub mod backtest;
pub mod error;
pub mod features;
pub mod metrics;
pub mod model;
pub mod quantile;
pub mod signals;

pub use backtest::backtest;
pub use error::ForecastError;
pub use features::Seasonality;
pub use metrics::performance_metrics;
pub use model::{FittedModel, ForecastModel};
pub use signals::derive_signals;

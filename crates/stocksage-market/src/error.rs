use stocksage_models::SeriesError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketError {
    #[error("Market data request failed after {attempts} attempts: {message}")]
    Transient { attempts: u32, message: String },

    #[error("No market data for {0}")]
    NotFound(String),

    #[error("Market data API rejected the API key")]
    Unauthorized,

    #[error("Market data API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed market data response: {0}")]
    Api(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid price series: {0}")]
    Series(#[from] SeriesError),

    #[error("Market data configuration error: {0}")]
    Config(String),
}

impl MarketError {
    /// Whether another attempt at the same request could succeed.
    ///
    /// Connection failures, timeouts, rate limiting and server errors are
    /// transient. Everything else is a property of the request itself.
    pub fn is_retryable(&self) -> bool {
        match self {
            MarketError::Http(e) => e.is_timeout() || e.is_connect(),
            MarketError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

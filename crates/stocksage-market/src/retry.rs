use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::MarketError;

/// Bounded retry with a fixed delay between attempts.
///
/// Only errors for which [`MarketError::is_retryable`] holds are retried.
/// When the budget runs out the last error is reported as
/// [`MarketError::Transient`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub async fn execute<F, Fut, T>(&self, operation: &str, mut f: F) -> Result<T, MarketError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, MarketError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match f().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "Request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt >= attempts => {
                    warn!(operation, attempts, error = %e, "Retry budget exhausted");
                    return Err(MarketError::Transient {
                        attempts,
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(operation, attempt, error = %e, "Transient failure, retrying");
                    tokio::time::sleep(self.delay).await;
                }
            }
        }
    }
}

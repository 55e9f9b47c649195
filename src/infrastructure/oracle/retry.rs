//! Retry policy with exponential backoff for oracle requests.
//!
//! Backoff doubles with each retry up to a configured cap. Only transient
//! errors (rate limits, 5xx, network faults, timeouts) are retried;
//! client errors and malformed responses fail immediately.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::domain::ports::OracleError;

/// Retry policy configuration for oracle calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_backoff_ms: u64,
    max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 2_000,
            max_backoff_ms: 60_000,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy.
    pub fn new(max_retries: u32, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff_ms: initial_backoff_ms.max(1),
            max_backoff_ms: max_backoff_ms.max(initial_backoff_ms.max(1)),
        }
    }

    /// Execute `operation`, retrying transient errors with backoff.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, OracleError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, OracleError>>,
    {
        let mut attempt = 0u32;
        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!("oracle call succeeded after {attempt} retries");
                    }
                    return Ok(result);
                }
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    let backoff = self.backoff_for(attempt);
                    warn!(
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "transient oracle error; retrying"
                    );
                    sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => {
                    if attempt >= self.max_retries && err.is_transient() {
                        return Err(OracleError::RetriesExhausted {
                            attempts: attempt + 1,
                            last_error: err.to_string(),
                        });
                    }
                    debug!(error = %err, "permanent oracle error; not retrying");
                    return Err(err);
                }
            }
        }
    }

    /// Backoff duration for the given 0-based attempt: doubled each time,
    /// capped at the maximum.
    fn backoff_for(&self, attempt: u32) -> Duration {
        let exp = attempt.min(20);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

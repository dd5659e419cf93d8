//! Retry policy for feed fetches
//!
//! Backoff is capped exponential without jitter: the delay before attempt `n`
//! (n >= 2) is `min(base_delay * 2^(n-2), max_delay)`.

use crate::config::RetryConfig;
use crate::crawler::FetchError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    /// Retries immediately; used where waiting would only slow things down
    pub fn without_delay(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    /// Delay to wait before `attempt` (1-based); zero for the first attempt
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt < 2 {
            return Duration::ZERO;
        }

        let factor = 1u32.checked_shl(attempt - 2).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Runs `operation` until it succeeds or `max_attempts` calls have failed
    ///
    /// The closure receives the 1-based attempt number. After the last failed
    /// attempt the error is wrapped in `FetchError::RetriesExhausted`.
    pub async fn run<T, F, Fut>(&self, url: &str, mut operation: F) -> Result<T, FetchError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 1;

        loop {
            let delay = self.delay_before(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts => {
                    warn!(
                        "Attempt {}/{} for {} failed: {}",
                        attempt, self.max_attempts, url, e
                    );
                    attempt += 1;
                }
                Err(e) => {
                    return Err(FetchError::RetriesExhausted {
                        url: url.to_string(),
                        attempts: attempt,
                        source: Box::new(e),
                    })
                }
            }
        }
    }
}

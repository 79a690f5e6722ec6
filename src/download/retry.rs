//! Caller-side retry policy for fetches.
//!
//! The fetcher itself never retries. Callers that want another attempt wrap
//! the call in a [`RetryExecutor`], which only repeats errors that report
//! themselves as retryable.

use crate::error::GrabError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Attempts after the first one
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Ceiling for the backoff delay
    pub max_delay: Duration,
    /// Backoff multiplier
    pub backoff_multiplier: f64,
    /// Jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl RetryConfig {
    /// Default backoff with `max_retries` extra attempts
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Delay after the given (zero-based) failed attempt, before jitter
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.max(1.0).powi(attempt as i32);
        let millis = self.initial_delay.as_millis() as f64 * factor;
        Duration::from_millis(millis as u64).min(self.max_delay)
    }

    fn jittered(&self, delay: Duration) -> Duration {
        let factor = self.jitter_factor.clamp(0.0, 1.0);
        if factor == 0.0 {
            return delay;
        }
        let spread = delay.as_millis() as f64 * factor;
        delay + Duration::from_millis((rand::random::<f64>() * spread) as u64)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

/// Runs an operation until it succeeds, fails terminally, or runs out of attempts
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run `operation`, retrying errors for which `is_retryable()` holds
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, GrabError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GrabError>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.config.jittered(self.config.backoff(attempt));
                    attempt += 1;
                    warn!(
                        "Attempt {} failed: {}. Retrying in {}",
                        attempt,
                        e,
                        humantime::format_duration(delay)
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

//! Retry policy for opening a stream.
//!
//! The streaming client never retries by itself. Callers wrap the
//! request/stream-creation call in [`RetryPolicy::run`] (or [`with_retry`]),
//! which re-issues the whole call with exponential backoff while the error is
//! retryable and attempts remain. Errors raised after the stream has started
//! are not covered: partial output has already been handed to the caller.

use std::future::Future;
use std::time::Duration;

use crate::error::{LlmError, Result};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    retryable: fn(&LlmError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            retryable: LlmError::is_retryable,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Replace the predicate deciding which errors are worth another attempt
    pub fn retry_if(mut self, predicate: fn(&LlmError) -> bool) -> Self {
        self.retryable = predicate;
        self
    }

    pub fn is_retryable(&self, error: &LlmError) -> bool {
        (self.retryable)(error)
    }

    /// Delay before retry number `retry` (0 for the first retry)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let base = self.base_delay.as_millis() as f64;
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let delay_ms = (base * self.multiplier.powi(exponent)).min(self.max_delay.as_millis() as f64);

        Duration::from_millis(delay_ms as u64).min(self.max_delay)
    }

    pub async fn run<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts && self.is_retryable(&e) => {
                    let delay = self.delay_for(attempt - 1);

                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying after error"
                    );

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Free-function form of [`RetryPolicy::run`]
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    policy.run(operation).await
}

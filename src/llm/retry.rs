//! Bounded exponential-backoff retry for transient failures.

use super::error::LlmError;
use crate::config::RetryConfig;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Decides whether a failed attempt may be retried.
pub type RetryPredicate = fn(&LlmError) -> bool;

/// Retry policy for a single outbound call sequence.
///
/// Waits happen with `tokio::time::sleep`, so a backing-off request only
/// suspends its own task.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    retryable: RetryPredicate,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay(),
            max_delay: config.max_delay(),
            retryable: LlmError::is_transient,
        }
    }

    /// Override which failures are retried.
    ///
    /// `ServiceUnavailable` is never retried regardless of the predicate:
    /// an open breaker ends the whole sequence.
    pub fn with_predicate(mut self, retryable: RetryPredicate) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay waited after failed attempt `attempt` (1-indexed) before the next one.
    ///
    /// `min(max_delay, base_delay * 2^(attempt - 1))`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let delay = self
            .base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_delay);
        delay.min(self.max_delay)
    }

    fn should_retry(&self, error: &LlmError) -> bool {
        !matches!(error, LlmError::ServiceUnavailable(_)) && (self.retryable)(error)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or
    /// `max_attempts` attempts have been made. The last error is returned
    /// unchanged.
    pub async fn run<F, Fut, T>(&self, op: F) -> Result<T, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        self.run_gated(op, || true).await
    }

    /// Like [`run`](Self::run), but the backoff wait is skipped whenever
    /// `worth_waiting` returns false. The next attempt is still made, so a
    /// gate that has closed in the meantime surfaces its own error.
    pub async fn run_gated<F, Fut, T, G>(&self, mut op: F, worth_waiting: G) -> Result<T, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
        G: Fn() -> bool,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts && self.should_retry(&e) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        kind = %e.kind(),
                        error = %e,
                        "Retrying LLM call after transient failure"
                    );
                    crate::metrics::record_retry(e.kind().as_str());
                    if worth_waiting() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(&RetryConfig::default())
    }
}

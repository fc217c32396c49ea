//! Generic retry executor with exponential backoff.
//!
//! Wraps any async operation whose error type can distinguish transient
//! network-class failures from hard ones. Each attempt re-invokes the
//! operation from scratch; callers that stream partial output must tolerate
//! a duplicated prefix unless the operation is idempotent.

use std::time::Duration;

/// Classifies errors into retryable and not.
pub trait Transient {
    /// True for network/timeout-class failures that a fresh attempt may fix.
    fn is_transient(&self) -> bool;
}

/// Retry policy: attempt count and backoff schedule.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first failure. `max_retries = 3` means up to 4
    /// invocations total.
    pub max_retries: u32,
    /// Delay before the first retry; doubles per subsequent retry.
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
        }
    }

    /// Run `f`, retrying on transient failure with exponential backoff.
    ///
    /// Non-transient errors propagate immediately on first occurrence. After
    /// exhausting retries the final transient error propagates.
    pub async fn run<T, E, F, Fut>(&self, op_name: &str, mut f: F) -> Result<T, E>
    where
        E: Transient,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut delay = self.initial_delay;
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            match f().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !e.is_transient() {
                        return Err(e);
                    }
                    last_error = Some(e);

                    if attempt < self.max_retries {
                        tracing::warn!(
                            op = op_name,
                            attempt = attempt + 1,
                            max_retries = self.max_retries,
                            delay_ms = delay.as_millis() as u64,
                            "transient failure, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }

        tracing::error!(op = op_name, retries = self.max_retries, "retries exhausted");
        Err(last_error.expect("retry loop always records an error before exhausting"))
    }
}

//! Retry with exponential backoff for outbound collaborator calls.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use prospector_shared::{ProspectorError, Result, RetryConfig};

/// Backoff settings applied independently to every collaborator call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Upper bound of the random fraction added to each delay.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter: config.jitter.clamp(0.0, 1.0),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (1-based).
    ///
    /// `jitter_sample` is a uniform draw from `[0, 1)`. A provider hint in
    /// `retry_after` raises the delay but never past `max_delay`.
    pub fn delay_for(
        &self,
        retry: u32,
        jitter_sample: f64,
        retry_after: Option<Duration>,
    ) -> Duration {
        let exponent = retry.saturating_sub(1).min(30) as i32;
        let factor = 2f64.powi(exponent) * (1.0 + self.jitter * jitter_sample.clamp(0.0, 1.0));
        let cap = self.max_delay.as_secs_f64();

        let backoff = Duration::from_secs_f64((self.base_delay.as_secs_f64() * factor).min(cap));
        let hinted = retry_after.map_or(backoff, |hint| backoff.max(hint));
        hinted.min(self.max_delay)
    }

    /// Run `operation` until it succeeds, fails non-transiently, or the
    /// attempt budget is spent.
    ///
    /// Exhaustion yields [`ProspectorError::TransientFailure`] wrapping the
    /// last error. Non-transient errors are returned unchanged.
    pub async fn invoke<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let err = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(label, attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !err.is_transient() {
                return Err(err);
            }

            if attempt >= max_attempts {
                warn!(label, attempts = attempt, error = %err, "retries exhausted");
                return Err(ProspectorError::TransientFailure {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            let sample: f64 = rand::thread_rng().gen_range(0.0..1.0);
            let delay = self.delay_for(attempt, sample, err.retry_after());
            warn!(
                label,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "transient failure, retrying"
            );

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

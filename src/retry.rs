//! Exponential backoff retry engine for provider calls.
//!
//! Classification is a pattern match on [`RewardError::is_retryable`]:
//! server errors, network errors and rate limits retry; everything else
//! fails immediately without consuming retry budget.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::RewardError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first. 1 means no retries.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Adds up to 25% random extra delay per attempt. Off in tests so
    /// delay assertions stay exact.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after the given failed attempt (1-indexed):
    /// `min(max_delay, initial_delay * multiplier^(attempt - 1))`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(63);
        let base = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exp as i32);
        let max = self.max_delay.as_millis() as f64;
        let mut delay_ms = if base.is_finite() { base.min(max) } else { max };

        if self.jitter && delay_ms > 0.0 {
            let factor: f64 = rand::random::<f64>() * 0.25;
            delay_ms = (delay_ms + delay_ms * factor).min(max);
        }

        Duration::from_millis(delay_ms as u64)
    }

    /// Run `operation` until it succeeds, fails non-retryably, or the
    /// attempt budget is spent. The last error is returned as-is.
    pub async fn run<F, Fut, T>(&self, what: &str, mut operation: F) -> Result<T, RewardError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RewardError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) if attempt >= self.max_attempts => {
                    warn!("{} failed after {} attempts: {}", what, attempt, err);
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "{} attempt {}/{} failed ({}), retrying in {:?}",
                        what, attempt, self.max_attempts, err, delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

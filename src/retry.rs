//! Retry with exponential backoff for fallible network calls.
//!
//! The delay before retry `n` (0-based) is `base * 2^n` plus a jitter drawn
//! uniformly from the configured range. Once attempts run out the last error
//! is handed back and the caller decides whether it is fatal.

use crate::error::Result;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Reusable retry policy
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Backoff base, doubled for every retry
    pub base_delay: Duration,
    /// Lower bound of the random jitter added to every backoff
    pub jitter_min: Duration,
    /// Upper bound of the random jitter added to every backoff
    pub jitter_max: Duration,
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        jitter_min: Duration,
        jitter_max: Duration,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            jitter_min: jitter_min.min(jitter_max),
            jitter_max: jitter_max.max(jitter_min),
        }
    }

    /// Policy for the top-level author lookup: 3 attempts.
    pub fn author_lookup() -> Self {
        Self::new(3, Duration::from_secs(1), Duration::from_secs(1), Duration::from_secs(3))
    }

    /// Policy for per-publication detail fetches: 2 attempts.
    pub fn detail_fill() -> Self {
        Self::new(2, Duration::from_secs(1), Duration::from_secs(1), Duration::from_secs(3))
    }

    /// Same attempt budget with all waiting removed.
    pub fn without_delays(self) -> Self {
        Self::new(self.max_attempts, Duration::ZERO, Duration::ZERO, Duration::ZERO)
    }

    /// Delay to wait after the failed attempt number `attempt` (0-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponential = self.base_delay.saturating_mul(2u32.saturating_pow(attempt));
        exponential.saturating_add(random_between(self.jitter_min, self.jitter_max))
    }

    /// Run `op` until it succeeds, fails with a non-transient error, or attempts run out.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(call = label, attempt = attempt + 1, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) if attempt + 1 >= self.max_attempts => {
                    warn!(
                        call = label,
                        attempts = self.max_attempts,
                        error = %e,
                        "Retries exhausted"
                    );
                    return Err(e);
                }
                Err(e) => {
                    let wait = self.backoff_delay(attempt);
                    warn!(
                        call = label,
                        attempt = attempt + 1,
                        wait_ms = wait.as_millis() as u64,
                        error = %e,
                        "Attempt failed, backing off"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Uniform random duration in `[min, max]` at millisecond resolution.
pub(crate) fn random_between(min: Duration, max: Duration) -> Duration {
    let lo = min.as_millis() as u64;
    let hi = max.as_millis() as u64;
    if hi <= lo {
        return min;
    }
    Duration::from_millis(rand::thread_rng().gen_range(lo..=hi))
}

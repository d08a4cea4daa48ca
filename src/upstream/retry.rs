//! Retry-with-backoff policy for outbound calls
//!
//! Every outbound call in the crate goes through one [`RetryPolicy`]
//! instead of a bespoke loop per call site. Transient failures are retried
//! with exponential backoff (base doubling each attempt, capped); fatal
//! failures short-circuit. The whole envelope — attempts plus backoff
//! sleeps — is bounded by a per-call deadline.

use std::future::Future;
use std::time::Duration;
use tokio::time;
use tracing::{debug, warn};

use crate::config::UpstreamConfig;
use crate::error::UpstreamError;

/// Retry and deadline policy for a single logical upstream call
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the initial attempt
    max_retries: u32,
    /// First backoff delay; doubles each retry
    base_delay: Duration,
    /// Upper bound on any single backoff delay
    max_delay: Duration,
    /// Overall deadline for the call, independent of the retry envelope
    deadline: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(
        max_retries: u32,
        base_delay: Duration,
        max_delay: Duration,
        deadline: Duration,
    ) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
            deadline,
        }
    }

    /// Build from the upstream configuration section
    #[must_use]
    pub fn from_config(config: &UpstreamConfig) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_secs(config.backoff_base_secs),
            Duration::from_secs(config.backoff_cap_secs),
            Duration::from_secs(config.call_deadline_secs),
        )
    }

    /// Backoff delay before retry number `retry` (zero-based): `base * 2^retry`,
    /// capped at `max_delay`.
    #[must_use]
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.base_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    /// Run `op` under this policy.
    ///
    /// `op` is invoked once, then re-invoked after a backoff sleep for each
    /// transient failure until `max_retries` is consumed. A fatal error is
    /// returned immediately. If the deadline elapses at any point —
    /// including mid-backoff — the call fails with
    /// [`UpstreamError::DeadlineExceeded`] rather than retrying past it.
    pub async fn run<T, F, Fut>(&self, what: &str, op: F) -> Result<T, UpstreamError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        match time::timeout(self.deadline, self.run_attempts(what, op)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("{} call exceeded {:?} deadline", what, self.deadline);
                Err(UpstreamError::DeadlineExceeded)
            }
        }
    }

    async fn run_attempts<T, F, Fut>(&self, what: &str, op: F) -> Result<T, UpstreamError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() => {
                    let retries_used = attempts - 1;
                    if retries_used >= self.max_retries {
                        warn!(
                            "{} failed after {} attempts, giving up: {}",
                            what, attempts, e
                        );
                        return Err(UpstreamError::RetriesExhausted {
                            attempts,
                            source: Box::new(e),
                        });
                    }
                    let delay = self.backoff_delay(retries_used);
                    debug!(
                        "{} attempt {} failed ({}), retrying in {:?}",
                        what, attempts, e, delay
                    );
                    time::sleep(delay).await;
                }
                Err(e) => {
                    warn!("{} failed with non-retryable error: {}", what, e);
                    return Err(e);
                }
            }
        }
    }
}

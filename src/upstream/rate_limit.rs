//! Rate-limit governance for a single upstream client
//!
//! GitHub reports remaining quota on every response. When it drops below
//! the low-water mark, the guard arms a cooldown: the next call waits it
//! out (a tokio sleep, not a busy loop) before being issued, so the client
//! backs off before upstream throttling trips.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{self, Instant};
use tracing::{debug, warn};

use crate::config::UpstreamConfig;

/// Cooldown guard keyed on the upstream's remaining-quota signal
#[derive(Debug)]
pub struct RateLimitGuard {
    low_water: u64,
    cooldown: Duration,
    /// Armed deadline; the next call consumes it
    cooldown_until: Mutex<Option<Instant>>,
}

impl RateLimitGuard {
    #[must_use]
    pub fn new(low_water: u64, cooldown: Duration) -> Self {
        Self {
            low_water,
            cooldown,
            cooldown_until: Mutex::new(None),
        }
    }

    /// Build from the upstream configuration section
    #[must_use]
    pub fn from_config(config: &UpstreamConfig) -> Self {
        Self::new(
            config.rate_limit_low_water,
            Duration::from_secs(config.rate_limit_cooldown_secs),
        )
    }

    /// Wait out an armed cooldown before issuing the next call.
    ///
    /// Consumes the armed deadline; if quota is still low the next
    /// response re-arms it via [`observe_remaining`](Self::observe_remaining).
    pub async fn wait_if_throttled(&self) {
        let deadline = self.cooldown_until.lock().await.take();
        if let Some(deadline) = deadline {
            let now = Instant::now();
            if deadline > now {
                debug!(
                    "rate-limit cooldown active, delaying call by {:?}",
                    deadline - now
                );
                time::sleep_until(deadline).await;
            }
        }
    }

    /// Record the remaining-quota signal from a successful call.
    ///
    /// Arms the cooldown when quota falls below the low-water mark. A
    /// missing signal (endpoints that report none) is a no-op.
    pub async fn observe_remaining(&self, remaining: Option<u64>) {
        let Some(remaining) = remaining else { return };
        if remaining < self.low_water {
            warn!(
                "upstream quota low ({} < {}), arming {:?} cooldown before next call",
                remaining, self.low_water, self.cooldown
            );
            *self.cooldown_until.lock().await = Some(Instant::now() + self.cooldown);
        }
    }
}

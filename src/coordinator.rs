//! Refresh coordination: stale-while-revalidate with single-flight
//!
//! Per-read decision:
//!
//! ```text
//! valid entry    → serve it, no transition
//! expired entry  → serve it AND (if no refresh is in flight) launch one
//!                  asynchronous refresh; concurrent readers never launch
//!                  a second
//! no entry       → blocking refresh; concurrent cold-start callers
//!                  serialize on the same refresh instead of each hitting
//!                  the upstream
//! force refresh  → blocking refresh, staleness checks bypassed
//! ```
//!
//! INVARIANT: at most one aggregator run is in flight at any instant.
//! Every run — background or blocking — executes under `refresh_lock`; the
//! `in_flight` flag is only the cheap gate deciding whether a stale read
//! spawns a task at all.
//!
//! Background refresh failure is recorded in [`RefreshState::last_error`]
//! (observable, not merely logged) and leaves the previous stale entry in
//! place.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time;
use tracing::{debug, info, warn};

use crate::aggregator::Aggregator;
use crate::cache::CacheStore;
use crate::error::{SharedStatsError, StatsError};
use crate::stats::{CacheEntry, Stats};

/// Process-wide refresh state, owned exclusively by the coordinator
#[derive(Debug, Default)]
pub struct RefreshState {
    in_flight: AtomicBool,
    last_error: Mutex<Option<SharedStatsError>>,
}

impl RefreshState {
    /// Whether a refresh is currently running
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Error from the most recent failed refresh, cleared on success
    #[must_use]
    pub fn last_error(&self) -> Option<SharedStatsError> {
        self.last_error.lock().expect("lock poisoned").clone()
    }

    fn record_failure(&self, error: StatsError) {
        *self.last_error.lock().expect("lock poisoned") = Some(Arc::new(error));
    }

    fn record_success(&self) {
        *self.last_error.lock().expect("lock poisoned") = None;
    }
}

/// Clears `in_flight` on drop, so a cancelled blocking refresh (timeout)
/// can never wedge the flag and suppress future background refreshes.
struct InFlightGuard<'a> {
    state: &'a RefreshState,
}

impl<'a> InFlightGuard<'a> {
    fn set(state: &'a RefreshState) -> Self {
        state.in_flight.store(true, Ordering::Release);
        Self { state }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.state.in_flight.store(false, Ordering::Release);
    }
}

/// Decides, per read, whether to serve cached data, revalidate in the
/// background, or block the caller on a synchronous refresh
pub struct RefreshCoordinator {
    cache: Arc<CacheStore>,
    aggregator: Arc<Aggregator>,
    state: RefreshState,
    /// Serializes every aggregator run; the at-most-one-refresh invariant
    refresh_lock: tokio::sync::Mutex<()>,
    ttl_millis: u64,
    blocking_timeout: Duration,
}

impl RefreshCoordinator {
    #[must_use]
    pub fn new(
        cache: Arc<CacheStore>,
        aggregator: Arc<Aggregator>,
        ttl: Duration,
        blocking_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            aggregator,
            state: RefreshState::default(),
            refresh_lock: tokio::sync::Mutex::new(()),
            ttl_millis: ttl.as_millis() as u64,
            blocking_timeout,
        }
    }

    /// Refresh state, for observability and tests
    #[must_use]
    pub fn state(&self) -> &RefreshState {
        &self.state
    }

    /// Resolve one read request per the state machine above
    pub async fn get_stats(self: Arc<Self>, force_refresh: bool) -> Result<Stats, StatsError> {
        if !force_refresh {
            if let Some(entry) = self.cache.read().await {
                if !entry.is_expired(self.ttl_millis) {
                    return Ok(entry.stats);
                }
                // Serve stale immediately; revalidate off the read path
                Arc::clone(&self).spawn_background_refresh();
                return Ok(entry.stats);
            }
        }

        match time::timeout(self.blocking_timeout, self.blocking_refresh(force_refresh)).await {
            Ok(result) => result,
            Err(_) => Err(StatsError::Timeout(self.blocking_timeout)),
        }
    }

    /// Launch one asynchronous refresh if none is in flight.
    ///
    /// The compare-and-swap makes losers no-ops: N concurrent stale reads
    /// spawn exactly one task.
    fn spawn_background_refresh(self: Arc<Self>) {
        if self
            .state
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("refresh already in flight, serving stale without a second run");
            return;
        }

        let this = self;
        let _task = tokio::spawn(async move {
            // Transfer the reserved flag into a drop guard
            let state = &this.state;
            let _in_flight = InFlightGuard { state };

            let _guard = this.refresh_lock.lock().await;

            // A blocking refresh may have landed while we waited; skip the
            // upstream calls if the entry is fresh again
            if let Some(entry) = this.cache.read().await {
                if !entry.is_expired(this.ttl_millis) {
                    debug!("entry already revalidated, skipping background refresh");
                    return;
                }
            }

            match this.run_refresh().await {
                Ok(stats) => {
                    info!(
                        "background refresh complete: {} commits, {} repos, {} stars",
                        stats.commit_count, stats.repo_count, stats.star_count
                    );
                }
                Err(e) => {
                    // Previous stale entry stays in place
                    warn!("background refresh failed, keeping stale entry: {}", e);
                    this.state.record_failure(e);
                }
            }
        });
    }

    /// Blocking refresh for cold start and force-refresh.
    ///
    /// Serializes under `refresh_lock`; cold-start callers that lose the
    /// race are satisfied from the cache the winner just wrote instead of
    /// issuing their own upstream calls.
    async fn blocking_refresh(&self, force_refresh: bool) -> Result<Stats, StatsError> {
        let _guard = self.refresh_lock.lock().await;

        if !force_refresh {
            if let Some(entry) = self.cache.read().await {
                if !entry.is_expired(self.ttl_millis) {
                    return Ok(entry.stats);
                }
            }
        }

        let _in_flight = InFlightGuard::set(&self.state);
        self.run_refresh().await
    }

    /// One aggregator run plus the cache write. Caller must hold
    /// `refresh_lock`.
    async fn run_refresh(&self) -> Result<Stats, StatsError> {
        let last_known = self.cache.read().await.map(|e| e.stats);

        match self.aggregator.aggregate(last_known.as_ref()).await {
            Ok(aggregated) => {
                self.cache.write(CacheEntry::new(aggregated.stats)).await;
                self.state.record_success();
                Ok(aggregated.stats)
            }
            Err(e) => Err(e),
        }
    }
}

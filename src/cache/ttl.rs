//! Pure expiry arithmetic for cache entries
//!
//! Two TTL classes exist: interactive stats (cheap to refetch, 1 hour) and
//! full-history recomputation (expensive upstream walk, 24 hours). The
//! class is configuration, not a second code path.

use std::time::Duration;

/// TTL for the interactive stats class (1 hour)
pub const INTERACTIVE_TTL: Duration = Duration::from_secs(3600);

/// TTL for the full-history class (24 hours)
pub const FULL_HISTORY_TTL: Duration = Duration::from_secs(86_400);

/// Get current timestamp in milliseconds since Unix epoch
#[inline]
#[must_use]
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}

/// Check if an entry fetched at `fetched_at_millis` has outlived
/// `ttl_millis`.
///
/// # Examples
/// ```
/// use gh_stats_cache::cache::ttl::{is_expired, now_millis};
///
/// let now = now_millis();
/// assert!(!is_expired(now, 1000)); // just fetched
///
/// let old = now.saturating_sub(1500);
/// assert!(is_expired(old, 1000)); // 1.5s ago with 1s TTL
/// ```
#[inline]
#[must_use]
pub fn is_expired(fetched_at_millis: u64, ttl_millis: u64) -> bool {
    let elapsed = now_millis().saturating_sub(fetched_at_millis);
    elapsed >= ttl_millis
}

//! Stats snapshot and cache entry types
//!
//! A [`Stats`] value is only ever constructed by the aggregator from a
//! complete or partially-degraded fetch cycle and is never mutated after
//! construction — updates produce a new value.

use serde::{Deserialize, Serialize};

use crate::cache::ttl;

/// Immutable statistics snapshot.
///
/// Timestamps are milliseconds since the Unix epoch, matching the format
/// persisted to the durable tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Total contribution count reported by the contribution service
    pub commit_count: u64,
    /// Number of repositories owned by the profile
    pub repo_count: u64,
    /// Aggregate star count across all repositories
    pub star_count: u64,
    /// When this snapshot was fetched (milliseconds since epoch)
    pub fetched_at_millis: u64,
}

impl Stats {
    /// Create a snapshot stamped with the current time
    #[must_use]
    pub fn now(commit_count: u64, repo_count: u64, star_count: u64) -> Self {
        Self {
            commit_count,
            repo_count,
            star_count,
            fetched_at_millis: ttl::now_millis(),
        }
    }
}

/// Cache entry holding the latest snapshot.
///
/// Expiry is derived, not stored: `fetched_at + ttl` evaluated against the
/// TTL in effect at read time. Entries are superseded, never edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEntry {
    pub stats: Stats,
}

impl CacheEntry {
    #[must_use]
    pub const fn new(stats: Stats) -> Self {
        Self { stats }
    }

    /// Check whether this entry has outlived the given TTL. Pure
    /// comparison, no I/O.
    #[inline]
    #[must_use]
    pub fn is_expired(&self, ttl_millis: u64) -> bool {
        ttl::is_expired(self.stats.fetched_at_millis, ttl_millis)
    }
}

/// On-disk record format for the durable tier.
///
/// Field names match the cache file written by earlier versions of this
/// service (`totalCommits`, `totalRepos`, `totalStars`, `timestamp`) so an
/// existing cache file survives an upgrade.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub(crate) struct DurableRecord {
    #[serde(rename = "totalCommits")]
    pub total_commits: u64,
    #[serde(rename = "totalRepos")]
    pub total_repos: u64,
    #[serde(rename = "totalStars")]
    pub total_stars: u64,
    pub timestamp: u64,
}

impl From<Stats> for DurableRecord {
    fn from(stats: Stats) -> Self {
        Self {
            total_commits: stats.commit_count,
            total_repos: stats.repo_count,
            total_stars: stats.star_count,
            timestamp: stats.fetched_at_millis,
        }
    }
}

impl From<DurableRecord> for Stats {
    fn from(record: DurableRecord) -> Self {
        Self {
            commit_count: record.total_commits,
            repo_count: record.total_repos,
            star_count: record.total_stars,
            fetched_at_millis: record.timestamp,
        }
    }
}

//! Error types for the stats cache
//!
//! Two layers:
//! - [`UpstreamError`] — outcomes of a single outbound call, classified as
//!   transient (retried by the call policy) or fatal (surfaced immediately)
//! - [`StatsError`] — the only error type callers of the service facade see
//!
//! Durable-tier failures ([`CacheError`]) never cross the cache boundary:
//! reads degrade to a cache miss, writes log and keep the memory tier.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors from a single upstream call (before or after retry).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UpstreamError {
    /// Upstream returned a non-success HTTP status
    #[error("upstream returned status {status}")]
    Status { status: u16 },

    /// Network-level failure (connect, timeout, TLS, decode)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body could not be parsed but the endpoint is known to be
    /// flaky (e.g. the contribution-count text service serving an error
    /// page); retried like any transient failure
    #[error("unparsable response body: {0}")]
    Unparsable(String),

    /// Structurally invalid response from an endpoint that should be
    /// well-formed; retrying cannot help
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Credential rejected (401/403)
    #[error("authentication rejected (status {status})")]
    Auth { status: u16 },

    /// The per-call deadline elapsed mid-retry
    #[error("call deadline exceeded")]
    DeadlineExceeded,

    /// All retries were consumed; carries the last transient error
    #[error("retries exhausted after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<UpstreamError>,
    },
}

impl UpstreamError {
    /// Whether the call policy should retry this failure.
    ///
    /// 429 and 5xx are transient; auth failures and malformed bodies are
    /// not. Decode errors inside reqwest indicate a malformed body, not a
    /// flaky network, so they are fatal too.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Status { status } => *status == 429 || *status >= 500,
            Self::Network(e) => !e.is_decode(),
            Self::Unparsable(_) => true,
            Self::Malformed(_) | Self::Auth { .. } => false,
            Self::DeadlineExceeded | Self::RetriesExhausted { .. } => false,
        }
    }

    /// Classify a non-success HTTP status into the right variant
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Auth { status },
            _ => Self::Status { status },
        }
    }
}

/// Errors surfaced by [`StatsService::get_stats`](crate::StatsService::get_stats).
///
/// Only blocking refreshes can fail the caller; every other failure path
/// degrades to stale-but-available data.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StatsError {
    /// A refresh cycle failed and no cached value could cover for it
    #[error("stats refresh failed: {0}")]
    Refresh(#[from] UpstreamError),

    /// The blocking refresh path exceeded its caller-visible timeout
    #[error("blocking refresh timed out after {0:?}")]
    Timeout(Duration),
}

/// Shared handle to the last refresh failure, recorded by the coordinator
pub type SharedStatsError = Arc<StatsError>;

/// Durable-tier failures. Internal to the cache store: reads map these to
/// "no entry", writes log them and succeed on the memory tier alone.
#[derive(Debug, Error)]
pub(crate) enum CacheError {
    #[error("cache file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache record corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

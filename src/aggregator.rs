//! Combines upstream call results into one immutable stats snapshot
//!
//! The repository listing is the primary call: if it fails, the whole
//! cycle fails. The contribution count is secondary: on failure the cycle
//! still produces a snapshot, substituting the last known count (or the
//! configured fallback) and flagging the result as degraded.

use std::sync::Arc;
use tracing::warn;

use crate::config::FallbackStats;
use crate::error::StatsError;
use crate::stats::Stats;
use crate::upstream::{ContributionClient, RepoMetadataClient};

/// A completed aggregation cycle
#[derive(Debug, Clone, Copy)]
pub struct Aggregated {
    pub stats: Stats,
    /// True when the commit count is a fallback rather than freshly fetched
    pub degraded: bool,
}

/// Runs the upstream calls for one refresh cycle
pub struct Aggregator {
    repos: Arc<dyn RepoMetadataClient>,
    contributions: Arc<dyn ContributionClient>,
    fallback: Option<FallbackStats>,
}

impl Aggregator {
    #[must_use]
    pub fn new(
        repos: Arc<dyn RepoMetadataClient>,
        contributions: Arc<dyn ContributionClient>,
        fallback: Option<FallbackStats>,
    ) -> Self {
        Self {
            repos,
            contributions,
            fallback,
        }
    }

    /// Run one fetch cycle.
    ///
    /// The two upstream calls are independent and issued concurrently.
    /// `last_known` is the previous snapshot, used to cover a failed
    /// contribution lookup. Given the same call results, the output is a
    /// pure function of them plus the current timestamp.
    pub async fn aggregate(&self, last_known: Option<&Stats>) -> Result<Aggregated, StatsError> {
        let (repo_result, contrib_result) = tokio::join!(
            self.repos.fetch_repo_summary(),
            self.contributions.fetch_contribution_count()
        );

        let summary = repo_result.map_err(StatsError::Refresh)?;

        let (commit_count, degraded) = match contrib_result {
            Ok(count) => (count, false),
            Err(e) => {
                let fallback_count = last_known
                    .map(|s| s.commit_count)
                    .or_else(|| self.fallback.map(|f| f.total_commits));
                match fallback_count {
                    Some(count) => {
                        warn!(
                            "contribution lookup failed ({}), substituting last known count {}",
                            e, count
                        );
                        (count, true)
                    }
                    None => {
                        // Nothing to fall back to; a zero here is visible
                        // in logs, never silently passed off as fresh
                        warn!(
                            "contribution lookup failed ({}) with no previous value or \
                             configured fallback, reporting 0",
                            e
                        );
                        (0, true)
                    }
                }
            }
        };

        Ok(Aggregated {
            stats: Stats::now(commit_count, summary.repo_count, summary.star_count),
            degraded,
        })
    }
}

//! Stats service facade
//!
//! The single entry point for callers (an HTTP handler, the CLI, a
//! dashboard). Wires the upstream clients, aggregator, cache store and
//! refresh coordinator together; callers only ever see [`Stats`] and
//! [`StatsError`].

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::aggregator::Aggregator;
use crate::cache::CacheStore;
use crate::config::Config;
use crate::coordinator::RefreshCoordinator;
use crate::error::{SharedStatsError, StatsError};
use crate::stats::Stats;
use crate::upstream::{
    ContributionClient, ContributionCountClient, GithubClient, RepoMetadataClient,
};

/// Facade over the external stats cache
pub struct StatsService {
    coordinator: Arc<RefreshCoordinator>,
}

impl StatsService {
    /// Build the service with the real GitHub and contribution-count
    /// clients from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let repos: Arc<dyn RepoMetadataClient> =
            Arc::new(GithubClient::new(config).context("building GitHub client")?);
        let contributions: Arc<dyn ContributionClient> = Arc::new(
            ContributionCountClient::new(config).context("building contribution-count client")?,
        );
        Ok(Self::with_clients(config, repos, contributions))
    }

    /// Build the service with injected upstream clients (for tests and
    /// alternative backends).
    #[must_use]
    pub fn with_clients(
        config: &Config,
        repos: Arc<dyn RepoMetadataClient>,
        contributions: Arc<dyn ContributionClient>,
    ) -> Self {
        let cache = Arc::new(CacheStore::new(&config.cache.path));
        let aggregator = Arc::new(Aggregator::new(repos, contributions, config.fallback));
        let coordinator = Arc::new(RefreshCoordinator::new(
            cache,
            aggregator,
            config.cache.ttl(),
            std::time::Duration::from_secs(config.upstream.blocking_timeout_secs),
        ));

        Self { coordinator }
    }

    /// Get the current stats snapshot.
    ///
    /// With `force_refresh = false` this returns cached data whenever any
    /// exists — fresh immediately, stale while a background revalidation
    /// runs — and only blocks on the network when there is no cache at
    /// all. With `force_refresh = true` it always performs a blocking
    /// refresh and overwrites the cache.
    pub async fn get_stats(&self, force_refresh: bool) -> Result<Stats, StatsError> {
        Arc::clone(&self.coordinator).get_stats(force_refresh).await
    }

    /// Error from the most recent failed background refresh, if any.
    /// Cleared by the next successful refresh.
    #[must_use]
    pub fn last_refresh_error(&self) -> Option<SharedStatsError> {
        self.coordinator.state().last_error()
    }

    /// Whether a refresh is currently in flight
    #[must_use]
    pub fn refresh_in_flight(&self) -> bool {
        self.coordinator.state().is_in_flight()
    }
}

//! Bounded-staleness cache for GitHub profile statistics
//!
//! Fetches stats (contribution count, repository count, aggregate stars)
//! from a slow, rate-limited pair of upstreams and serves them to
//! latency-sensitive callers without blocking on the network on every
//! request.
//!
//! # Architecture
//!
//! ```text
//! caller → StatsService → RefreshCoordinator → CacheStore (memory → file)
//!                               ↓ stale/missing
//!                          Aggregator → GithubClient        (repos, stars)
//!                                     → ContributionClient  (commit count)
//! ```
//!
//! The read path is stale-while-revalidate: an expired snapshot is served
//! immediately while a single background task refreshes it. Only a cold
//! start (no cache anywhere) or an explicit force-refresh blocks the
//! caller on the upstream. Refreshes are single-flight; upstream calls
//! retry with exponential backoff under a per-call deadline and throttle
//! themselves when GitHub's remaining quota runs low. When the secondary
//! contribution lookup fails, the last known count covers for it rather
//! than failing the cycle.
//!
//! # Usage
//!
//! ```no_run
//! use gh_stats_cache::{StatsService, load_config};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = load_config("config.toml")?;
//! let service = StatsService::new(&config)?;
//!
//! let stats = service.get_stats(false).await?;
//! println!("{} commits, {} repos, {} stars",
//!     stats.commit_count, stats.repo_count, stats.star_count);
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod service;
pub mod stats;
pub mod upstream;

pub use aggregator::{Aggregated, Aggregator};
pub use cache::CacheStore;
pub use config::{Config, FallbackStats, TtlClass, create_default_config, load_config};
pub use coordinator::{RefreshCoordinator, RefreshState};
pub use error::{StatsError, UpstreamError};
pub use service::StatsService;
pub use stats::{CacheEntry, Stats};
pub use upstream::{ContributionClient, RepoMetadataClient, RepoSummary};

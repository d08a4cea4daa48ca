//! Degradation behavior when only part of the upstream is healthy
//!
//! The repository listing is the primary call; the contribution count is
//! secondary and must never fail a cycle on its own.

use tempfile::TempDir;

use gh_stats_cache::StatsService;
use gh_stats_cache::config::FallbackStats;

use mock_upstream::{MockContributions, MockRepos, test_config, write_cache_file};

#[tokio::test]
async fn test_secondary_failure_covers_with_last_known_count() {
    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("cache.json");

    // Warm cache holds a previous commit count of 555
    write_cache_file(&cache_path, 555, 8, 11, 0).await;
    let config = test_config(&cache_path, 3600);

    let repos = MockRepos::new(9, 12);
    let contributions = MockContributions::new(642);
    contributions.set_failing(true);
    let service = StatsService::with_clients(&config, repos.clone(), contributions.clone());

    let stats = service.get_stats(true).await.unwrap();

    // Fresh primary values, last-known commit count, no error surfaced
    assert_eq!(stats.repo_count, 9);
    assert_eq!(stats.star_count, 12);
    assert_eq!(stats.commit_count, 555);
    assert!(service.last_refresh_error().is_none());
}

#[tokio::test]
async fn test_secondary_failure_on_cold_start_uses_configured_fallback() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir.path().join("cache.json"), 3600);
    config.fallback = Some(FallbackStats {
        total_commits: 642,
        total_repos: 9,
        total_stars: 1,
    });

    let repos = MockRepos::new(9, 12);
    let contributions = MockContributions::new(0);
    contributions.set_failing(true);
    let service = StatsService::with_clients(&config, repos.clone(), contributions.clone());

    let stats = service.get_stats(false).await.unwrap();

    assert_eq!(stats.commit_count, 642);
    assert_eq!(stats.repo_count, 9);
    assert_eq!(stats.star_count, 12);
}

#[tokio::test]
async fn test_secondary_failure_without_any_fallback_reports_zero() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("cache.json"), 3600);

    let repos = MockRepos::new(3, 0);
    let contributions = MockContributions::new(0);
    contributions.set_failing(true);
    let service = StatsService::with_clients(&config, repos.clone(), contributions.clone());

    let stats = service.get_stats(false).await.unwrap();

    // Cycle still completes; the missing count is a visible zero
    assert_eq!(stats.commit_count, 0);
    assert_eq!(stats.repo_count, 3);
}

#[tokio::test]
async fn test_secondary_recovery_replaces_substituted_count() {
    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("cache.json");

    write_cache_file(&cache_path, 555, 8, 11, 0).await;
    let config = test_config(&cache_path, 3600);

    let repos = MockRepos::new(9, 12);
    let contributions = MockContributions::new(700);
    contributions.set_failing(true);
    let service = StatsService::with_clients(&config, repos.clone(), contributions.clone());

    // Degraded cycle first, then the secondary comes back
    assert_eq!(service.get_stats(true).await.unwrap().commit_count, 555);

    contributions.set_failing(false);
    assert_eq!(service.get_stats(true).await.unwrap().commit_count, 700);
}

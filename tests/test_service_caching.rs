//! Read-path behavior of the stats service
//!
//! Covers the coordinator state machine end to end:
//! - cold start blocks and fetches exactly once
//! - reads within the TTL are idempotent and issue no upstream calls
//! - expired entries are served stale while one background refresh runs
//! - concurrent readers collapse into a single refresh
//! - force-refresh bypasses a valid cache
//! - blocking refreshes respect the caller-visible timeout

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use gh_stats_cache::{StatsError, StatsService};

use mock_upstream::{MockContributions, MockRepos, test_config, write_cache_file};

#[tokio::test]
async fn test_cold_start_blocks_and_fetches() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("cache.json"), 3600);

    let repos = MockRepos::new(9, 12);
    let contributions = MockContributions::new(642);
    let service = StatsService::with_clients(&config, repos.clone(), contributions.clone());

    let stats = service.get_stats(false).await.unwrap();

    assert_eq!(stats.commit_count, 642);
    assert_eq!(stats.repo_count, 9);
    assert_eq!(stats.star_count, 12);
    assert_eq!(repos.call_count(), 1);
    assert_eq!(contributions.call_count(), 1);
}

#[tokio::test]
async fn test_idempotent_within_ttl() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("cache.json"), 3600);

    let repos = MockRepos::new(9, 12);
    let contributions = MockContributions::new(642);
    let service = StatsService::with_clients(&config, repos.clone(), contributions.clone());

    let first = service.get_stats(false).await.unwrap();
    for _ in 0..5 {
        let again = service.get_stats(false).await.unwrap();
        assert_eq!(again, first);
    }

    // No upstream calls beyond the initial fetch
    assert_eq!(repos.call_count(), 1);
    assert_eq!(contributions.call_count(), 1);
}

#[tokio::test]
async fn test_stale_entry_served_without_waiting_on_network() {
    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("cache.json");

    // Expired cache on disk; slow upstream
    write_cache_file(&cache_path, 100, 5, 3, 10_000).await;
    let config = test_config(&cache_path, 1);

    let repos = MockRepos::with_delay(9, 12, Duration::from_millis(300));
    let contributions = MockContributions::new(642);
    let service = StatsService::with_clients(&config, repos.clone(), contributions.clone());

    let start = std::time::Instant::now();
    let stats = service.get_stats(false).await.unwrap();

    // Stale values, returned well under the upstream latency
    assert_eq!(stats.commit_count, 100);
    assert_eq!(stats.repo_count, 5);
    assert!(start.elapsed() < Duration::from_millis(150));

    // The background refresh lands the fresh values
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(repos.call_count(), 1);
    let refreshed = service.get_stats(false).await.unwrap();
    assert_eq!(refreshed.commit_count, 642);
}

#[tokio::test]
async fn test_concurrent_stale_reads_trigger_one_refresh() {
    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("cache.json");

    write_cache_file(&cache_path, 100, 5, 3, 10_000).await;
    let config = test_config(&cache_path, 1);

    let repos = MockRepos::with_delay(9, 12, Duration::from_millis(200));
    let contributions = MockContributions::new(642);
    let service = Arc::new(StatsService::with_clients(
        &config,
        repos.clone(),
        contributions.clone(),
    ));

    let mut handles = Vec::new();
    for _ in 0..10 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service.get_stats(false).await.unwrap()
        }));
    }
    for handle in handles {
        let stats = handle.await.unwrap();
        assert_eq!(stats.commit_count, 100); // all served stale
    }

    tokio::time::sleep(Duration::from_millis(500)).await;

    // Exactly one aggregator run reached the upstream
    assert_eq!(repos.call_count(), 1);
    assert_eq!(contributions.call_count(), 1);
}

#[tokio::test]
async fn test_concurrent_cold_start_is_single_flight() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("cache.json"), 3600);

    let repos = MockRepos::with_delay(9, 12, Duration::from_millis(150));
    let contributions = MockContributions::new(642);
    let service = Arc::new(StatsService::with_clients(
        &config,
        repos.clone(),
        contributions.clone(),
    ));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service.get_stats(false).await.unwrap()
        }));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    // One caller fetched; the rest were satisfied from the fresh cache
    assert_eq!(repos.call_count(), 1);
    assert!(results.windows(2).all(|w| w[0] == w[1]));
}

#[tokio::test]
async fn test_force_refresh_bypasses_valid_cache() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("cache.json"), 3600);

    let repos = MockRepos::new(9, 12);
    let contributions = MockContributions::new(642);
    let service = StatsService::with_clients(&config, repos.clone(), contributions.clone());

    let first = service.get_stats(false).await.unwrap();
    assert_eq!(first.commit_count, 642);

    // Upstream moves on; a plain read still serves the cache
    contributions.set_count(650);
    assert_eq!(service.get_stats(false).await.unwrap().commit_count, 642);

    // Force refresh fetches and overwrites
    let forced = service.get_stats(true).await.unwrap();
    assert_eq!(forced.commit_count, 650);
    assert_eq!(repos.call_count(), 2);

    // And the overwrite sticks for subsequent cached reads
    assert_eq!(service.get_stats(false).await.unwrap().commit_count, 650);
}

#[tokio::test]
async fn test_cold_start_failure_propagates() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("cache.json"), 3600);

    let repos = MockRepos::new(9, 12);
    repos.set_failing(true);
    let contributions = MockContributions::new(642);
    let service = StatsService::with_clients(&config, repos.clone(), contributions.clone());

    // No cache, upstream down: the one case that must surface an error
    let err = service.get_stats(false).await.unwrap_err();
    assert!(matches!(err, StatsError::Refresh(_)));
}

#[tokio::test]
async fn test_background_failure_keeps_stale_and_records_error() {
    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("cache.json");

    write_cache_file(&cache_path, 100, 5, 3, 10_000).await;
    let config = test_config(&cache_path, 1);

    let repos = MockRepos::new(9, 12);
    repos.set_failing(true);
    let contributions = MockContributions::new(642);
    let service = StatsService::with_clients(&config, repos.clone(), contributions.clone());

    let stats = service.get_stats(false).await.unwrap();
    assert_eq!(stats.commit_count, 100);

    tokio::time::sleep(Duration::from_millis(300)).await;

    // The failure is observable, and the stale entry survives
    assert!(service.last_refresh_error().is_some());
    assert_eq!(service.get_stats(false).await.unwrap().commit_count, 100);
}

#[tokio::test]
async fn test_blocking_refresh_times_out() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir.path().join("cache.json"), 3600);
    config.upstream.blocking_timeout_secs = 1;

    let repos = MockRepos::with_delay(9, 12, Duration::from_secs(10));
    let contributions = MockContributions::new(642);
    let service = StatsService::with_clients(&config, repos.clone(), contributions.clone());

    let start = std::time::Instant::now();
    let err = service.get_stats(false).await.unwrap_err();

    assert!(matches!(err, StatsError::Timeout(_)));
    assert!(start.elapsed() < Duration::from_secs(5));
}

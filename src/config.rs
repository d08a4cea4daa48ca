//! Configuration module
//!
//! All tunables for the stats cache service: the GitHub profile being
//! reported on, TTL class, retry/backoff envelope, rate-limit governance,
//! and the optional fallback statistics served when the upstream has never
//! been reachable.
//!
//! Configuration is read once at startup; there is no hot reload.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::cache::ttl;

/// Environment variable carrying the GitHub bearer token.
///
/// The token is never written to the config file in deployments; the env
/// var takes precedence over any `github.token` value.
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// Environment variable overriding the configured username
pub const USERNAME_ENV_VAR: &str = "GH_STATS_USERNAME";

/// TTL class for the cached snapshot
///
/// Interactive stats are cheap to refetch and stay fresh for an hour;
/// full-history recomputation walks every repository and is only redone
/// daily. One parameterized cache, not two code paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtlClass {
    Interactive,
    FullHistory,
}

impl Default for TtlClass {
    fn default() -> Self {
        Self::Interactive
    }
}

impl TtlClass {
    /// TTL duration for this class
    #[must_use]
    pub const fn duration(self) -> Duration {
        match self {
            Self::Interactive => ttl::INTERACTIVE_TTL,
            Self::FullHistory => ttl::FULL_HISTORY_TTL,
        }
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_contributions_url() -> String {
    "https://github-contributions-api.deno.dev".to_string()
}

fn default_cache_path() -> String {
    "data/github-cache.json".to_string()
}

/// Default retry count for transient upstream failures
fn default_max_retries() -> u32 {
    3
}

/// Default initial backoff delay in seconds
fn default_backoff_base_secs() -> u64 {
    1
}

/// Default backoff cap in seconds
fn default_backoff_cap_secs() -> u64 {
    30
}

/// Default per-call deadline in seconds
fn default_call_deadline_secs() -> u64 {
    30
}

/// Default remaining-quota low-water mark
fn default_rate_limit_low_water() -> u64 {
    10
}

/// Default rate-limit cooldown in seconds
fn default_rate_limit_cooldown_secs() -> u64 {
    60
}

/// Default caller-visible timeout for a blocking refresh in seconds
fn default_blocking_timeout_secs() -> u64 {
    45
}

/// Main service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    /// GitHub profile and endpoints
    #[serde(default)]
    pub github: GithubConfig,
    /// Cache tiering and TTL
    #[serde(default)]
    pub cache: CacheConfig,
    /// Retry, deadline and rate-limit governance for outbound calls
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Stats of last resort, served only when no fetch has ever succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackStats>,
}

/// GitHub profile and endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GithubConfig {
    /// Profile whose statistics are reported
    pub username: String,
    /// Bearer token; prefer the GITHUB_TOKEN env var over this field
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// GitHub REST API base URL (overridable for tests)
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Contribution-count service base URL
    #[serde(default = "default_contributions_url")]
    pub contributions_url: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            token: None,
            api_url: default_api_url(),
            contributions_url: default_contributions_url(),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    /// TTL class (interactive = 1h, fullhistory = 24h)
    #[serde(default)]
    pub ttl_class: TtlClass,
    /// Explicit TTL override in seconds; takes precedence over the class
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl_secs: Option<u64>,
    /// Durable tier location; parent directories are created on demand
    #[serde(default = "default_cache_path")]
    pub path: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_class: TtlClass::default(),
            ttl_secs: None,
            path: default_cache_path(),
        }
    }
}

impl CacheConfig {
    /// Effective TTL: explicit override or the class default
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl_secs
            .map_or_else(|| self.ttl_class.duration(), Duration::from_secs)
    }
}

/// Outbound call governance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpstreamConfig {
    /// Retries on transient failure before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Initial backoff delay in seconds (doubles each attempt)
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,
    /// Upper bound on any single backoff delay in seconds
    #[serde(default = "default_backoff_cap_secs")]
    pub backoff_cap_secs: u64,
    /// Overall deadline for one call including retries, in seconds
    #[serde(default = "default_call_deadline_secs")]
    pub call_deadline_secs: u64,
    /// Remaining-quota threshold below which throttling begins
    #[serde(default = "default_rate_limit_low_water")]
    pub rate_limit_low_water: u64,
    /// Cooldown before the next call once throttled, in seconds
    #[serde(default = "default_rate_limit_cooldown_secs")]
    pub rate_limit_cooldown_secs: u64,
    /// Caller-visible timeout for the blocking refresh path, in seconds
    #[serde(default = "default_blocking_timeout_secs")]
    pub blocking_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_base_secs: default_backoff_base_secs(),
            backoff_cap_secs: default_backoff_cap_secs(),
            call_deadline_secs: default_call_deadline_secs(),
            rate_limit_low_water: default_rate_limit_low_water(),
            rate_limit_cooldown_secs: default_rate_limit_cooldown_secs(),
            blocking_timeout_secs: default_blocking_timeout_secs(),
        }
    }
}

/// Manually maintained statistics served only when the upstream has never
/// been reachable and no cache exists. Degradation to these values is
/// always logged; they are never silently mixed with fresh data.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FallbackStats {
    pub total_commits: u64,
    pub total_repos: u64,
    pub total_stars: u64,
}

impl Config {
    /// Validate configuration for correctness
    ///
    /// Checks for:
    /// - Empty username
    /// - Zero TTL override
    /// - Zero call deadline or blocking timeout
    /// - Backoff base exceeding the cap
    pub fn validate(&self) -> Result<()> {
        if self.github.username.trim().is_empty() {
            return Err(anyhow::anyhow!("github.username must be set"));
        }
        if self.cache.ttl_secs == Some(0) {
            return Err(anyhow::anyhow!("cache.ttl_secs must be > 0"));
        }
        if self.cache.path.trim().is_empty() {
            return Err(anyhow::anyhow!("cache.path cannot be empty"));
        }
        if self.upstream.call_deadline_secs == 0 {
            return Err(anyhow::anyhow!("upstream.call_deadline_secs must be > 0"));
        }
        if self.upstream.blocking_timeout_secs == 0 {
            return Err(anyhow::anyhow!("upstream.blocking_timeout_secs must be > 0"));
        }
        if self.upstream.backoff_base_secs > self.upstream.backoff_cap_secs {
            return Err(anyhow::anyhow!(
                "upstream.backoff_base_secs ({}) exceeds backoff_cap_secs ({})",
                self.upstream.backoff_base_secs,
                self.upstream.backoff_cap_secs
            ));
        }
        Ok(())
    }

    /// Effective bearer token: env var first, then config file
    #[must_use]
    pub fn token(&self) -> Option<String> {
        std::env::var(TOKEN_ENV_VAR)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.github.token.clone())
    }
}

/// Load configuration from a TOML file, with environment variable overrides
///
/// Overrides:
/// - `GITHUB_TOKEN` — bearer token (resolved lazily via [`Config::token`])
/// - `GH_STATS_USERNAME` — profile username
pub fn load_config(config_path: &str) -> Result<Config> {
    let config_content = std::fs::read_to_string(config_path)
        .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", config_path, e))?;

    let mut config: Config = toml::from_str(&config_content)
        .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", config_path, e))?;

    if let Ok(username) = std::env::var(USERNAME_ENV_VAR) {
        if !username.trim().is_empty() {
            tracing::info!(
                "Using username '{}' from {} (overriding config file)",
                username,
                USERNAME_ENV_VAR
            );
            config.github.username = username;
        }
    }

    config.validate()?;

    Ok(config)
}

/// Create a default configuration for examples/testing
#[must_use]
pub fn create_default_config(username: &str) -> Config {
    Config {
        github: GithubConfig {
            username: username.to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

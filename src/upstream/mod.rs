//! Upstream clients for the two outbound call categories
//!
//! - Repository metadata (GitHub REST API): repository count and aggregate
//!   star count, plus the remaining-quota signal used for rate-limit
//!   governance
//! - Contribution count (plain-text lookup service): a templated GET whose
//!   body's first whitespace token is the count
//!
//! Both concrete clients route every call through the shared
//! [`RetryPolicy`] and never touch the cache store; they report structured
//! results or [`UpstreamError`]s and nothing else.

pub mod rate_limit;
pub mod retry;

pub use rate_limit::RateLimitGuard;
pub use retry::RetryPolicy;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::Config;
use crate::error::UpstreamError;

/// Remaining-quota response header on the GitHub REST API
const RATELIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// GitHub caps repository listings at 100 per page
const REPOS_PER_PAGE: usize = 100;

/// Result of a repository metadata call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepoSummary {
    pub repo_count: u64,
    pub star_count: u64,
}

/// Repository/user metadata lookup (Upstream A)
#[async_trait]
pub trait RepoMetadataClient: Send + Sync {
    async fn fetch_repo_summary(&self) -> Result<RepoSummary, UpstreamError>;
}

/// Contribution-count lookup (Upstream B)
#[async_trait]
pub trait ContributionClient: Send + Sync {
    async fn fetch_contribution_count(&self) -> Result<u64, UpstreamError>;
}

/// The slice of a repository record this service cares about
#[derive(Debug, Deserialize)]
struct RepoRecord {
    #[serde(default)]
    stargazers_count: u64,
}

/// GitHub REST API client for repository metadata
pub struct GithubClient {
    http: reqwest::Client,
    api_url: String,
    username: String,
    token: Option<String>,
    retry: RetryPolicy,
    rate_limit: RateLimitGuard,
}

impl GithubClient {
    /// Build from configuration. The bearer token comes from the
    /// GITHUB_TOKEN environment variable or the config file; without one,
    /// calls run unauthenticated against the public rate limit.
    pub fn new(config: &Config) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("gh-stats-cache/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            api_url: config.github.api_url.trim_end_matches('/').to_string(),
            username: config.github.username.clone(),
            token: config.token(),
            retry: RetryPolicy::from_config(&config.upstream),
            rate_limit: RateLimitGuard::from_config(&config.upstream),
        })
    }

    /// Fetch one page of the repository listing.
    ///
    /// Returns the page's records plus the remaining-quota header value.
    async fn list_repos_page(
        &self,
        page: usize,
    ) -> Result<(Vec<RepoRecord>, Option<u64>), UpstreamError> {
        let url = format!(
            "{}/users/{}/repos?per_page={}&page={}",
            self.api_url, self.username, REPOS_PER_PAGE, page
        );

        let mut request = self
            .http
            .get(&url)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        let remaining = response
            .headers()
            .get(RATELIMIT_REMAINING_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::from_status(status.as_u16()));
        }

        let records: Vec<RepoRecord> = response.json().await.map_err(|e| {
            if e.is_decode() {
                UpstreamError::Malformed(format!("repository listing: {}", e))
            } else {
                UpstreamError::Network(e)
            }
        })?;

        Ok((records, remaining))
    }

    /// Walk all pages of the listing, summing counts
    async fn list_all_repos(&self) -> Result<(RepoSummary, Option<u64>), UpstreamError> {
        let mut repo_count = 0u64;
        let mut star_count = 0u64;
        let mut remaining = None;

        let mut page = 1;
        loop {
            let (records, page_remaining) = self.list_repos_page(page).await?;
            remaining = page_remaining.or(remaining);

            repo_count += records.len() as u64;
            star_count += records.iter().map(|r| r.stargazers_count).sum::<u64>();

            if records.len() < REPOS_PER_PAGE {
                break;
            }
            page += 1;
        }

        Ok((
            RepoSummary {
                repo_count,
                star_count,
            },
            remaining,
        ))
    }
}

#[async_trait]
impl RepoMetadataClient for GithubClient {
    async fn fetch_repo_summary(&self) -> Result<RepoSummary, UpstreamError> {
        self.rate_limit.wait_if_throttled().await;

        let (summary, remaining) = self
            .retry
            .run("repository listing", || self.list_all_repos())
            .await?;

        self.rate_limit.observe_remaining(remaining).await;

        debug!(
            "repository listing: {} repos, {} stars (quota remaining: {:?})",
            summary.repo_count, summary.star_count, remaining
        );
        Ok(summary)
    }
}

/// Client for the plain-text contribution-count service
pub struct ContributionCountClient {
    http: reqwest::Client,
    url: String,
    retry: RetryPolicy,
}

impl ContributionCountClient {
    pub fn new(config: &Config) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("gh-stats-cache/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            url: format!(
                "{}/{}.txt",
                config.github.contributions_url.trim_end_matches('/'),
                config.github.username
            ),
            retry: RetryPolicy::from_config(&config.upstream),
        })
    }

    async fn fetch_once(&self) -> Result<u64, UpstreamError> {
        let response = self.http.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::from_status(status.as_u16()));
        }

        let body = response.text().await?;
        parse_contribution_body(&body)
    }
}

/// Parse the contribution-count body: first whitespace-delimited token is
/// the count. The service occasionally serves error pages, so an
/// unparsable body is transient, not fatal.
fn parse_contribution_body(body: &str) -> Result<u64, UpstreamError> {
    body.split_whitespace()
        .next()
        .and_then(|token| token.parse::<u64>().ok())
        .ok_or_else(|| {
            let preview: String = body.chars().take(64).collect();
            UpstreamError::Unparsable(format!("contribution count body: {:?}", preview))
        })
}

#[async_trait]
impl ContributionClient for ContributionCountClient {
    async fn fetch_contribution_count(&self) -> Result<u64, UpstreamError> {
        let count = self
            .retry
            .run("contribution count", || self.fetch_once())
            .await?;
        debug!("contribution count: {}", count);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_contribution_body_first_token() {
        assert_eq!(parse_contribution_body("642 contributions").unwrap(), 642);
        assert_eq!(parse_contribution_body("0").unwrap(), 0);
        assert_eq!(parse_contribution_body("  17\nmore text").unwrap(), 17);
    }

    #[test]
    fn test_parse_contribution_body_rejects_garbage() {
        let err = parse_contribution_body("<html>Service Unavailable</html>").unwrap_err();
        assert!(err.is_transient());

        assert!(parse_contribution_body("").is_err());
        assert!(parse_contribution_body("   \n ").is_err());
    }

    #[test]
    fn test_github_client_trims_trailing_slash() {
        let mut config = crate::config::create_default_config("octocat");
        config.github.api_url = "https://api.github.com/".to_string();
        let client = GithubClient::new(&config).unwrap();
        assert_eq!(client.api_url, "https://api.github.com");
    }

    #[test]
    fn test_contribution_url_templated_with_username() {
        let config = crate::config::create_default_config("lightyfr");
        let client = ContributionCountClient::new(&config).unwrap();
        assert_eq!(
            client.url,
            "https://github-contributions-api.deno.dev/lightyfr.txt"
        );
    }
}

//! GitHub releases and repository stats implementation

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::package::types::PopularityMetrics;
use crate::source::error::SourceError;
use crate::source::registries::{DEFAULT_TIMEOUT, check_status, http_client};
use crate::source::registry::{LatestRelease, PackageSource};

/// Default base URL for GitHub API
const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Response from GitHub latest release API
#[derive(Debug, Deserialize)]
struct Release {
    #[serde(default)]
    tag_name: String,
    #[serde(default)]
    published_at: Option<String>,
}

/// Response from GitHub repository API
#[derive(Debug, Deserialize)]
struct Repository {
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
}

/// Source implementation for GitHub
pub struct GitHubSource {
    client: reqwest::Client,
    base_url: String,
}

impl GitHubSource {
    /// Creates a new GitHubSource with a custom base URL
    pub fn new(base_url: &str) -> Self {
        Self {
            client: http_client(DEFAULT_TIMEOUT),
            base_url: base_url.to_string(),
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            ..self
        }
    }

    /// Fetch the latest published release of `owner/repo`
    pub async fn fetch_latest_release(
        &self,
        repo: &str,
    ) -> Result<Option<LatestRelease>, SourceError> {
        let url = format!("{}/repos/{}/releases/latest", self.base_url, repo);
        debug!("Fetching GitHub release: {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;
        let response = check_status(response, repo)?;

        let release: Release = response.json().await.map_err(|e| {
            warn!("Failed to parse GitHub release response: {}", e);
            SourceError::InvalidResponse(e.to_string())
        })?;

        if release.tag_name.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(LatestRelease {
            version: release.tag_name,
            released_at: release.published_at,
        }))
    }

    /// Fetch star and fork counts of `owner/repo`
    pub async fn fetch_repository_stats(
        &self,
        repo: &str,
    ) -> Result<PopularityMetrics, SourceError> {
        let url = format!("{}/repos/{}", self.base_url, repo);
        debug!("Fetching GitHub stats: {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;
        let response = check_status(response, repo)?;

        let repository: Repository = response
            .json()
            .await
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))?;

        Ok(PopularityMetrics {
            github_stars: repository.stargazers_count,
            github_forks: repository.forks_count,
            ..Default::default()
        })
    }
}

impl Default for GitHubSource {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[async_trait::async_trait]
impl PackageSource for GitHubSource {
    async fn fetch_latest(&self, package_id: &str) -> Option<LatestRelease> {
        self.fetch_latest_release(package_id)
            .await
            .inspect_err(|e| warn!("Failed to fetch GitHub release for {}: {}", package_id, e))
            .ok()
            .flatten()
    }

    async fn fetch_popularity(&self, package_id: &str) -> PopularityMetrics {
        self.fetch_repository_stats(package_id)
            .await
            .inspect_err(|e| warn!("Failed to fetch GitHub stats for {}: {}", package_id, e))
            .unwrap_or_default()
    }
}

//! npm registry and download counts API implementation

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::package::types::PopularityMetrics;
use crate::source::error::SourceError;
use crate::source::registries::{DEFAULT_TIMEOUT, check_status, http_client};
use crate::source::registry::{LatestRelease, PackageSource};

/// Default base URL for npm registry
const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// Default base URL for npm download counts
const DEFAULT_DOWNLOADS_URL: &str = "https://api.npmjs.org";

/// Response from npm registry API
#[derive(Debug, Deserialize)]
struct NpmPackageResponse {
    #[serde(rename = "dist-tags", default)]
    dist_tags: HashMap<String, String>,
    /// Publish timestamps per version; some keys (e.g. `unpublished`) hold objects
    #[serde(default)]
    time: HashMap<String, serde_json::Value>,
}

/// Response from npm downloads point API
#[derive(Debug, Deserialize)]
struct DownloadsResponse {
    #[serde(default)]
    downloads: u64,
}

/// Download count window understood by the npm downloads API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadPeriod {
    LastWeek,
    LastMonth,
}

impl DownloadPeriod {
    fn as_str(&self) -> &'static str {
        match self {
            DownloadPeriod::LastWeek => "last-week",
            DownloadPeriod::LastMonth => "last-month",
        }
    }
}

/// Source implementation for the npm registry
pub struct NpmSource {
    client: reqwest::Client,
    registry_url: String,
    downloads_url: String,
}

impl NpmSource {
    /// Creates a new NpmSource with custom base URLs
    pub fn new(registry_url: &str, downloads_url: &str) -> Self {
        Self {
            client: http_client(DEFAULT_TIMEOUT),
            registry_url: registry_url.to_string(),
            downloads_url: downloads_url.to_string(),
        }
    }

    /// Replace the per-call timeout; a request that exceeds it reports nothing
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            ..self
        }
    }

    /// Encode package name for URL (handles scoped packages)
    fn encode_package_name(package_name: &str) -> String {
        if package_name.starts_with('@') {
            // Scoped package: @scope/name -> @scope%2Fname
            package_name.replace('/', "%2F")
        } else {
            package_name.to_string()
        }
    }

    /// Fetch the `latest` dist-tag and its publish time
    pub async fn fetch_latest_release(
        &self,
        package_name: &str,
    ) -> Result<Option<LatestRelease>, SourceError> {
        let url = format!(
            "{}/{}",
            self.registry_url,
            Self::encode_package_name(package_name)
        );
        debug!("Fetching npm package: {}", url);

        let response = self.client.get(&url).send().await?;
        let response = check_status(response, package_name)?;

        let package_info: NpmPackageResponse = response
            .json()
            .await
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))?;

        let Some(version) = package_info.dist_tags.get("latest").cloned() else {
            return Ok(None);
        };

        let released_at = package_info
            .time
            .get(&version)
            .and_then(|v| v.as_str())
            .map(str::to_string);

        Ok(Some(LatestRelease {
            version,
            released_at,
        }))
    }

    /// Fetch the download count for one window
    pub async fn fetch_download_count(
        &self,
        package_name: &str,
        period: DownloadPeriod,
    ) -> Result<u64, SourceError> {
        let url = format!(
            "{}/downloads/point/{}/{}",
            self.downloads_url,
            period.as_str(),
            package_name
        );
        debug!("Fetching npm downloads: {}", url);

        let response = self.client.get(&url).send().await?;
        let response = check_status(response, package_name)?;

        let counts: DownloadsResponse = response
            .json()
            .await
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))?;

        Ok(counts.downloads)
    }
}

impl Default for NpmSource {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY_URL, DEFAULT_DOWNLOADS_URL)
    }
}

#[async_trait::async_trait]
impl PackageSource for NpmSource {
    async fn fetch_latest(&self, package_id: &str) -> Option<LatestRelease> {
        self.fetch_latest_release(package_id)
            .await
            .inspect_err(|e| warn!("Failed to fetch npm release for {}: {}", package_id, e))
            .ok()
            .flatten()
    }

    async fn fetch_popularity(&self, package_id: &str) -> PopularityMetrics {
        let (weekly, monthly) = tokio::join!(
            self.fetch_download_count(package_id, DownloadPeriod::LastWeek),
            self.fetch_download_count(package_id, DownloadPeriod::LastMonth),
        );

        let mut metrics = PopularityMetrics::default();
        match weekly {
            Ok(count) => metrics.downloads_weekly = count,
            Err(e) => warn!("Failed to fetch npm weekly downloads for {}: {}", package_id, e),
        }
        match monthly {
            Ok(count) => metrics.downloads_monthly = count,
            Err(e) => warn!("Failed to fetch npm monthly downloads for {}: {}", package_id, e),
        }
        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn fetch_latest_release_returns_latest_dist_tag_with_time() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/react")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "name": "react",
                    "dist-tags": {"latest": "18.3.1", "next": "19.0.0-rc"},
                    "time": {
                        "created": "2011-10-26T17:46:21.942Z",
                        "18.3.1": "2024-04-26T16:42:56.150Z"
                    }
                }"#,
            )
            .create_async()
            .await;

        let source = NpmSource::new(&server.url(), &server.url());
        let result = source.fetch_latest_release("react").await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            result,
            Some(LatestRelease {
                version: "18.3.1".to_string(),
                released_at: Some("2024-04-26T16:42:56.150Z".to_string()),
            })
        );
    }

    #[tokio::test]
    async fn fetch_latest_release_handles_scoped_package() {
        let mut server = Server::new_async().await;

        // Scoped packages use URL encoding: @angular/core -> @angular%2Fcore
        let mock = server
            .mock("GET", "/@angular%2Fcore")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"dist-tags": {"latest": "17.0.0"}}"#)
            .create_async()
            .await;

        let source = NpmSource::new(&server.url(), &server.url());
        let result = source.fetch_latest_release("@angular/core").await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            result,
            Some(LatestRelease {
                version: "17.0.0".to_string(),
                released_at: None,
            })
        );
    }

    #[tokio::test]
    async fn fetch_latest_release_returns_none_without_latest_tag() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/empty-package")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"name": "empty-package", "time": {"unpublished": {"time": "x"}}}"#)
            .create_async()
            .await;

        let source = NpmSource::new(&server.url(), &server.url());
        let result = source.fetch_latest_release("empty-package").await.unwrap();

        mock.assert_async().await;
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn fetch_latest_release_returns_not_found_for_nonexistent_package() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/nonexistent-package")
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "Not found"}"#)
            .create_async()
            .await;

        let source = NpmSource::new(&server.url(), &server.url());
        let result = source.fetch_latest_release("nonexistent-package").await;

        mock.assert_async().await;
        assert!(matches!(result, Err(SourceError::NotFound(_))));
    }

    #[tokio::test]
    async fn fetch_latest_degrades_invalid_json_to_none() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/broken")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let source = NpmSource::new(&server.url(), &server.url());
        let result = source.fetch_latest("broken").await;

        mock.assert_async().await;
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn fetch_popularity_reads_weekly_and_monthly_downloads() {
        let mut server = Server::new_async().await;

        let weekly = server
            .mock("GET", "/downloads/point/last-week/react")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"downloads": 25000000, "package": "react"}"#)
            .create_async()
            .await;
        let monthly = server
            .mock("GET", "/downloads/point/last-month/react")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"downloads": 100000000, "package": "react"}"#)
            .create_async()
            .await;

        let source = NpmSource::new(&server.url(), &server.url());
        let result = source.fetch_popularity("react").await;

        weekly.assert_async().await;
        monthly.assert_async().await;
        assert_eq!(
            result,
            PopularityMetrics {
                downloads_weekly: 25_000_000,
                downloads_monthly: 100_000_000,
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn fetch_popularity_keeps_weekly_when_monthly_fails() {
        let mut server = Server::new_async().await;

        let weekly = server
            .mock("GET", "/downloads/point/last-week/react")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"downloads": 42}"#)
            .create_async()
            .await;
        let monthly = server
            .mock("GET", "/downloads/point/last-month/react")
            .with_status(500)
            .create_async()
            .await;

        let source = NpmSource::new(&server.url(), &server.url());
        let result = source.fetch_popularity("react").await;

        weekly.assert_async().await;
        monthly.assert_async().await;
        assert_eq!(result.downloads_weekly, 42);
        assert_eq!(result.downloads_monthly, 0);
    }

    #[tokio::test]
    async fn fetch_download_count_returns_rate_limited_for_429() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/downloads/point/last-week/react")
            .with_status(429)
            .with_header("retry-after", "30")
            .create_async()
            .await;

        let source = NpmSource::new(&server.url(), &server.url());
        let result = source
            .fetch_download_count("react", DownloadPeriod::LastWeek)
            .await;

        mock.assert_async().await;
        assert!(matches!(
            result,
            Err(SourceError::RateLimited {
                retry_after_secs: Some(30)
            })
        ));
    }

    fn slow_body(
        delay: Duration,
        body: &'static str,
    ) -> impl Fn(&mut dyn std::io::Write) -> std::io::Result<()> + Send + Sync + 'static {
        move |writer| {
            std::thread::sleep(delay);
            writer.write_all(body.as_bytes())
        }
    }

    #[tokio::test]
    async fn slow_registry_degrades_to_absent_results() {
        let mut server = Server::new_async().await;

        server
            .mock("GET", "/react")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_chunked_body(slow_body(
                Duration::from_millis(500),
                r#"{"dist-tags": {"latest": "18.3.1"}}"#,
            ))
            .create_async()
            .await;
        server
            .mock(
                "GET",
                mockito::Matcher::Regex("^/downloads/point/".to_string()),
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_chunked_body(slow_body(Duration::from_millis(500), r#"{"downloads": 5}"#))
            .expect_at_least(1)
            .create_async()
            .await;

        let source = NpmSource::new(&server.url(), &server.url())
            .with_timeout(Duration::from_millis(50));

        assert_eq!(source.fetch_latest("react").await, None);
        assert_eq!(
            source.fetch_popularity("react").await,
            PopularityMetrics::default()
        );
    }
}

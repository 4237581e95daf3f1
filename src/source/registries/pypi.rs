//! PyPI registry client for fetching Python package releases and downloads

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::package::types::PopularityMetrics;
use crate::source::error::SourceError;
use crate::source::registries::{DEFAULT_TIMEOUT, check_status, http_client};
use crate::source::registry::{LatestRelease, PackageSource};

const DEFAULT_PYPI_REGISTRY: &str = "https://pypi.org";
const DEFAULT_PYPI_STATS: &str = "https://pypistats.org";

/// PyPI registry client
pub struct PypiSource {
    client: Client,
    base_url: String,
    stats_url: String,
}

impl Default for PypiSource {
    fn default() -> Self {
        Self::new(
            DEFAULT_PYPI_REGISTRY.to_string(),
            DEFAULT_PYPI_STATS.to_string(),
        )
    }
}

/// PyPI JSON API response structure
#[derive(Debug, Deserialize)]
struct PypiResponse {
    info: PypiInfo,
    #[serde(default)]
    releases: HashMap<String, Vec<PypiFile>>,
}

/// Package information from PyPI
#[derive(Debug, Deserialize)]
struct PypiInfo {
    /// Latest version (according to PyPI)
    #[serde(default)]
    version: String,
}

/// Uploaded distribution file of a release
#[derive(Debug, Deserialize)]
struct PypiFile {
    #[serde(default)]
    upload_time_iso_8601: Option<String>,
}

/// pypistats `recent` endpoint response
#[derive(Debug, Deserialize)]
struct RecentDownloadsResponse {
    data: RecentDownloads,
}

#[derive(Debug, Deserialize)]
struct RecentDownloads {
    #[serde(default)]
    last_week: u64,
    #[serde(default)]
    last_month: u64,
}

impl PypiSource {
    pub fn new(base_url: String, stats_url: String) -> Self {
        Self {
            client: http_client(DEFAULT_TIMEOUT),
            base_url,
            stats_url,
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            ..self
        }
    }

    /// Fetch `info.version` and the upload time of its first file
    pub async fn fetch_latest_release(
        &self,
        package_name: &str,
    ) -> Result<Option<LatestRelease>, SourceError> {
        let url = format!("{}/pypi/{}/json", self.base_url, package_name);
        debug!("Fetching PyPI package: {}", url);

        let response = self.client.get(&url).send().await?;
        let response = check_status(response, package_name)?;

        let pypi_response: PypiResponse = response
            .json()
            .await
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))?;

        let version = pypi_response.info.version;
        if version.trim().is_empty() {
            return Ok(None);
        }

        let released_at = pypi_response
            .releases
            .get(&version)
            .and_then(|files| files.iter().find_map(|f| f.upload_time_iso_8601.clone()));

        Ok(Some(LatestRelease {
            version,
            released_at,
        }))
    }

    /// Fetch recent download counts from pypistats
    pub async fn fetch_recent_downloads(
        &self,
        package_name: &str,
    ) -> Result<PopularityMetrics, SourceError> {
        let url = format!("{}/api/packages/{}/recent", self.stats_url, package_name);
        debug!("Fetching PyPI downloads: {}", url);

        let response = self.client.get(&url).send().await?;
        let response = check_status(response, package_name)?;

        let recent: RecentDownloadsResponse = response
            .json()
            .await
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))?;

        Ok(PopularityMetrics {
            downloads_weekly: recent.data.last_week,
            downloads_monthly: recent.data.last_month,
            ..Default::default()
        })
    }
}

#[async_trait]
impl PackageSource for PypiSource {
    async fn fetch_latest(&self, package_id: &str) -> Option<LatestRelease> {
        self.fetch_latest_release(package_id)
            .await
            .inspect_err(|e| warn!("Failed to fetch PyPI release for {}: {}", package_id, e))
            .ok()
            .flatten()
    }

    async fn fetch_popularity(&self, package_id: &str) -> PopularityMetrics {
        self.fetch_recent_downloads(package_id)
            .await
            .inspect_err(|e| warn!("Failed to fetch PyPI downloads for {}: {}", package_id, e))
            .unwrap_or_default()
    }
}

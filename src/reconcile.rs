//! Reconciliation of configured sources into one package record
//!
//! The version comes from the first configured source that reports one, in
//! the fixed order npm, PyPI, GitHub. Popularity counters are fetched
//! independently of that race: downloads from npm (or PyPI when npm is not
//! configured), stars and forks from GitHub.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::config::PackageConfig;
use crate::package::normalize::{display_name, normalize_release_date, normalize_version};
use crate::package::types::{InstallCommands, PopularityMetrics, Record};
use crate::source::registries::{GitHubSource, NpmSource, PypiSource};
use crate::source::registry::{LatestRelease, PackageSource, SourceKind};

/// Produces records from the three configured registries
pub struct Reconciler {
    npm: Arc<dyn PackageSource>,
    pypi: Arc<dyn PackageSource>,
    github: Arc<dyn PackageSource>,
}

impl Reconciler {
    pub fn new(
        npm: Arc<dyn PackageSource>,
        pypi: Arc<dyn PackageSource>,
        github: Arc<dyn PackageSource>,
    ) -> Self {
        Self { npm, pypi, github }
    }

    /// Build the latest record for `name`, or `None` when no source
    /// reports a version.
    pub async fn reconcile(&self, name: &str, package: &PackageConfig) -> Option<Record> {
        let (release, downloads, repo_stats) = tokio::join!(
            self.discover_release(package),
            self.fetch_downloads(package),
            self.fetch_repo_stats(package),
        );

        let Some((kind, release)) = release else {
            warn!("Could not fetch version for {}", name);
            return None;
        };
        debug!(
            "{}: version {} reported by {}",
            name,
            release.version,
            kind.as_str()
        );

        let now = Utc::now();
        Some(Record {
            name: package
                .display_name
                .clone()
                .unwrap_or_else(|| display_name(name)),
            language: package.language.clone(),
            latest_version: normalize_version(&release.version),
            release_date: normalize_release_date(release.released_at.as_deref(), now.date_naive()),
            docs_url: package.docs_url.clone(),
            github_url: package
                .github
                .as_ref()
                .map(|repo| format!("https://github.com/{}", repo)),
            install: InstallCommands::for_sources(package.npm.as_deref(), package.pypi.as_deref()),
            popularity: PopularityMetrics {
                github_stars: repo_stats.github_stars,
                github_forks: repo_stats.github_forks,
                downloads_weekly: downloads.downloads_weekly,
                downloads_monthly: downloads.downloads_monthly,
            },
            last_checked: Some(now),
            category: package.category,
            last_updated: Some(now),
        })
    }

    /// Try sources in priority order and stop at the first version
    async fn discover_release(&self, package: &PackageConfig) -> Option<(SourceKind, LatestRelease)> {
        let candidates = [
            (SourceKind::Npm, package.npm.as_deref(), &self.npm),
            (SourceKind::PyPI, package.pypi.as_deref(), &self.pypi),
            (SourceKind::GitHub, package.github.as_deref(), &self.github),
        ];

        for (kind, package_id, source) in candidates {
            let Some(package_id) = package_id else {
                continue;
            };
            if let Some(release) = source.fetch_latest(package_id).await
                && !release.version.trim().is_empty()
            {
                return Some((kind, release));
            }
        }

        None
    }

    async fn fetch_downloads(&self, package: &PackageConfig) -> PopularityMetrics {
        if let Some(package_id) = package.npm.as_deref() {
            self.npm.fetch_popularity(package_id).await
        } else if let Some(package_id) = package.pypi.as_deref() {
            self.pypi.fetch_popularity(package_id).await
        } else {
            PopularityMetrics::default()
        }
    }

    async fn fetch_repo_stats(&self, package: &PackageConfig) -> PopularityMetrics {
        match package.github.as_deref() {
            Some(repo) => self.github.fetch_popularity(repo).await,
            None => PopularityMetrics::default(),
        }
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(
            Arc::new(NpmSource::default()),
            Arc::new(PypiSource::default()),
            Arc::new(GitHubSource::default()),
        )
    }
}

//! Source trait for fetching release and popularity data from registries

#[cfg(test)]
use mockall::automock;

use crate::package::types::PopularityMetrics;

/// Upstream registry kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// npm registry and download counts API
    Npm,
    /// PyPI JSON API and pypistats
    PyPI,
    /// GitHub releases and repository stats
    GitHub,
}

impl SourceKind {
    /// Returns the string representation of the source kind
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Npm => "npm",
            SourceKind::PyPI => "pypi",
            SourceKind::GitHub => "github",
        }
    }
}

/// Latest release reported by a registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestRelease {
    /// Version exactly as the registry reports it
    pub version: String,
    /// Release timestamp as reported, usually RFC 3339
    pub released_at: Option<String>,
}

/// Trait for fetching package data from a registry
///
/// Implementations log failures and return an absent release or zeroed
/// counters instead of an error.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait PackageSource: Send + Sync {
    /// Fetches the latest release for a package id
    ///
    /// # Returns
    /// * `Some(LatestRelease)` - when the registry reports a version
    /// * `None` - on any network, status or parsing failure
    async fn fetch_latest(&self, package_id: &str) -> Option<LatestRelease>;

    /// Fetches popularity counters, zero-filled for anything unavailable
    async fn fetch_popularity(&self, package_id: &str) -> PopularityMetrics;
}

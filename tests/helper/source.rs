//! In-memory package source for testing

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use stack_tracker::package::types::PopularityMetrics;
use stack_tracker::source::registry::{LatestRelease, PackageSource};

/// Source answering from fixed tables; unknown ids behave like a failed fetch
#[derive(Default)]
pub struct StaticSource {
    releases: Mutex<HashMap<String, LatestRelease>>,
    popularity: Mutex<HashMap<String, PopularityMetrics>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_release(self, id: &str, version: &str, released_at: Option<&str>) -> Self {
        self.set_release(id, version, released_at);
        self
    }

    pub fn with_popularity(self, id: &str, metrics: PopularityMetrics) -> Self {
        self.popularity
            .lock()
            .unwrap()
            .insert(id.to_string(), metrics);
        self
    }

    /// Replace the release reported for `id` between refreshes
    pub fn set_release(&self, id: &str, version: &str, released_at: Option<&str>) {
        self.releases.lock().unwrap().insert(
            id.to_string(),
            LatestRelease {
                version: version.to_string(),
                released_at: released_at.map(str::to_string),
            },
        );
    }

    pub fn set_popularity(&self, id: &str, metrics: PopularityMetrics) {
        self.popularity
            .lock()
            .unwrap()
            .insert(id.to_string(), metrics);
    }
}

#[async_trait]
impl PackageSource for StaticSource {
    async fn fetch_latest(&self, package_id: &str) -> Option<LatestRelease> {
        self.releases.lock().unwrap().get(package_id).cloned()
    }

    async fn fetch_popularity(&self, package_id: &str) -> PopularityMetrics {
        self.popularity
            .lock()
            .unwrap()
            .get(package_id)
            .copied()
            .unwrap_or_default()
    }
}

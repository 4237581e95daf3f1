//! Store and configuration fixtures

use tempfile::TempDir;

use stack_tracker::config::PackageConfig;
use stack_tracker::package::types::{Category, InstallCommands, PopularityMetrics, Record};
use stack_tracker::store::SnapshotStore;

/// Create a store backed by a file in a fresh temporary directory
pub fn create_test_store() -> (TempDir, SnapshotStore) {
    let temp_dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(&temp_dir.path().join("stacks_data.json"));
    (temp_dir, store)
}

pub fn package_config(
    category: Category,
    npm: Option<&str>,
    pypi: Option<&str>,
    github: Option<&str>,
) -> PackageConfig {
    PackageConfig {
        display_name: None,
        language: if pypi.is_some() { "Python" } else { "JavaScript" }.to_string(),
        category,
        docs_url: "https://example.com/docs".to_string(),
        npm: npm.map(str::to_string),
        pypi: pypi.map(str::to_string),
        github: github.map(str::to_string),
    }
}

pub fn record(name: &str, version: &str, stars: u64, downloads_weekly: u64) -> Record {
    Record {
        name: name.to_string(),
        language: "JavaScript".to_string(),
        latest_version: version.to_string(),
        release_date: "2025-01-01".to_string(),
        docs_url: "https://example.com/docs".to_string(),
        github_url: None,
        install: InstallCommands::default(),
        popularity: PopularityMetrics {
            github_stars: stars,
            github_forks: 0,
            downloads_weekly,
            downloads_monthly: 0,
        },
        last_checked: None,
        category: Category::Other,
        last_updated: None,
    }
}

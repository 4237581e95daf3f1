use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::package::types::Category;

// =============================================================================
// Time-related constants
// =============================================================================

/// Timeout for a single registry call in milliseconds (10 seconds)
pub const FETCH_TIMEOUT_MS: u64 = 10_000;

/// Delay between starting each package fetch to avoid rate limiting (10ms)
pub const FETCH_STAGGER_DELAY_MS: u64 = 10;

// =============================================================================
// Snapshot thresholds
// =============================================================================

/// Star movement (exclusive) that records a history entry
pub const DEFAULT_STAR_DELTA: u64 = 100;

/// Weekly download movement (exclusive) that records a history entry
pub const DEFAULT_WEEKLY_DOWNLOAD_DELTA: u64 = 10_000;

/// Number of history entries retained per package
pub const DEFAULT_MAX_HISTORY: usize = 10;

/// Default configuration file name, resolved against the working directory
pub const DEFAULT_CONFIG_FILE: &str = "tracker.config.json";

/// Default store file name inside the data directory
pub const STORE_FILE_NAME: &str = "stacks_data.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Package already configured: {0}")]
    DuplicatePackage(String),
}

/// Tracker configuration file
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    /// Tracked packages keyed by their store name
    pub sources: IndexMap<String, PackageConfig>,
    /// Names refreshed on the daily cadence
    pub fast_moving_stacks: Vec<String>,
    pub snapshot: SnapshotPolicy,
}

/// One tracked package and where to look it up
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub category: Category,
    pub docs_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pypi: Option<String>,
    /// GitHub repository as `owner/name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
}

fn default_language() -> String {
    "Unknown".to_string()
}

/// Thresholds deciding when a save records a history entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SnapshotPolicy {
    pub star_delta: u64,
    pub weekly_download_delta: u64,
    pub max_history: usize,
}

impl Default for SnapshotPolicy {
    fn default() -> Self {
        Self {
            star_delta: DEFAULT_STAR_DELTA,
            weekly_download_delta: DEFAULT_WEEKLY_DOWNLOAD_DELTA,
            max_history: DEFAULT_MAX_HISTORY,
        }
    }
}

impl TrackerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading tracker config from {:?}", path);
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        for name in &config.fast_moving_stacks {
            if !config.sources.contains_key(name) {
                warn!("Fast-moving package {} is not configured, ignoring", name);
            }
        }

        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content + "\n").map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Append a package, rejecting names already present in any letter case
    pub fn add_package(
        &mut self,
        name: &str,
        package: PackageConfig,
        fast_moving: bool,
    ) -> Result<(), ConfigError> {
        if self
            .sources
            .keys()
            .any(|existing| existing.eq_ignore_ascii_case(name))
        {
            return Err(ConfigError::DuplicatePackage(name.to_string()));
        }

        self.sources.insert(name.to_string(), package);
        if fast_moving {
            self.fast_moving_stacks.push(name.to_string());
        }
        Ok(())
    }

    /// All configured packages in configuration order
    pub fn all_packages(&self) -> Vec<(&str, &PackageConfig)> {
        self.sources
            .iter()
            .map(|(name, package)| (name.as_str(), package))
            .collect()
    }

    /// Fast-moving packages that are also configured
    pub fn fast_moving_packages(&self) -> Vec<(&str, &PackageConfig)> {
        self.fast_moving_stacks
            .iter()
            .filter_map(|name| {
                self.sources
                    .get_key_value(name)
                    .map(|(name, package)| (name.as_str(), package))
            })
            .collect()
    }
}

/// Returns the path to the data directory for stack-tracker.
/// Uses $XDG_DATA_HOME/stack-tracker if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/stack-tracker,
/// or ./stack-tracker if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the default path to the store file.
pub fn store_path() -> PathBuf {
    data_dir().join(STORE_FILE_NAME)
}

/// Returns the directory holding rolling log files.
pub fn log_dir() -> PathBuf {
    data_dir().join("logs")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("stack-tracker")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn package(docs_url: &str) -> PackageConfig {
        PackageConfig {
            display_name: None,
            language: "JavaScript".to_string(),
            category: Category::Frontend,
            docs_url: docs_url.to_string(),
            npm: Some("react".to_string()),
            pypi: None,
            github: Some("facebook/react".to_string()),
        }
    }

    #[test]
    fn tracker_config_from_minimal_object_uses_defaults() {
        let result = serde_json::from_value::<TrackerConfig>(json!({
            "sources": {
                "react": { "docs_url": "https://react.dev", "npm": "react" }
            }
        }))
        .unwrap();

        let react = &result.sources["react"];
        assert_eq!(react.language, "Unknown");
        assert_eq!(react.category, Category::Other);
        assert_eq!(react.github, None);
        assert!(result.fast_moving_stacks.is_empty());
        assert_eq!(result.snapshot, SnapshotPolicy::default());
    }

    #[test]
    fn tracker_config_maps_unknown_category_to_other() {
        let result = serde_json::from_value::<TrackerConfig>(json!({
            "sources": {
                "weird": { "docs_url": "https://example.com", "category": "quantum" }
            }
        }))
        .unwrap();

        assert_eq!(result.sources["weird"].category, Category::Other);
    }

    #[test]
    fn tracker_config_parses_snapshot_overrides() {
        let result = serde_json::from_value::<TrackerConfig>(json!({
            "snapshot": { "star_delta": 5 }
        }))
        .unwrap();

        assert_eq!(
            result.snapshot,
            SnapshotPolicy {
                star_delta: 5,
                weekly_download_delta: DEFAULT_WEEKLY_DOWNLOAD_DELTA,
                max_history: DEFAULT_MAX_HISTORY,
            }
        );
    }

    #[test]
    fn fast_moving_packages_skips_unconfigured_names() {
        let mut config = TrackerConfig::default();
        config
            .add_package("react", package("https://react.dev"), true)
            .unwrap();
        config.fast_moving_stacks.push("ghost".to_string());

        let names: Vec<&str> = config
            .fast_moving_packages()
            .into_iter()
            .map(|(name, _)| name)
            .collect();

        assert_eq!(names, vec!["react"]);
    }

    #[test]
    fn add_package_rejects_duplicate_ignoring_case() {
        let mut config = TrackerConfig::default();
        config
            .add_package("react", package("https://react.dev"), false)
            .unwrap();

        let result = config.add_package("React", package("https://react.dev"), false);

        assert!(matches!(result, Err(ConfigError::DuplicatePackage(name)) if name == "React"));
        assert_eq!(config.sources.len(), 1);
    }

    #[test]
    fn save_then_load_preserves_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tracker.config.json");
        let mut config = TrackerConfig::default();
        config
            .add_package("react", package("https://react.dev"), true)
            .unwrap();

        config.save(&path).unwrap();
        let loaded = TrackerConfig::load(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn load_reports_parse_error_for_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let result = TrackerConfig::load(&path);

        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn data_dir_with_env_uses_xdg_data_home_when_set() {
        let path = data_dir_with_env(
            Some("/tmp/test-data".to_string()),
            Some(PathBuf::from("/home/user")),
        );

        assert_eq!(path, PathBuf::from("/tmp/test-data/stack-tracker"));
    }

    #[test]
    fn data_dir_with_env_falls_back_to_home_local_share() {
        let path = data_dir_with_env(None, Some(PathBuf::from("/home/user")));

        assert_eq!(path, PathBuf::from("/home/user/.local/share/stack-tracker"));
    }

    #[test]
    fn data_dir_with_env_falls_back_to_current_dir_when_no_dirs_available() {
        let path = data_dir_with_env(None, None);
        assert_eq!(path, PathBuf::from("./stack-tracker"));
    }
}

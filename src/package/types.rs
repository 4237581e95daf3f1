//! Common types for tracked packages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category tag of a tracked package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", from = "String")]
pub enum Category {
    Frontend,
    Backend,
    Database,
    Testing,
    Styling,
    BuildTools,
    StateManagement,
    DataScience,
    Animation,
    Networking,
    Runtime,
    PackageManager,
    CodeQuality,
    Monorepo,
    Visualization,
    MlApps,
    Validation,
    Forms,
    Routing,
    Realtime,
    Graphql,
    Utility,
    #[default]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl Category {
    pub const ALL: [Category; 23] = [
        Category::Frontend,
        Category::Backend,
        Category::Database,
        Category::Testing,
        Category::Styling,
        Category::BuildTools,
        Category::StateManagement,
        Category::DataScience,
        Category::Animation,
        Category::Networking,
        Category::Runtime,
        Category::PackageManager,
        Category::CodeQuality,
        Category::Monorepo,
        Category::Visualization,
        Category::MlApps,
        Category::Validation,
        Category::Forms,
        Category::Routing,
        Category::Realtime,
        Category::Graphql,
        Category::Utility,
        Category::Other,
    ];

    /// Returns the external tag of the category
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Frontend => "frontend",
            Category::Backend => "backend",
            Category::Database => "database",
            Category::Testing => "testing",
            Category::Styling => "styling",
            Category::BuildTools => "build-tools",
            Category::StateManagement => "state-management",
            Category::DataScience => "data-science",
            Category::Animation => "animation",
            Category::Networking => "networking",
            Category::Runtime => "runtime",
            Category::PackageManager => "package-manager",
            Category::CodeQuality => "code-quality",
            Category::Monorepo => "monorepo",
            Category::Visualization => "visualization",
            Category::MlApps => "ml-apps",
            Category::Validation => "validation",
            Category::Forms => "forms",
            Category::Routing => "routing",
            Category::Realtime => "realtime",
            Category::Graphql => "graphql",
            Category::Utility => "utility",
            Category::Other => "other",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == tag)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Lenient conversion used when reading config and store files
impl From<String> for Category {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_default()
    }
}

/// Popularity counters, zero when a source could not provide them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopularityMetrics {
    pub github_stars: u64,
    pub github_forks: u64,
    pub downloads_weekly: u64,
    pub downloads_monthly: u64,
}

/// Install command variants for a package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallCommands {
    pub npm: Option<String>,
    pub bun: Option<String>,
    pub pip: Option<String>,
    pub yarn: Option<String>,
}

impl InstallCommands {
    pub fn for_sources(npm_package: Option<&str>, pypi_package: Option<&str>) -> Self {
        let mut commands = Self::default();
        if let Some(package) = npm_package {
            commands.npm = Some(format!("npm install {}", package));
            commands.bun = Some(format!("bun add {}", package));
            commands.yarn = Some(format!("yarn add {}", package));
        }
        if let Some(package) = pypi_package {
            commands.pip = Some(format!("pip install {}", package));
        }
        commands
    }
}

/// Latest known state of one tracked package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Display name
    pub name: String,
    pub language: String,
    /// Normalized `major.minor.patch` version
    pub latest_version: String,
    /// Calendar date, `YYYY-MM-DD`
    pub release_date: String,
    pub docs_url: String,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub install: InstallCommands,
    #[serde(flatten)]
    pub popularity: PopularityMetrics,
    #[serde(default)]
    pub last_checked: Option<DateTime<Utc>>,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Record {
    /// Stars plus weekly downloads in thousands
    pub fn combined_score(&self) -> f64 {
        self.popularity.github_stars as f64 + self.popularity.downloads_weekly as f64 / 1000.0
    }
}

/// A retained past state of a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub version: String,
    #[serde(default)]
    pub github_stars: u64,
    #[serde(default)]
    pub downloads_weekly: u64,
}

impl HistoryEntry {
    /// Capture the values of `record` at `timestamp`
    pub fn from_record(record: &Record, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            version: record.latest_version.clone(),
            github_stars: record.popularity.github_stars,
            downloads_weekly: record.popularity.downloads_weekly,
        }
    }
}

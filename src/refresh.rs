//! Refresh cycles: reconcile a set of packages and merge them into the store

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use indexmap::IndexMap;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::{FETCH_STAGGER_DELAY_MS, TrackerConfig};
use crate::package::types::Record;
use crate::reconcile::Reconciler;
use crate::store::SnapshotStore;

/// Which packages a refresh covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshScope {
    /// Every configured package (weekly cadence)
    Full,
    /// Only the fast-moving subset (daily cadence)
    FastMoving,
}

impl RefreshScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshScope::Full => "full",
            RefreshScope::FastMoving => "fast-moving",
        }
    }
}

/// Outcome of one refresh cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshReport {
    pub scope: &'static str,
    /// Packages that produced a record
    pub updated: Vec<String>,
    /// Packages for which no source reported a version
    pub failed: Vec<String>,
    /// Per-package or store-level error messages
    pub errors: IndexMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

impl RefreshReport {
    /// True when the cycle's result reached the store
    pub fn is_saved(&self) -> bool {
        !self.errors.contains_key("store")
    }

    pub fn total(&self) -> usize {
        self.updated.len() + self.failed.len()
    }
}

/// Runs reconciliation cycles and persists their results
///
/// Cycles are serialized: a second caller waits until the running
/// load-merge-save cycle has finished.
pub struct Refresher {
    reconciler: Reconciler,
    store: Arc<SnapshotStore>,
    config: Arc<TrackerConfig>,
    cycle_lock: Mutex<()>,
}

impl Refresher {
    pub fn new(
        reconciler: Reconciler,
        store: Arc<SnapshotStore>,
        config: Arc<TrackerConfig>,
    ) -> Self {
        Self {
            reconciler,
            store,
            config,
            cycle_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    pub async fn run(&self, scope: RefreshScope) -> RefreshReport {
        let _guard = self.cycle_lock.lock().await;

        let packages = match scope {
            RefreshScope::Full => self.config.all_packages(),
            RefreshScope::FastMoving => self.config.fast_moving_packages(),
        };
        info!(
            "Starting {} refresh of {} packages",
            scope.as_str(),
            packages.len()
        );

        let futures = packages.into_iter().enumerate().map(|(i, (name, package))| {
            let delay = Duration::from_millis(FETCH_STAGGER_DELAY_MS * i as u64);
            async move {
                sleep(delay).await;
                (name, self.reconciler.reconcile(name, package).await)
            }
        });
        let results = join_all(futures).await;

        let mut report = RefreshReport {
            scope: scope.as_str(),
            updated: Vec::new(),
            failed: Vec::new(),
            errors: IndexMap::new(),
            timestamp: Utc::now(),
        };
        let mut fresh: IndexMap<String, Record> = IndexMap::new();
        for (name, record) in results {
            match record {
                Some(record) => {
                    info!(
                        "Updated {}: v{} ({} stars)",
                        name, record.latest_version, record.popularity.github_stars
                    );
                    report.updated.push(name.to_string());
                    fresh.insert(name.to_string(), record);
                }
                None => {
                    report.failed.push(name.to_string());
                    report
                        .errors
                        .insert(name.to_string(), "no source reported a version".to_string());
                }
            }
        }

        let merged = self.merge_with_existing(fresh);
        if let Err(e) = self.store.save(merged) {
            error!("Failed to save {} refresh: {}", scope.as_str(), e);
            report.errors.insert("store".to_string(), e.to_string());
        }

        info!(
            "Finished {} refresh: {} updated, {} failed",
            scope.as_str(),
            report.updated.len(),
            report.failed.len()
        );
        report
    }

    /// Existing records still present in configuration, overlaid with `fresh`
    fn merge_with_existing(&self, fresh: IndexMap<String, Record>) -> IndexMap<String, Record> {
        let mut merged: IndexMap<String, Record> = self
            .store
            .load()
            .into_iter()
            .filter(|(name, _)| {
                let configured = self.config.sources.contains_key(name);
                if !configured {
                    warn!("Dropping {} from store: no longer configured", name);
                }
                configured
            })
            .collect();

        for (name, record) in fresh {
            merged.insert(name, record);
        }
        merged
    }
}

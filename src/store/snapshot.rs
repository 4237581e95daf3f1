use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::config::SnapshotPolicy;
use crate::package::types::{HistoryEntry, Record};
use crate::store::error::StoreError;
use crate::store::query::names_match;

/// Persisted record together with its retained history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPackage {
    #[serde(flatten)]
    pub record: Record,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

/// Store-level metadata written on every save
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreMetadata {
    pub last_updated: Option<DateTime<Utc>>,
    pub total_count: usize,
}

/// On-disk layout of the store file
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    stacks: IndexMap<String, StoredPackage>,
    #[serde(default)]
    last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    total_count: usize,
}

/// Returns true when the move from `previous` to `current` is worth a
/// history entry under `policy`.
pub fn should_snapshot(previous: &Record, current: &Record, policy: &SnapshotPolicy) -> bool {
    previous.latest_version != current.latest_version
        || previous
            .popularity
            .github_stars
            .abs_diff(current.popularity.github_stars)
            > policy.star_delta
        || previous
            .popularity
            .downloads_weekly
            .abs_diff(current.popularity.downloads_weekly)
            > policy.weekly_download_delta
}

pub struct SnapshotStore {
    path: PathBuf,
    policy: SnapshotPolicy,
    write_lock: Mutex<()>,
}

impl SnapshotStore {
    pub fn new(path: &Path) -> Self {
        Self::with_policy(path, SnapshotPolicy::default())
    }

    pub fn with_policy(path: &Path, policy: SnapshotPolicy) -> Self {
        info!("Using snapshot store at {:?}", path);
        Self {
            path: path.to_path_buf(),
            policy,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Acquire write lock with proper error handling
    fn lock_writes(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        self.write_lock.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Read the store file; `None` when it does not exist yet
    fn read_document(&self) -> Result<Option<StoreDocument>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Read the store file, treating a missing or corrupt file as empty
    fn read_document_or_empty(&self) -> StoreDocument {
        match self.read_document() {
            Ok(document) => document.unwrap_or_default(),
            Err(e) => {
                warn!("Failed to read store {:?}, treating as empty: {}", self.path, e);
                StoreDocument::default()
            }
        }
    }

    /// Write the whole document through a temp file and atomic rename
    fn write_document(&self, document: &StoreDocument) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut temp = NamedTempFile::new_in(&dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, document)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&self.path)?;
        Ok(())
    }

    /// Latest records in stored order
    pub fn load(&self) -> IndexMap<String, Record> {
        self.load_with_history()
            .into_iter()
            .map(|(name, stored)| (name, stored.record))
            .collect()
    }

    /// Latest records with their history in stored order
    pub fn load_with_history(&self) -> IndexMap<String, StoredPackage> {
        self.read_document_or_empty().stacks
    }

    /// History of one package, matched case-insensitively
    pub fn history(&self, name: &str) -> Vec<HistoryEntry> {
        self.load_with_history()
            .into_iter()
            .find(|(key, _)| names_match(key, name))
            .map(|(_, stored)| stored.history)
            .unwrap_or_default()
    }

    pub fn metadata(&self) -> StoreMetadata {
        let document = self.read_document_or_empty();
        StoreMetadata {
            last_updated: document.last_updated,
            total_count: document.total_count,
        }
    }

    /// Strict read used by readiness checks; a missing file counts as empty
    pub fn check_readable(&self) -> Result<usize, StoreError> {
        Ok(self
            .read_document()?
            .map(|document| document.stacks.len())
            .unwrap_or(0))
    }

    /// Replace the stored set with `records`, recording history entries
    pub fn save(&self, records: IndexMap<String, Record>) -> Result<(), StoreError> {
        self.save_at(records, Utc::now())
    }

    /// `save` with an explicit clock, used for history timestamps and metadata
    pub fn save_at(
        &self,
        records: IndexMap<String, Record>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let _guard = self.lock_writes()?;
        let mut previous = self.read_document_or_empty().stacks;

        let mut snapshots = 0;
        let stacks: IndexMap<String, StoredPackage> = records
            .into_iter()
            .map(|(name, record)| {
                let history = match previous.swap_remove(&name) {
                    Some(StoredPackage {
                        record: old,
                        mut history,
                    }) => {
                        if should_snapshot(&old, &record, &self.policy) {
                            history.push(HistoryEntry::from_record(&old, now));
                            snapshots += 1;
                        }
                        let excess = history.len().saturating_sub(self.policy.max_history);
                        history.drain(..excess);
                        history
                    }
                    None => Vec::new(),
                };
                (name, StoredPackage { record, history })
            })
            .collect();

        let document = StoreDocument {
            total_count: stacks.len(),
            stacks,
            last_updated: Some(now),
        };
        self.write_document(&document)?;

        debug!(
            "Saved {} packages ({} new history entries) to {:?}",
            document.total_count, snapshots, self.path
        );
        Ok(())
    }
}

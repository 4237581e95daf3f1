//! Read helpers over a freshly loaded snapshot

use std::cmp::Ordering;

use chrono::{DateTime, TimeDelta, Utc};
use indexmap::IndexMap;
use thiserror::Error;

use crate::package::types::{Category, Record};
use crate::store::snapshot::SnapshotStore;

/// Metric used to rank trending packages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrendingSort {
    #[default]
    Stars,
    /// Weekly downloads
    Downloads,
    Forks,
    /// `stars + weekly_downloads / 1000`
    Combined,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid sort_by {0:?}. Must be one of: stars, downloads, forks, combined")]
pub struct UnknownSortKey(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid threshold_days {0}: out of range")]
pub struct ThresholdOutOfRange(pub i64);

impl TrendingSort {
    pub const ALL: [TrendingSort; 4] = [
        TrendingSort::Stars,
        TrendingSort::Downloads,
        TrendingSort::Forks,
        TrendingSort::Combined,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrendingSort::Stars => "stars",
            TrendingSort::Downloads => "downloads",
            TrendingSort::Forks => "forks",
            TrendingSort::Combined => "combined",
        }
    }

    /// Parse a sort key, using the combined score for anything unrecognized
    pub fn from_lenient(s: &str) -> Self {
        s.parse().unwrap_or(TrendingSort::Combined)
    }

    fn compare(&self, a: &Record, b: &Record) -> Ordering {
        match self {
            TrendingSort::Stars => a.popularity.github_stars.cmp(&b.popularity.github_stars),
            TrendingSort::Downloads => a
                .popularity
                .downloads_weekly
                .cmp(&b.popularity.downloads_weekly),
            TrendingSort::Forks => a.popularity.github_forks.cmp(&b.popularity.github_forks),
            TrendingSort::Combined => a.combined_score().total_cmp(&b.combined_score()),
        }
    }
}

impl std::str::FromStr for TrendingSort {
    type Err = UnknownSortKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TrendingSort::ALL
            .into_iter()
            .find(|sort| sort.as_str() == s)
            .ok_or_else(|| UnknownSortKey(s.to_string()))
    }
}

impl std::fmt::Display for TrendingSort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive key comparison shared by every name lookup
pub fn names_match(key: &str, name: &str) -> bool {
    key.to_lowercase() == name.to_lowercase()
}

/// Case-insensitive exact key lookup
pub fn find<'a>(
    records: &'a IndexMap<String, Record>,
    name: &str,
) -> Option<(&'a str, &'a Record)> {
    records
        .iter()
        .find(|(key, _)| names_match(key, name))
        .map(|(key, record)| (key.as_str(), record))
}

pub fn filter_by_category(
    records: &IndexMap<String, Record>,
    category: Category,
) -> IndexMap<String, Record> {
    records
        .iter()
        .filter(|(_, record)| record.category == category)
        .map(|(key, record)| (key.clone(), record.clone()))
        .collect()
}

/// Substring match on key or display name; exact matches come first
pub fn search_records(records: &IndexMap<String, Record>, query: &str) -> IndexMap<String, Record> {
    let query = query.to_lowercase();
    let is_exact = |key: &str, record: &Record| {
        key.to_lowercase() == query || record.name.to_lowercase() == query
    };
    let is_partial = |key: &str, record: &Record| {
        key.to_lowercase().contains(&query) || record.name.to_lowercase().contains(&query)
    };

    let exact = records
        .iter()
        .filter(|&(key, record)| is_exact(key, record));
    let partial = records
        .iter()
        .filter(|&(key, record)| !is_exact(key, record) && is_partial(key, record));

    exact
        .chain(partial)
        .map(|(key, record)| (key.clone(), record.clone()))
        .collect()
}

/// Stable descending sort by `sort`, truncated to `limit`
pub fn rank_trending(
    records: &IndexMap<String, Record>,
    sort: TrendingSort,
    limit: usize,
) -> Vec<Record> {
    let mut ranked: Vec<&Record> = records.values().collect();
    ranked.sort_by(|a, b| sort.compare(b, a));
    ranked.into_iter().take(limit).cloned().collect()
}

/// Records never checked or last checked before `now - threshold_days`
pub fn filter_outdated(
    records: &IndexMap<String, Record>,
    threshold_days: i64,
    now: DateTime<Utc>,
) -> Result<IndexMap<String, Record>, ThresholdOutOfRange> {
    let threshold = TimeDelta::try_days(threshold_days)
        .and_then(|delta| now.checked_sub_signed(delta))
        .ok_or(ThresholdOutOfRange(threshold_days))?;
    Ok(records
        .iter()
        .filter(|(_, record)| record.last_checked.is_none_or(|checked| checked < threshold))
        .map(|(key, record)| (key.clone(), record.clone()))
        .collect())
}

impl SnapshotStore {
    /// Look up one record by name, ignoring case; returns the stored key
    pub fn get(&self, name: &str) -> Option<(String, Record)> {
        let records = self.load();
        find(&records, name).map(|(key, record)| (key.to_string(), record.clone()))
    }

    pub fn by_category(&self, category: Category) -> IndexMap<String, Record> {
        filter_by_category(&self.load(), category)
    }

    pub fn search(&self, query: &str) -> IndexMap<String, Record> {
        search_records(&self.load(), query)
    }

    pub fn trending(&self, sort: TrendingSort, limit: usize) -> Vec<Record> {
        rank_trending(&self.load(), sort, limit)
    }

    pub fn outdated(
        &self,
        threshold_days: i64,
    ) -> Result<IndexMap<String, Record>, ThresholdOutOfRange> {
        filter_outdated(&self.load(), threshold_days, Utc::now())
    }
}

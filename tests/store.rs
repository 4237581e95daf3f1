//! Snapshot store behavior through the public API

mod helper;

use chrono::{Duration, TimeZone, Utc};
use indexmap::IndexMap;

use helper::{create_test_store, record};
use stack_tracker::config::SnapshotPolicy;
use stack_tracker::package::types::Record;
use stack_tracker::store::{SnapshotStore, TrendingSort};

fn single(name: &str, version: &str, stars: u64, weekly: u64) -> IndexMap<String, Record> {
    IndexMap::from([(name.to_string(), record(name, version, stars, weekly))])
}

#[test]
fn star_delta_above_threshold_records_previous_values() {
    let (_temp_dir, store) = create_test_store();
    store.save(single("react", "18.2.0", 1_000, 0)).unwrap();

    store.save(single("react", "18.2.0", 1_101, 0)).unwrap();

    let history = store.history("react");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].github_stars, 1_000);
    assert_eq!(history[0].version, "18.2.0");
}

#[test]
fn star_delta_at_threshold_records_nothing() {
    let (_temp_dir, store) = create_test_store();
    store.save(single("react", "18.2.0", 1_000, 0)).unwrap();

    store.save(single("react", "18.2.0", 1_100, 0)).unwrap();

    assert!(store.history("react").is_empty());
}

#[test]
fn history_keeps_ten_most_recent_entries() {
    let (_temp_dir, store) = create_test_store();
    let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

    for i in 0..=12u64 {
        store
            .save_at(
                single("vue", &format!("3.{}.0", i), 0, 0),
                start + Duration::days(i as i64),
            )
            .unwrap();
    }

    let history = store.history("vue");
    assert_eq!(history.len(), 10);
    assert_eq!(history.first().unwrap().version, "3.2.0");
    assert_eq!(history.last().unwrap().version, "3.11.0");
}

#[test]
fn saving_same_records_twice_adds_no_history() {
    let (_temp_dir, store) = create_test_store();
    let records = single("svelte", "5.0.0", 80_000, 1_000_000);

    store.save(records.clone()).unwrap();
    store.save(records.clone()).unwrap();

    assert_eq!(store.load(), records);
    assert!(store.history("svelte").is_empty());
}

#[test]
fn custom_policy_changes_download_threshold() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let policy = SnapshotPolicy {
        weekly_download_delta: 10,
        ..SnapshotPolicy::default()
    };
    let store = SnapshotStore::with_policy(&temp_dir.path().join("stacks_data.json"), policy);
    store.save(single("zod", "3.0.0", 0, 100)).unwrap();

    store.save(single("zod", "3.0.0", 0, 111)).unwrap();

    assert_eq!(store.history("zod").len(), 1);
}

#[test]
fn queries_read_latest_saved_state() {
    let (_temp_dir, store) = create_test_store();
    let mut records = IndexMap::new();
    records.insert("a".to_string(), record("A", "1.0.0", 10, 0));
    records.insert("b".to_string(), record("B", "1.0.0", 30, 0));
    records.insert("c".to_string(), record("C", "1.0.0", 20, 0));
    store.save(records).unwrap();

    let top: Vec<String> = store
        .trending(TrendingSort::Stars, 2)
        .into_iter()
        .map(|r| r.name)
        .collect();

    assert_eq!(top, vec!["B", "C"]);
    assert_eq!(store.metadata().total_count, 3);
}

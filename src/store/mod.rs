//! JSON snapshot store with bounded per-package history
//!
//! # Modules
//!
//! - [`snapshot`]: persistence, history snapshots and atomic writes
//! - [`query`]: read helpers (lookup, category, search, trending, outdated)
//! - [`error`]: storage error types

pub mod error;
pub mod query;
pub mod snapshot;

pub use query::{ThresholdOutOfRange, TrendingSort};
pub use snapshot::{SnapshotStore, StoreMetadata, StoredPackage};

//! Package data model shared by sources, the reconciler and the store
//!
//! - [`types`]: records, popularity counters, categories and history entries
//! - [`normalize`]: version, release date and display name normalization

pub mod normalize;
pub mod types;

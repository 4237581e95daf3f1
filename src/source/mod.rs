//! Registry access layer
//!
//! Each upstream registry is wrapped in a [`registry::PackageSource`] that
//! reports the latest release and popularity counters for one package id.
//! Failures never escape a source: they are logged and degrade to an absent
//! release or zeroed counters.
//!
//! # Modules
//!
//! - [`registry`]: the `PackageSource` trait and `LatestRelease`
//! - [`registries`]: npm, PyPI and GitHub implementations
//! - [`error`]: error classification for registry calls

pub mod error;
pub mod registries;
pub mod registry;

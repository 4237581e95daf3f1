//! Tracks versions and popularity of software packages across npm, PyPI
//! and GitHub.
//!
//! # Modules
//!
//! - [`config`]: tracker configuration, constants and paths
//! - [`package`]: record types and normalization
//! - [`source`]: registry clients behind the `PackageSource` trait
//! - [`reconcile`]: merges source results into one record per package
//! - [`store`]: JSON snapshot store with history and queries
//! - [`refresh`]: refresh cycles over configured packages
//! - [`scheduler`]: weekly and daily background refreshes
//! - [`server`]: HTTP API
//! - [`cli`]: text rendering and interactive prompts
//! - [`logging`]: tracing subscriber setup

pub mod cli;
pub mod config;
pub mod logging;
pub mod package;
pub mod reconcile;
pub mod refresh;
pub mod scheduler;
pub mod server;
pub mod source;
pub mod store;

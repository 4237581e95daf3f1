//! Shared integration test utilities

#![allow(dead_code, unused_imports)]

mod source;
mod store;

pub use source::StaticSource;
pub use store::{create_test_store, package_config, record};

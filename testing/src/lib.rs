//! Shared test fixtures for the confsync workspace.
//!
//! Provides an in-memory [`confsync::ParameterStore`] with call counters
//! and scriptable failures, plus helpers for writing YAML config trees
//! into temporary directories.

mod fixtures;
mod memory_store;

pub use fixtures::*;
pub use memory_store::*;

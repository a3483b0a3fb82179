//! Common test infrastructure
//!
//! This module provides the environment for end-to-end migration tests:
//! a real SQLite task store backed by a temp directory, in-memory fakes
//! for the source catalog and destination service, and a fully wired
//! MigrationManager. Tests should only import from this module, not from
//! internal submodules.

mod env;
mod fakes;

// Public API - this is what tests import
pub use env::{TestEnv, OWNER, TOKEN};
pub use fakes::{FakeCatalog, FakeDestination, FakeFetcher};

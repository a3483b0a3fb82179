//! Portamento Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod config;
pub mod destination;
pub mod migration;
pub mod source;
pub mod sqlite_persistence;
pub mod task_store;

// Re-export commonly used types for convenience
pub use destination::{DestinationService, HttpDestinationClient};
pub use migration::{MigrationManager, MigrationProcessor};
pub use source::{HttpSourceCatalog, HttpTrackFetcher, SourceCatalog, TrackFetcher};
pub use task_store::{SqliteTaskStore, TaskStore};

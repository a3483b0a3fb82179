//! Test environment lifecycle management
//!
//! Wires a MigrationManager against a real on-disk task store and the
//! in-memory fakes. The temp directory holds both the SQLite file and the
//! staged audio, and survives `reopen()` so restart behavior can be
//! exercised against the same database.

use super::fakes::{FakeCatalog, FakeDestination, FakeFetcher};
use portamento::migration::MigrationManager;
use portamento::task_store::SqliteTaskStore;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// External user id most tests migrate under.
pub const OWNER: &str = "user-42";
/// Destination access token stored for OWNER.
pub const TOKEN: &str = "dest-token-42";

/// Fully wired migration stack with fake network adapters.
pub struct TestEnv {
    pub store: Arc<SqliteTaskStore>,
    pub catalog: Arc<FakeCatalog>,
    pub fetcher: Arc<FakeFetcher>,
    pub destination: Arc<FakeDestination>,
    pub manager: Arc<MigrationManager>,
    tempdir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::build(TempDir::new().unwrap())
    }

    /// Reopen the same database with fresh adapters, the way a restarted
    /// process comes up. Fake state does not survive: collections, audio
    /// and recorded destination calls must be registered again.
    pub fn reopen(self) -> Self {
        let TestEnv { tempdir, .. } = self;
        Self::build(tempdir)
    }

    /// Drain both queues to quiescence, the way the one-shot drain
    /// command does.
    pub async fn drain(&self) -> usize {
        self.manager.drain(&CancellationToken::new()).await
    }

    fn build(tempdir: TempDir) -> Self {
        let store = Arc::new(SqliteTaskStore::new(tempdir.path().join("tasks.db")).unwrap());
        let catalog = Arc::new(FakeCatalog::default());
        let fetcher = Arc::new(FakeFetcher::new(tempdir.path().join("audio")));
        let destination = Arc::new(FakeDestination::default());
        let manager = Arc::new(MigrationManager::new(
            store.clone(),
            catalog.clone(),
            fetcher.clone(),
            destination.clone(),
            Duration::from_millis(1),
        ));
        TestEnv {
            store,
            catalog,
            fetcher,
            destination,
            manager,
            tempdir,
        }
    }
}

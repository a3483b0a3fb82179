//! Background processor driving the migration loop.
//!
//! Runs in a loop:
//! 1. Drain both task queues until a pass finds no work
//! 2. Idle for a fixed interval
//! 3. Repeat until shutdown

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::MigrationManager;

/// Background processor that drains the migration queues on a fixed cadence.
pub struct MigrationProcessor {
    /// Reference to the migration manager for queue operations.
    manager: Arc<MigrationManager>,
    /// Pause between drain passes once the queues are empty.
    idle_poll: Duration,
}

impl MigrationProcessor {
    /// Create a new MigrationProcessor.
    pub fn new(manager: Arc<MigrationManager>, idle_poll_secs: u64) -> Self {
        Self {
            manager,
            idle_poll: Duration::from_secs(idle_poll_secs),
        }
    }

    /// Main processing loop - call from a spawned task.
    ///
    /// Drains the queues, idles, and repeats until the token is cancelled.
    /// Cancellation is observed between drain passes and during the idle
    /// wait, never in the middle of an external call.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            "Migration processor starting (idle_poll={}s)",
            self.idle_poll.as_secs()
        );

        loop {
            let advanced = self.manager.drain(&shutdown).await;
            if advanced > 0 {
                info!("Drained {} migration steps", advanced);
            }
            if shutdown.is_cancelled() {
                info!("Migration processor shutting down");
                break;
            }

            // Wait before polling again
            tokio::select! {
                _ = tokio::time::sleep(self.idle_poll) => {}
                _ = shutdown.cancelled() => {
                    info!("Migration processor shutting down during idle wait");
                    break;
                }
            }
        }

        info!("Migration processor stopped");
    }
}

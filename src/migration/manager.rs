//! Core migration orchestration.
//!
//! Advances album and track tasks one step at a time against the source
//! catalog and destination service. Every step commits its progress before
//! the next one starts, so a crash at any point is resumed by simply
//! re-running the loop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::destination::DestinationService;
use crate::source::{SourceCatalog, TrackFetcher};
use crate::task_store::{
    AlbumTask, AlbumTaskStatus, CollectionKind, TaskStore, TrackTaskStatus,
};

/// Errors surfaced to the command front-end.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("User {owner} has no destination access token")]
    MissingCredential { owner: String },

    #[error("Could not recognize '{reference}' as a playlist or an album")]
    UnrecognizedReference { reference: String },
}

/// Coordinates the two-stage migration of source collections into
/// destination playlists.
pub struct MigrationManager {
    /// Store persisting users and both task queues.
    task_store: Arc<dyn TaskStore>,
    /// Read side: collection metadata and track listings.
    catalog: Arc<dyn SourceCatalog>,
    /// Read side: track audio retrieval.
    fetcher: Arc<dyn TrackFetcher>,
    /// Write side: playlists, covers and track uploads.
    destination: Arc<dyn DestinationService>,
    /// Pause after a failed pass before draining continues.
    error_backoff: Duration,
}

impl MigrationManager {
    /// Create a new MigrationManager.
    pub fn new(
        task_store: Arc<dyn TaskStore>,
        catalog: Arc<dyn SourceCatalog>,
        fetcher: Arc<dyn TrackFetcher>,
        destination: Arc<dyn DestinationService>,
        error_backoff: Duration,
    ) -> Self {
        Self {
            task_store,
            catalog,
            fetcher,
            destination,
            error_backoff,
        }
    }

    /// Register a source collection for migration.
    ///
    /// Probes which collection kind the reference denotes, playlists first,
    /// and enqueues under the canonical id the catalog reports. Enqueueing
    /// the same collection twice returns the existing task.
    pub async fn enqueue_album(&self, owner: &str, reference: &str) -> Result<AlbumTask> {
        for kind in CollectionKind::ALL {
            match self.catalog.resolve(reference, kind).await {
                Ok(meta) => {
                    let task = self
                        .task_store
                        .get_or_create_album_task(owner, kind, &meta.id)?;
                    info!(
                        "Enqueued {} {} for user {} as task {}",
                        kind, meta.id, owner, task.id
                    );
                    return Ok(task);
                }
                Err(e) if e.is_classification() => {
                    debug!("Reference {} did not resolve as {}: {}", reference, kind, e);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(MigrationError::UnrecognizedReference {
            reference: reference.to_string(),
        }
        .into())
    }

    /// Advance the least recently touched incomplete album task by one full
    /// stage: resolve metadata, ensure the destination playlist exists, set
    /// its cover and spawn one track task per source track.
    ///
    /// Returns 1 when a task was advanced, 0 when there was nothing to do.
    pub async fn advance_album(&self) -> Result<usize> {
        let task = match self.task_store.get_oldest_incomplete_album_task()? {
            Some(task) => task,
            None => return Ok(0),
        };
        debug!(
            "Advancing {} task {} ({}, status {})",
            task.collection_kind,
            task.id,
            task.source_album_id,
            task.status.as_db_str()
        );

        let token = self.require_token(&task.owner)?;

        let meta = self
            .catalog
            .resolve(&task.source_album_id, task.collection_kind)
            .await
            .with_context(|| {
                format!(
                    "Failed to resolve {} {}",
                    task.collection_kind, task.source_album_id
                )
            })?;

        // The playlist id is committed together with the status change, so
        // a crash after this step cannot create a second playlist on retry.
        let playlist_id = match task.status {
            AlbumTaskStatus::Pending => {
                let title = if meta.name.is_empty() {
                    Uuid::new_v4().to_string()
                } else {
                    meta.name.clone()
                };
                let playlist_id = self
                    .destination
                    .create_playlist(&token, &title)
                    .await
                    .context("Failed to create destination playlist")?;
                self.task_store
                    .set_album_playlist_created(&task.id, &playlist_id)?;
                info!(
                    "Created destination playlist {} for {} {}",
                    playlist_id, task.collection_kind, task.source_album_id
                );
                playlist_id
            }
            _ => task.destination_playlist_id.clone().with_context(|| {
                format!(
                    "Album task {} is {} but has no playlist id",
                    task.id,
                    task.status.as_db_str()
                )
            })?,
        };

        // Re-uploading the cover on a retried task replaces it, which is
        // harmless.
        let cover_url = meta.cover_url.as_deref().with_context(|| {
            format!(
                "{} {} has no cover image",
                task.collection_kind, task.source_album_id
            )
        })?;
        let cover = self
            .catalog
            .download_image(cover_url)
            .await
            .context("Failed to download cover image")?;
        self.destination
            .upload_cover(&token, &playlist_id, &cover)
            .await
            .context("Failed to upload cover image")?;

        let track_ids = self
            .catalog
            .list_tracks(&meta.id, task.collection_kind)
            .await
            .with_context(|| {
                format!(
                    "Failed to list tracks of {} {}",
                    task.collection_kind, task.source_album_id
                )
            })?;
        let track_count = track_ids.len();
        for source_track_id in track_ids {
            self.task_store.get_or_create_track_task(
                &task.owner,
                &task.source_album_id,
                source_track_id.as_deref(),
                &playlist_id,
            )?;
        }

        self.task_store.mark_album_tracks_spawned(&task.id)?;
        info!(
            "Spawned {} track tasks for {} {}",
            track_count, task.collection_kind, task.source_album_id
        );
        Ok(1)
    }

    /// Advance the least recently touched incomplete track task by one
    /// stage: fetch its audio from the source and upload it into the
    /// destination playlist.
    ///
    /// Returns 1 when a task was advanced, 0 when there was nothing to do.
    pub async fn advance_track(&self) -> Result<usize> {
        let task = match self.task_store.get_oldest_incomplete_track_task()? {
            Some(task) => task,
            None => return Ok(0),
        };

        // A track the source never resolved is vacuously finished; there is
        // nothing to fetch or upload.
        let source_track_id = match &task.source_track_id {
            Some(id) => id.clone(),
            None => {
                info!(
                    "Track task {} has no source track, marking it uploaded",
                    task.id
                );
                self.task_store.mark_track_uploaded(&task.id, None)?;
                return Ok(1);
            }
        };
        debug!(
            "Advancing track task {} ({}, status {})",
            task.id,
            source_track_id,
            task.status.as_db_str()
        );

        // No audio is not an error: the task is left exactly as it was and
        // will be picked up again on the next pass.
        let audio_path = match self.fetcher.fetch(&source_track_id).await? {
            Some(path) => path,
            None => {
                warn!(
                    "No audio available for track {}, leaving task {} untouched",
                    source_track_id, task.id
                );
                return Ok(1);
            }
        };

        if task.status == TrackTaskStatus::Pending {
            self.task_store.mark_track_fetched(&task.id)?;
        }

        let token = self.require_token(&task.owner)?;
        let destination_track_id = self
            .destination
            .upload_track(&token, &task.destination_playlist_id, &audio_path)
            .await
            .with_context(|| format!("Failed to upload track {}", source_track_id))?;
        self.task_store
            .mark_track_uploaded(&task.id, Some(&destination_track_id))?;

        info!(
            "Uploaded track {} into playlist {} as {}",
            source_track_id, task.destination_playlist_id, destination_track_id
        );
        Ok(1)
    }

    /// Run album and track stages repeatedly until a full pass finds no
    /// work or the token is cancelled. Returns the number of steps advanced.
    ///
    /// A failing stage aborts its pass: the error is logged with its chain,
    /// the pass still counts as progress so draining continues, and the
    /// loop pauses briefly before retrying. A stage call that has started
    /// always runs to completion; cancellation is observed between passes
    /// and during the error pause.
    pub async fn drain(&self, shutdown: &CancellationToken) -> usize {
        let mut total = 0;
        while !shutdown.is_cancelled() {
            let advanced = match self.drain_pass().await {
                Ok(advanced) => advanced,
                Err(e) => {
                    error!("Migration pass failed: {:#}", e);
                    tokio::select! {
                        _ = tokio::time::sleep(self.error_backoff) => {}
                        _ = shutdown.cancelled() => {}
                    }
                    1
                }
            };
            if advanced == 0 {
                break;
            }
            total += advanced;
        }
        total
    }

    async fn drain_pass(&self) -> Result<usize> {
        let mut advanced = self.advance_album().await?;
        advanced += self.advance_track().await?;
        Ok(advanced)
    }

    fn require_token(&self, owner: &str) -> Result<String> {
        let user = self.task_store.get_user(owner)?;
        match user.and_then(|user| user.destination_access_token) {
            Some(token) => Ok(token),
            None => Err(MigrationError::MissingCredential {
                owner: owner.to_string(),
            }
            .into()),
        }
    }
}

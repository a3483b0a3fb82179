//! Boundary contracts for the source streaming catalog.

use super::models::CollectionMeta;
use crate::task_store::CollectionKind;
use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while resolving a reference against the source catalog.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("No {kind} found for reference {reference}")]
    NotFound {
        kind: CollectionKind,
        reference: String,
    },

    #[error("Reference {reference} does not denote a {kind}")]
    WrongKind {
        kind: CollectionKind,
        reference: String,
    },

    #[error("Source catalog error: {0}")]
    Transport(#[from] anyhow::Error),
}

impl SourceError {
    /// True when the reference simply does not denote this collection kind,
    /// as opposed to a transport-level failure.
    pub fn is_classification(&self) -> bool {
        matches!(
            self,
            SourceError::NotFound { .. } | SourceError::WrongKind { .. }
        )
    }
}

/// Read access to the source streaming catalog.
#[async_trait]
pub trait SourceCatalog: Send + Sync {
    /// Resolve a collection reference of the given kind into its metadata.
    async fn resolve(
        &self,
        reference: &str,
        kind: CollectionKind,
    ) -> Result<CollectionMeta, SourceError>;

    /// List the track ids of a collection in playback order. Entries that
    /// cannot be resolved to a catalog track come back as `None`.
    async fn list_tracks(
        &self,
        collection_id: &str,
        kind: CollectionKind,
    ) -> Result<Vec<Option<String>>>;

    /// Download an image by URL, returning its raw bytes.
    async fn download_image(&self, url: &str) -> Result<Vec<u8>>;
}

/// Retrieval of track audio from the source service.
#[async_trait]
pub trait TrackFetcher: Send + Sync {
    /// Fetch the audio of a track to a local file. Returns `None` when the
    /// service has no audio for the track; transport failures are errors.
    async fn fetch(&self, track_id: &str) -> Result<Option<PathBuf>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_errors_are_recognized() {
        let not_found = SourceError::NotFound {
            kind: CollectionKind::Album,
            reference: "ref-1".to_string(),
        };
        let wrong_kind = SourceError::WrongKind {
            kind: CollectionKind::Playlist,
            reference: "ref-1".to_string(),
        };
        let transport = SourceError::Transport(anyhow::anyhow!("connection reset"));

        assert!(not_found.is_classification());
        assert!(wrong_kind.is_classification());
        assert!(!transport.is_classification());
    }

    #[test]
    fn test_error_messages_name_the_reference() {
        let err = SourceError::NotFound {
            kind: CollectionKind::Playlist,
            reference: "abc123".to_string(),
        };
        assert_eq!(err.to_string(), "No playlist found for reference abc123");
    }
}

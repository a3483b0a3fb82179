//! Boundary contract for the destination streaming service.

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

/// Write access to the destination streaming service.
///
/// Credentials are per-user, so every call takes the owner's access token;
/// implementations are shared across users.
#[async_trait]
pub trait DestinationService: Send + Sync {
    /// Create a playlist with the given title, returning its id.
    async fn create_playlist(&self, token: &str, title: &str) -> Result<String>;

    /// Set the cover image of a playlist. Uploading the same cover again
    /// replaces it and is harmless.
    async fn upload_cover(&self, token: &str, playlist_id: &str, image: &[u8]) -> Result<()>;

    /// Upload a local audio file into a playlist, returning the id the
    /// destination service assigned to the track.
    async fn upload_track(&self, token: &str, playlist_id: &str, audio_path: &Path)
        -> Result<String>;
}

//! HTTP client for the destination streaming service.

use super::models::{CreatePlaylistRequest, CreatePlaylistResponse, UploadTrackResponse};
use super::service::DestinationService;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// HTTP client for communicating with the destination service.
pub struct HttpDestinationClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDestinationClient {
    /// Create a new destination client.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the destination service API
    /// * `timeout_sec` - Request timeout in seconds
    pub fn new(base_url: String, timeout_sec: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .expect("Failed to create HTTP client");

        // Ensure base_url doesn't have trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        Self { client, base_url }
    }

    /// Get the base URL of the destination service.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The service expects its OAuth scheme in the Authorization header.
    fn auth_header(token: &str) -> String {
        format!("OAuth {}", token)
    }
}

#[async_trait]
impl DestinationService for HttpDestinationClient {
    async fn create_playlist(&self, token: &str, title: &str) -> Result<String> {
        let url = format!("{}/playlists", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", Self::auth_header(token))
            .json(&CreatePlaylistRequest::public(title.to_string()))
            .send()
            .await
            .context("Failed to connect to destination service")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Failed to create playlist '{}': status {}",
                title,
                response.status()
            );
        }

        let parsed: CreatePlaylistResponse = response
            .json()
            .await
            .context("Failed to parse playlist creation response")?;
        Ok(parsed.playlist_id)
    }

    async fn upload_cover(&self, token: &str, playlist_id: &str, image: &[u8]) -> Result<()> {
        let url = format!("{}/playlists/{}/cover", self.base_url, playlist_id);
        let response = self
            .client
            .post(&url)
            .header("Authorization", Self::auth_header(token))
            .header("Content-Type", "image/jpeg")
            .body(image.to_vec())
            .send()
            .await
            .context("Failed to connect for cover upload")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Failed to upload cover to playlist {}: status {}",
                playlist_id,
                response.status()
            );
        }
        Ok(())
    }

    async fn upload_track(
        &self,
        token: &str,
        playlist_id: &str,
        audio_path: &Path,
    ) -> Result<String> {
        let filename = audio_path
            .file_name()
            .and_then(|name| name.to_str())
            .context("Audio path has no file name")?;

        let audio = tokio::fs::read(audio_path)
            .await
            .with_context(|| format!("Failed to read audio file {:?}", audio_path))?;

        let url = format!(
            "{}/playlists/{}/tracks?filename={}",
            self.base_url, playlist_id, filename
        );
        let response = self
            .client
            .post(&url)
            .header("Authorization", Self::auth_header(token))
            .header("Content-Type", "audio/mpeg")
            .body(audio)
            .send()
            .await
            .context("Failed to connect for track upload")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Failed to upload track {} to playlist {}: status {}",
                filename,
                playlist_id,
                response.status()
            );
        }

        let parsed: UploadTrackResponse = response
            .json()
            .await
            .context("Failed to parse track upload response")?;
        Ok(parsed.track_id)
    }
}

//! HTTP client fetching track audio from the source service.

use super::catalog::TrackFetcher;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// Downloads track audio over HTTP into a local spool directory.
pub struct HttpTrackFetcher {
    client: reqwest::Client,
    base_url: String,
    download_dir: PathBuf,
}

impl HttpTrackFetcher {
    /// Create a new track fetcher.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the source audio service
    /// * `timeout_sec` - Request timeout in seconds
    /// * `download_dir` - Directory audio files are written into
    pub fn new<P: AsRef<Path>>(base_url: String, timeout_sec: u64, download_dir: P) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .expect("Failed to create HTTP client");

        // Ensure base_url doesn't have trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        Self {
            client,
            base_url,
            download_dir: download_dir.as_ref().to_path_buf(),
        }
    }

    /// Local file a track's audio is downloaded to.
    fn audio_path(&self, track_id: &str) -> PathBuf {
        self.download_dir.join(format!("{}.mp3", track_id))
    }
}

#[async_trait]
impl TrackFetcher for HttpTrackFetcher {
    async fn fetch(&self, track_id: &str) -> Result<Option<PathBuf>> {
        let url = format!("{}/tracks/{}/audio", self.base_url, track_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to connect for track download")?;

        // The service answers 404 for tracks it has no audio for
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            anyhow::bail!("Track download failed with status: {}", response.status());
        }

        let dest = self.audio_path(track_id);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create download directory")?;
        }

        let bytes = response
            .bytes()
            .await
            .context("Failed to read audio body")?;

        let mut file = File::create(&dest)
            .await
            .context("Failed to create audio file")?;

        file.write_all(&bytes)
            .await
            .context("Failed to write audio file")?;

        file.flush().await.context("Failed to flush audio file")?;

        Ok(Some(dest))
    }
}

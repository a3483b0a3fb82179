//! HTTP client for the source streaming catalog.

use super::catalog::{SourceCatalog, SourceError};
use super::models::{AlbumTracksPage, CollectionMeta, CollectionResponse, PlaylistItemsPage};
use crate::task_store::CollectionKind;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

/// Page size of the album track listing endpoint.
const ALBUM_TRACKS_PAGE_SIZE: usize = 50;
/// Page size of the playlist item listing endpoint.
const PLAYLIST_ITEMS_PAGE_SIZE: usize = 100;

/// HTTP client for communicating with the source catalog service.
pub struct HttpSourceCatalog {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSourceCatalog {
    /// Create a new source catalog client.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the catalog service (e.g., "https://api.example.com/v1")
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

    /// Get the base URL of the catalog service.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self, kind: CollectionKind, id: &str) -> String {
        match kind {
            CollectionKind::Playlist => format!("{}/playlists/{}", self.base_url, id),
            CollectionKind::Album => format!("{}/albums/{}", self.base_url, id),
        }
    }

    async fn album_track_ids(&self, collection_id: &str) -> Result<Vec<Option<String>>> {
        let mut ids = Vec::new();
        let mut offset = 0;
        loop {
            let url = format!(
                "{}/albums/{}/tracks?limit={}&offset={}",
                self.base_url, collection_id, ALBUM_TRACKS_PAGE_SIZE, offset
            );
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .context("Failed to fetch album tracks")?;

            if !response.status().is_success() {
                anyhow::bail!(
                    "Failed to fetch tracks of album {}: status {}",
                    collection_id,
                    response.status()
                );
            }

            let page: AlbumTracksPage = response
                .json()
                .await
                .context("Failed to parse album tracks page")?;
            let page_len = page.items.len();
            ids.extend(page.items.into_iter().map(|item| item.id));

            if page_len < ALBUM_TRACKS_PAGE_SIZE {
                return Ok(ids);
            }
            offset += page_len;
        }
    }

    async fn playlist_track_ids(&self, collection_id: &str) -> Result<Vec<Option<String>>> {
        let mut ids = Vec::new();
        let mut offset = 0;
        loop {
            let url = format!(
                "{}/playlists/{}/items?limit={}&offset={}",
                self.base_url, collection_id, PLAYLIST_ITEMS_PAGE_SIZE, offset
            );
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .context("Failed to fetch playlist items")?;

            if !response.status().is_success() {
                anyhow::bail!(
                    "Failed to fetch items of playlist {}: status {}",
                    collection_id,
                    response.status()
                );
            }

            let page: PlaylistItemsPage = response
                .json()
                .await
                .context("Failed to parse playlist items page")?;
            let page_len = page.items.len();
            ids.extend(page.items.into_iter().map(|item| item.track_id()));

            if page_len < PLAYLIST_ITEMS_PAGE_SIZE {
                return Ok(ids);
            }
            offset += page_len;
        }
    }
}

#[async_trait]
impl SourceCatalog for HttpSourceCatalog {
    async fn resolve(
        &self,
        reference: &str,
        kind: CollectionKind,
    ) -> Result<CollectionMeta, SourceError> {
        let url = self.collection_url(kind, reference);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch collection from source catalog")?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound {
                kind,
                reference: reference.to_string(),
            });
        }
        if status.is_client_error() {
            return Err(SourceError::WrongKind {
                kind,
                reference: reference.to_string(),
            });
        }
        if !status.is_success() {
            return Err(SourceError::Transport(anyhow::anyhow!(
                "Failed to fetch {} {}: status {}",
                kind,
                reference,
                status
            )));
        }

        let parsed: CollectionResponse = response
            .json()
            .await
            .context("Failed to parse collection response")?;
        Ok(parsed.into_meta())
    }

    async fn list_tracks(
        &self,
        collection_id: &str,
        kind: CollectionKind,
    ) -> Result<Vec<Option<String>>> {
        match kind {
            CollectionKind::Album => self.album_track_ids(collection_id).await,
            CollectionKind::Playlist => self.playlist_track_ids(collection_id).await,
        }
    }

    async fn download_image(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to connect for image download")?;

        if !response.status().is_success() {
            anyhow::bail!("Image download failed with status: {}", response.status());
        }

        let bytes = response
            .bytes()
            .await
            .context("Failed to read image body")?;
        Ok(bytes.to_vec())
    }
}

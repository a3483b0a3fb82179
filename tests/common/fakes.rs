//! In-memory fakes for the network seams
//!
//! The catalog and destination fakes record every call so tests can assert
//! on side effects. Fetched audio is staged as real files under the test
//! environment's temp directory, matching what the HTTP fetcher does.

use anyhow::Result;
use async_trait::async_trait;
use portamento::destination::DestinationService;
use portamento::source::{CollectionMeta, SourceCatalog, SourceError, TrackFetcher};
use portamento::task_store::CollectionKind;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Source catalog serving collections registered by the test.
#[derive(Default)]
pub struct FakeCatalog {
    collections: Mutex<Vec<(String, CollectionKind, CollectionMeta)>>,
    tracks: Mutex<HashMap<String, Vec<Option<String>>>>,
    fail_next_listing: AtomicBool,
}

#[allow(dead_code)]
impl FakeCatalog {
    /// Register a collection under the reference tests enqueue it by.
    pub fn add_collection(&self, reference: &str, kind: CollectionKind, name: &str) {
        let meta = CollectionMeta {
            id: reference.to_string(),
            name: name.to_string(),
            cover_url: Some(format!("https://covers.test/{}.jpg", reference)),
        };
        self.collections
            .lock()
            .unwrap()
            .push((reference.to_string(), kind, meta));
    }

    /// Set the track listing of a collection. `None` entries are positions
    /// the catalog reports without a track id.
    pub fn set_tracks(&self, collection_id: &str, ids: Vec<Option<&str>>) {
        self.tracks.lock().unwrap().insert(
            collection_id.to_string(),
            ids.into_iter().map(|id| id.map(str::to_string)).collect(),
        );
    }

    /// Make the next track listing call fail, as a catalog outage would.
    pub fn fail_next_track_listing(&self) {
        self.fail_next_listing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SourceCatalog for FakeCatalog {
    async fn resolve(
        &self,
        reference: &str,
        kind: CollectionKind,
    ) -> Result<CollectionMeta, SourceError> {
        self.collections
            .lock()
            .unwrap()
            .iter()
            .find(|(r, k, _)| r == reference && *k == kind)
            .map(|(_, _, meta)| meta.clone())
            .ok_or_else(|| SourceError::NotFound {
                kind,
                reference: reference.to_string(),
            })
    }

    async fn list_tracks(
        &self,
        collection_id: &str,
        _kind: CollectionKind,
    ) -> Result<Vec<Option<String>>> {
        if self.fail_next_listing.swap(false, Ordering::SeqCst) {
            anyhow::bail!("track listing unavailable");
        }
        Ok(self
            .tracks
            .lock()
            .unwrap()
            .get(collection_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn download_image(&self, _url: &str) -> Result<Vec<u8>> {
        Ok(vec![0xff, 0xd8, 0xff, 0xe0])
    }
}

/// Track fetcher that stages real audio files on disk.
pub struct FakeFetcher {
    audio_dir: PathBuf,
    available: Mutex<HashSet<String>>,
}

impl FakeFetcher {
    pub fn new(audio_dir: PathBuf) -> Self {
        std::fs::create_dir_all(&audio_dir).unwrap();
        Self {
            audio_dir,
            available: Mutex::new(HashSet::new()),
        }
    }

    /// Make audio for a track available, writing its staged file.
    pub fn add_audio(&self, track_id: &str) {
        let path = self.audio_dir.join(format!("{}.mp3", track_id));
        std::fs::write(&path, b"ID3 fake audio frame").unwrap();
        self.available.lock().unwrap().insert(track_id.to_string());
    }
}

#[async_trait]
impl TrackFetcher for FakeFetcher {
    async fn fetch(&self, track_id: &str) -> Result<Option<PathBuf>> {
        if !self.available.lock().unwrap().contains(track_id) {
            return Ok(None);
        }
        Ok(Some(self.audio_dir.join(format!("{}.mp3", track_id))))
    }
}

/// Destination service recording playlists, covers and uploads.
#[derive(Default)]
pub struct FakeDestination {
    playlists: Mutex<Vec<(String, String)>>,
    covers: Mutex<Vec<String>>,
    uploads: Mutex<Vec<(String, PathBuf)>>,
    tokens_seen: Mutex<HashSet<String>>,
    fail_next_upload: AtomicBool,
}

#[allow(dead_code)]
impl FakeDestination {
    pub fn playlist_count(&self) -> usize {
        self.playlists.lock().unwrap().len()
    }

    pub fn playlist_title(&self, playlist_id: &str) -> Option<String> {
        self.playlists
            .lock()
            .unwrap()
            .iter()
            .find(|(id, _)| id == playlist_id)
            .map(|(_, title)| title.clone())
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    pub fn uploads_for(&self, playlist_id: &str) -> usize {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == playlist_id)
            .count()
    }

    pub fn cover_count_for(&self, playlist_id: &str) -> usize {
        self.covers
            .lock()
            .unwrap()
            .iter()
            .filter(|id| id.as_str() == playlist_id)
            .count()
    }

    pub fn tokens_seen(&self) -> HashSet<String> {
        self.tokens_seen.lock().unwrap().clone()
    }

    /// Make the next track upload fail, as a destination outage would.
    pub fn fail_next_track_upload(&self) {
        self.fail_next_upload.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl DestinationService for FakeDestination {
    async fn create_playlist(&self, token: &str, title: &str) -> Result<String> {
        self.tokens_seen.lock().unwrap().insert(token.to_string());
        let mut playlists = self.playlists.lock().unwrap();
        let id = format!("dest-pl-{}", playlists.len() + 1);
        playlists.push((id.clone(), title.to_string()));
        Ok(id)
    }

    async fn upload_cover(&self, token: &str, playlist_id: &str, image: &[u8]) -> Result<()> {
        anyhow::ensure!(!image.is_empty(), "empty cover image");
        self.tokens_seen.lock().unwrap().insert(token.to_string());
        self.covers.lock().unwrap().push(playlist_id.to_string());
        Ok(())
    }

    async fn upload_track(
        &self,
        token: &str,
        playlist_id: &str,
        audio_path: &Path,
    ) -> Result<String> {
        if self.fail_next_upload.swap(false, Ordering::SeqCst) {
            anyhow::bail!("track upload unavailable");
        }
        anyhow::ensure!(
            audio_path.exists(),
            "staged audio {:?} does not exist",
            audio_path
        );
        self.tokens_seen.lock().unwrap().insert(token.to_string());
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push((playlist_id.to_string(), audio_path.to_path_buf()));
        Ok(format!("dest-track-{}", uploads.len()))
    }
}

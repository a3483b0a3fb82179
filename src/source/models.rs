//! Models for the source catalog API responses.
//!
//! These types match the JSON returned by the source streaming catalog and
//! include conversion into the metadata the migration core works with.

use serde::Deserialize;

/// Resolved collection metadata used to drive a migration.
#[derive(Clone, Debug, PartialEq)]
pub struct CollectionMeta {
    /// Canonical collection id in the source catalog
    pub id: String,
    /// Display name, may be empty
    pub name: String,
    /// URL of the primary cover image, if the collection has one
    pub cover_url: Option<String>,
}

/// Collection payload returned for both albums and playlists
#[derive(Clone, Debug, Deserialize)]
pub struct CollectionResponse {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub images: Vec<ImageRef>,
}

/// Image entry of a collection payload
#[derive(Clone, Debug, Deserialize)]
pub struct ImageRef {
    pub url: String,
}

impl CollectionResponse {
    /// Collapse the payload into migration metadata. The first listed image
    /// is the largest one and becomes the cover.
    pub fn into_meta(self) -> CollectionMeta {
        CollectionMeta {
            id: self.id,
            name: self.name,
            cover_url: self.images.into_iter().next().map(|image| image.url),
        }
    }
}

/// One page of an album's track listing
#[derive(Clone, Debug, Deserialize)]
pub struct AlbumTracksPage {
    pub items: Vec<AlbumTrackItem>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AlbumTrackItem {
    pub id: Option<String>,
}

/// One page of a playlist's item listing
#[derive(Clone, Debug, Deserialize)]
pub struct PlaylistItemsPage {
    pub items: Vec<PlaylistItem>,
}

/// Playlist entry wrapping its track. Both levels are nullable: the entry
/// may carry no track at all, and local tracks carry no id.
#[derive(Clone, Debug, Deserialize)]
pub struct PlaylistItem {
    pub track: Option<PlaylistTrack>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PlaylistTrack {
    pub id: Option<String>,
}

impl PlaylistItem {
    /// Track id of this entry, if the entry resolves to a catalog track.
    pub fn track_id(self) -> Option<String> {
        self.track.and_then(|track| track.id)
    }
}

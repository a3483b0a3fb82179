//! Models for the destination service API.

use serde::{Deserialize, Serialize};

/// Request body for playlist creation
#[derive(Clone, Debug, Serialize)]
pub struct CreatePlaylistRequest {
    pub title: String,
    pub visibility: String,
}

impl CreatePlaylistRequest {
    /// Playlists are created publicly visible so their owner can share them
    /// right away.
    pub fn public(title: String) -> Self {
        Self {
            title,
            visibility: "public".to_string(),
        }
    }
}

/// Response of playlist creation
#[derive(Clone, Debug, Deserialize)]
pub struct CreatePlaylistResponse {
    pub playlist_id: String,
}

/// Response of a track upload
#[derive(Clone, Debug, Deserialize)]
pub struct UploadTrackResponse {
    pub track_id: String,
}

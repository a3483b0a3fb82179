//! Data models for the migration task store.
//!
//! Defines users, album/track tasks, the explicit task state machines, and the
//! per-album progress summary used for status reporting.

use std::fmt;

/// Kind of source collection a task refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    Playlist,
    Album,
}

impl CollectionKind {
    /// All kinds, in the order enqueue probes them against the source catalog.
    pub const ALL: [CollectionKind; 2] = [CollectionKind::Playlist, CollectionKind::Album];

    pub fn as_db_str(&self) -> &'static str {
        match self {
            CollectionKind::Playlist => "PLAYLIST",
            CollectionKind::Album => "ALBUM",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "PLAYLIST" => Some(CollectionKind::Playlist),
            "ALBUM" => Some(CollectionKind::Album),
            _ => None,
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CollectionKind::Playlist => "playlist",
            CollectionKind::Album => "album",
        };
        write!(f, "{}", name)
    }
}

/// Status of an album task.
///
/// Forward-only: Pending → PlaylistCreated → TracksSpawned. An album task is
/// done once its track tasks have been spawned, not once they have uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlbumTaskStatus {
    Pending,
    PlaylistCreated,
    TracksSpawned, // terminal
}

impl AlbumTaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AlbumTaskStatus::TracksSpawned)
    }

    pub fn as_db_str(&self) -> &'static str {
        match self {
            AlbumTaskStatus::Pending => "PENDING",
            AlbumTaskStatus::PlaylistCreated => "PLAYLIST_CREATED",
            AlbumTaskStatus::TracksSpawned => "TRACKS_SPAWNED",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(AlbumTaskStatus::Pending),
            "PLAYLIST_CREATED" => Some(AlbumTaskStatus::PlaylistCreated),
            "TRACKS_SPAWNED" => Some(AlbumTaskStatus::TracksSpawned),
            _ => None,
        }
    }
}

/// Status of a track task.
///
/// Forward-only: Pending → Fetched → Uploaded. Fetched marks a successful
/// audio download whose upload has not been confirmed yet; the audio handle
/// itself is not persisted, so a resumed Fetched task is fetched again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackTaskStatus {
    Pending,
    Fetched,
    Uploaded, // terminal
}

impl TrackTaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TrackTaskStatus::Uploaded)
    }

    pub fn as_db_str(&self) -> &'static str {
        match self {
            TrackTaskStatus::Pending => "PENDING",
            TrackTaskStatus::Fetched => "FETCHED",
            TrackTaskStatus::Uploaded => "UPLOADED",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(TrackTaskStatus::Pending),
            "FETCHED" => Some(TrackTaskStatus::Fetched),
            "UPLOADED" => Some(TrackTaskStatus::Uploaded),
            _ => None,
        }
    }
}

/// A user of the migration service.
///
/// Created lazily on first contact and never deleted. The destination access
/// token is the user's credential for the destination streaming service.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique identifier (UUID)
    pub id: String,
    /// Identifier assigned by the front-end (unique)
    pub external_user_id: String,
    /// Destination-service OAuth token, if the user has set one
    pub destination_access_token: Option<String>,
    /// Unix timestamp of row creation
    pub created_at: i64,
    /// Unix timestamp of last mutation
    pub updated_at: i64,
}

/// Persisted record tracking migration of one source collection to one
/// destination playlist.
#[derive(Debug, Clone)]
pub struct AlbumTask {
    /// Unique identifier (UUID)
    pub id: String,
    /// External user id of the requesting user
    pub owner: String,
    /// Whether the source collection is an album or a playlist
    pub collection_kind: CollectionKind,
    /// Canonical collection id in the source catalog
    pub source_album_id: String,
    /// Destination playlist id, set once when the playlist is created
    pub destination_playlist_id: Option<String>,
    pub status: AlbumTaskStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Persisted record tracking migration of one source track into an
/// already-created destination playlist.
#[derive(Debug, Clone)]
pub struct TrackTask {
    /// Unique identifier (UUID)
    pub id: String,
    /// External user id of the requesting user
    pub owner: String,
    /// Source collection the track was enumerated from
    pub source_album_id: String,
    /// Source track id; absent when enumeration yielded a gap
    pub source_track_id: Option<String>,
    /// Destination playlist the track uploads into
    pub destination_playlist_id: String,
    /// Destination track id, set on successful upload
    pub destination_track_id: Option<String>,
    pub status: TrackTaskStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Per-album completion summary for the status report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumProgress {
    pub source_album_id: String,
    pub completed_tracks: i64,
    pub total_tracks: i64,
}

impl fmt::Display for AlbumProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] [{} / {}]",
            self.source_album_id, self.completed_tracks, self.total_tracks
        )
    }
}

/// Format the status report, one line per album.
pub fn format_album_progress(albums: &[AlbumProgress]) -> String {
    albums
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_kind_conversion() {
        assert_eq!(CollectionKind::Playlist.as_db_str(), "PLAYLIST");
        assert_eq!(CollectionKind::Album.as_db_str(), "ALBUM");

        assert_eq!(
            CollectionKind::from_db_str("PLAYLIST"),
            Some(CollectionKind::Playlist)
        );
        assert_eq!(
            CollectionKind::from_db_str("ALBUM"),
            Some(CollectionKind::Album)
        );
        assert_eq!(CollectionKind::from_db_str("invalid"), None);
    }

    #[test]
    fn test_collection_kind_probe_order() {
        // Playlist is probed before album when classifying a reference
        assert_eq!(
            CollectionKind::ALL,
            [CollectionKind::Playlist, CollectionKind::Album]
        );
    }

    #[test]
    fn test_album_status_is_terminal() {
        assert!(!AlbumTaskStatus::Pending.is_terminal());
        assert!(!AlbumTaskStatus::PlaylistCreated.is_terminal());
        assert!(AlbumTaskStatus::TracksSpawned.is_terminal());
    }

    #[test]
    fn test_album_status_conversion() {
        for status in [
            AlbumTaskStatus::Pending,
            AlbumTaskStatus::PlaylistCreated,
            AlbumTaskStatus::TracksSpawned,
        ] {
            assert_eq!(AlbumTaskStatus::from_db_str(status.as_db_str()), Some(status));
        }
        assert_eq!(AlbumTaskStatus::from_db_str("invalid"), None);
    }

    #[test]
    fn test_track_status_is_terminal() {
        assert!(!TrackTaskStatus::Pending.is_terminal());
        assert!(!TrackTaskStatus::Fetched.is_terminal());
        assert!(TrackTaskStatus::Uploaded.is_terminal());
    }

    #[test]
    fn test_track_status_conversion() {
        for status in [
            TrackTaskStatus::Pending,
            TrackTaskStatus::Fetched,
            TrackTaskStatus::Uploaded,
        ] {
            assert_eq!(TrackTaskStatus::from_db_str(status.as_db_str()), Some(status));
        }
        assert_eq!(TrackTaskStatus::from_db_str("invalid"), None);
    }

    #[test]
    fn test_album_progress_line_format() {
        let progress = AlbumProgress {
            source_album_id: "album-X".to_string(),
            completed_tracks: 3,
            total_tracks: 3,
        };
        assert_eq!(progress.to_string(), "[album-X] [3 / 3]");
    }

    #[test]
    fn test_format_album_progress_joins_lines() {
        let albums = vec![
            AlbumProgress {
                source_album_id: "a1".to_string(),
                completed_tracks: 1,
                total_tracks: 10,
            },
            AlbumProgress {
                source_album_id: "a2".to_string(),
                completed_tracks: 0,
                total_tracks: 4,
            },
        ];
        assert_eq!(format_album_progress(&albums), "[a1] [1 / 10]\n[a2] [0 / 4]");
        assert_eq!(format_album_progress(&[]), "");
    }
}

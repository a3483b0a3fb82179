//! Database schema for the migration task database.
//!
//! Defines versioned schema migrations for users, album tasks and track tasks.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP};

/// Users and their destination-service credentials
const TASK_USER_TABLE_V1: Table = Table {
    name: "task_user",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!(
            "external_user_id",
            &SqlType::Text,
            non_null = true,
            is_unique = true
        ),
        sqlite_column!("destination_access_token", &SqlType::Text),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!(
            "updated_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
};

/// One row per source collection being migrated
const ALBUM_TASK_TABLE_V1: Table = Table {
    name: "album_task",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("owner", &SqlType::Text, non_null = true),
        sqlite_column!("collection_kind", &SqlType::Text, non_null = true),
        sqlite_column!("source_album_id", &SqlType::Text, non_null = true),
        sqlite_column!("destination_playlist_id", &SqlType::Text),
        sqlite_column!("status", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!(
            "updated_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[
        ("idx_album_task_owner", "owner, created_at"),
        ("idx_album_task_dedup", "source_album_id, collection_kind"),
        ("idx_album_task_status", "status, updated_at"),
    ],
};

/// One row per track being migrated into a destination playlist
const TRACK_TASK_TABLE_V1: Table = Table {
    name: "track_task",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("owner", &SqlType::Text, non_null = true),
        sqlite_column!("source_album_id", &SqlType::Text, non_null = true),
        sqlite_column!("source_track_id", &SqlType::Text),
        sqlite_column!("destination_playlist_id", &SqlType::Text, non_null = true),
        sqlite_column!("destination_track_id", &SqlType::Text),
        sqlite_column!("status", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!(
            "updated_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[
        (
            "idx_track_task_dedup",
            "owner, source_album_id, source_track_id, destination_playlist_id",
        ),
        ("idx_track_task_album", "owner, source_album_id"),
        ("idx_track_task_status", "status, updated_at"),
    ],
};

pub const TASK_STORE_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        TASK_USER_TABLE_V1,
        ALBUM_TASK_TABLE_V1,
        TRACK_TASK_TABLE_V1,
    ],
    migration: None,
}];

//! Task storage and persistence.
//!
//! Provides SQLite-backed storage for migration users, album tasks and
//! track tasks.

use super::models::{
    AlbumProgress, AlbumTask, AlbumTaskStatus, CollectionKind, TrackTask, TrackTaskStatus, User,
};
use super::schema::TASK_STORE_VERSIONED_SCHEMAS;
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;
use uuid::Uuid;

/// Trait for migration task storage operations.
///
/// Provides methods for managing users, album tasks and track tasks,
/// including the duplicate-collapsing enqueue operations and the
/// oldest-first scheduling queries used by the migration loop.
pub trait TaskStore: Send + Sync {
    // === Users ===

    /// Get a user by external id, creating them if they do not exist yet.
    fn get_or_create_user(&self, external_user_id: &str) -> Result<User>;

    /// Get a user by external id.
    fn get_user(&self, external_user_id: &str) -> Result<Option<User>>;

    /// Store a destination-service access token for a user, creating the
    /// user if needed.
    fn set_user_token(&self, external_user_id: &str, token: &str) -> Result<()>;

    // === Enqueueing ===

    /// Get the album task for a source collection, creating a pending one
    /// if none exists. Deduplicates on (source_album_id, collection_kind),
    /// so a collection enqueued by two users is migrated once.
    fn get_or_create_album_task(
        &self,
        owner: &str,
        collection_kind: CollectionKind,
        source_album_id: &str,
    ) -> Result<AlbumTask>;

    /// Get the track task for a position of a collection, creating a
    /// pending one if none exists. Deduplicates on
    /// (owner, source_album_id, source_track_id, destination_playlist_id).
    fn get_or_create_track_task(
        &self,
        owner: &str,
        source_album_id: &str,
        source_track_id: Option<&str>,
        destination_playlist_id: &str,
    ) -> Result<TrackTask>;

    // === Scheduling ===

    /// Get the incomplete album task that was touched least recently.
    fn get_oldest_incomplete_album_task(&self) -> Result<Option<AlbumTask>>;

    /// Get the incomplete track task that was touched least recently.
    fn get_oldest_incomplete_track_task(&self) -> Result<Option<TrackTask>>;

    /// Get an album task by id.
    fn get_album_task(&self, id: &str) -> Result<Option<AlbumTask>>;

    /// Get a track task by id.
    fn get_track_task(&self, id: &str) -> Result<Option<TrackTask>>;

    // === State transitions ===

    /// Record the destination playlist created for a pending album task
    /// and advance it to PLAYLIST_CREATED. Both are written in the same
    /// statement so a crash can never leave one without the other.
    fn set_album_playlist_created(
        &self,
        task_id: &str,
        destination_playlist_id: &str,
    ) -> Result<()>;

    /// Advance an album task from PLAYLIST_CREATED to TRACKS_SPAWNED.
    fn mark_album_tracks_spawned(&self, task_id: &str) -> Result<()>;

    /// Advance a track task from PENDING to FETCHED.
    fn mark_track_fetched(&self, task_id: &str) -> Result<()>;

    /// Advance a track task to UPLOADED, recording the destination track
    /// id when the track was actually uploaded. Tracks with no source id
    /// reach UPLOADED directly and keep no destination id.
    fn mark_track_uploaded(&self, task_id: &str, destination_track_id: Option<&str>)
        -> Result<()>;

    // === Reporting ===

    /// List a user's album tasks oldest-enqueued-first, each with its
    /// uploaded/total track counts.
    fn list_albums_with_progress(&self, owner: &str, limit: usize) -> Result<Vec<AlbumProgress>>;
}

/// SQLite-backed migration task store.
pub struct SqliteTaskStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTaskStore {
    /// Create a new SqliteTaskStore.
    ///
    /// Opens an existing database or creates a new one with the current
    /// schema.
    ///
    /// # Arguments
    /// * `db_path` - Path to the SQLite database file
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = if db_path.as_ref().exists() {
            Connection::open_with_flags(
                &db_path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?
        } else {
            let conn = Connection::open(&db_path)?;
            TASK_STORE_VERSIONED_SCHEMAS
                .last()
                .context("No schemas defined")?
                .create(&conn)?;
            info!("Created new task database at {:?}", db_path.as_ref());
            conn
        };

        // Read the database version
        let db_version = conn
            .query_row("PRAGMA user_version;", [], |row| row.get::<usize, i64>(0))
            .context("Failed to read database version")?
            - BASE_DB_VERSION as i64;

        if db_version < 0 {
            bail!(
                "Task database version {} is too old, does not contain base db version {}",
                db_version,
                BASE_DB_VERSION
            );
        }
        let version = db_version as usize;

        let schema_count = TASK_STORE_VERSIONED_SCHEMAS.len();
        if version >= schema_count {
            bail!(
                "Task database version {} is too new (max supported: {})",
                version,
                schema_count - 1
            );
        }

        // Validate schema matches expected structure
        TASK_STORE_VERSIONED_SCHEMAS
            .get(version)
            .context("Failed to get schema")?
            .validate(&conn)?;

        // Run migrations if needed
        Self::migrate_if_needed(&conn, version)?;

        Ok(SqliteTaskStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory store for testing.
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        TASK_STORE_VERSIONED_SCHEMAS
            .last()
            .context("No schemas defined")?
            .create(&conn)?;

        Ok(SqliteTaskStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run any pending migrations.
    fn migrate_if_needed(conn: &Connection, current_version: usize) -> Result<()> {
        let target_version = TASK_STORE_VERSIONED_SCHEMAS.len() - 1;

        if current_version >= target_version {
            return Ok(());
        }

        info!(
            "Migrating task database from version {} to {}",
            current_version, target_version
        );

        for schema in TASK_STORE_VERSIONED_SCHEMAS.iter().skip(current_version + 1) {
            if let Some(migration_fn) = schema.migration {
                info!("Running task database migration to version {}", schema.version);
                migration_fn(conn)?;
            }
        }

        // Update version
        conn.execute(
            &format!(
                "PRAGMA user_version = {}",
                BASE_DB_VERSION + target_version
            ),
            [],
        )?;

        Ok(())
    }

    /// Get a reference to the connection for internal use.
    #[allow(dead_code)]
    pub(crate) fn connection(&self) -> &Arc<Mutex<Connection>> {
        &self.conn
    }

    /// Helper to convert a database row to a User.
    fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get("id")?,
            external_user_id: row.get("external_user_id")?,
            destination_access_token: row.get("destination_access_token")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Helper to convert a database row to an AlbumTask.
    fn row_to_album_task(row: &rusqlite::Row) -> rusqlite::Result<AlbumTask> {
        let collection_kind = CollectionKind::from_db_str(&row.get::<_, String>("collection_kind")?)
            .ok_or_else(|| {
                rusqlite::Error::InvalidColumnType(
                    0,
                    "collection_kind".to_string(),
                    rusqlite::types::Type::Text,
                )
            })?;
        let status =
            AlbumTaskStatus::from_db_str(&row.get::<_, String>("status")?).ok_or_else(|| {
                rusqlite::Error::InvalidColumnType(
                    0,
                    "status".to_string(),
                    rusqlite::types::Type::Text,
                )
            })?;
        Ok(AlbumTask {
            id: row.get("id")?,
            owner: row.get("owner")?,
            collection_kind,
            source_album_id: row.get("source_album_id")?,
            destination_playlist_id: row.get("destination_playlist_id")?,
            status,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Helper to convert a database row to a TrackTask.
    fn row_to_track_task(row: &rusqlite::Row) -> rusqlite::Result<TrackTask> {
        let status =
            TrackTaskStatus::from_db_str(&row.get::<_, String>("status")?).ok_or_else(|| {
                rusqlite::Error::InvalidColumnType(
                    0,
                    "status".to_string(),
                    rusqlite::types::Type::Text,
                )
            })?;
        Ok(TrackTask {
            id: row.get("id")?,
            owner: row.get("owner")?,
            source_album_id: row.get("source_album_id")?,
            source_track_id: row.get("source_track_id")?,
            destination_playlist_id: row.get("destination_playlist_id")?,
            destination_track_id: row.get("destination_track_id")?,
            status,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Get current timestamp in seconds.
    fn now() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64
    }
}

impl TaskStore for SqliteTaskStore {
    // === Users ===

    fn get_or_create_user(&self, external_user_id: &str) -> Result<User> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let existing = tx
            .query_row(
                "SELECT * FROM task_user WHERE external_user_id = ?1",
                params![external_user_id],
                Self::row_to_user,
            )
            .optional()?;
        if let Some(user) = existing {
            tx.commit()?;
            return Ok(user);
        }

        let id = Uuid::new_v4().to_string();
        tx.execute(
            "INSERT INTO task_user (id, external_user_id) VALUES (?1, ?2)",
            params![id, external_user_id],
        )?;
        let user = tx.query_row(
            "SELECT * FROM task_user WHERE id = ?1",
            params![id],
            Self::row_to_user,
        )?;
        tx.commit()?;
        Ok(user)
    }

    fn get_user(&self, external_user_id: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let user = conn
            .query_row(
                "SELECT * FROM task_user WHERE external_user_id = ?1",
                params![external_user_id],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    fn set_user_token(&self, external_user_id: &str, token: &str) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT id FROM task_user WHERE external_user_id = ?1",
                params![external_user_id],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            Some(id) => {
                tx.execute(
                    "UPDATE task_user SET destination_access_token = ?2, updated_at = ?3 WHERE id = ?1",
                    params![id, token, Self::now()],
                )?;
            }
            None => {
                tx.execute(
                    "INSERT INTO task_user (id, external_user_id, destination_access_token) VALUES (?1, ?2, ?3)",
                    params![Uuid::new_v4().to_string(), external_user_id, token],
                )?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    // === Enqueueing ===

    fn get_or_create_album_task(
        &self,
        owner: &str,
        collection_kind: CollectionKind,
        source_album_id: &str,
    ) -> Result<AlbumTask> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let existing = tx
            .query_row(
                "SELECT * FROM album_task WHERE source_album_id = ?1 AND collection_kind = ?2",
                params![source_album_id, collection_kind.as_db_str()],
                Self::row_to_album_task,
            )
            .optional()?;
        if let Some(task) = existing {
            tx.commit()?;
            return Ok(task);
        }

        let id = Uuid::new_v4().to_string();
        tx.execute(
            r#"INSERT INTO album_task (
                id, owner, collection_kind, source_album_id, status
            ) VALUES (?1, ?2, ?3, ?4, ?5)"#,
            params![
                id,
                owner,
                collection_kind.as_db_str(),
                source_album_id,
                AlbumTaskStatus::Pending.as_db_str(),
            ],
        )?;
        let task = tx.query_row(
            "SELECT * FROM album_task WHERE id = ?1",
            params![id],
            Self::row_to_album_task,
        )?;
        tx.commit()?;
        Ok(task)
    }

    fn get_or_create_track_task(
        &self,
        owner: &str,
        source_album_id: &str,
        source_track_id: Option<&str>,
        destination_playlist_id: &str,
    ) -> Result<TrackTask> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        // IS compares null-safely, so positions without a source track id
        // still collapse onto a single row.
        let existing = tx
            .query_row(
                r#"SELECT * FROM track_task
                   WHERE owner = ?1 AND source_album_id = ?2
                     AND source_track_id IS ?3 AND destination_playlist_id = ?4"#,
                params![owner, source_album_id, source_track_id, destination_playlist_id],
                Self::row_to_track_task,
            )
            .optional()?;
        if let Some(task) = existing {
            tx.commit()?;
            return Ok(task);
        }

        let id = Uuid::new_v4().to_string();
        tx.execute(
            r#"INSERT INTO track_task (
                id, owner, source_album_id, source_track_id, destination_playlist_id, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            params![
                id,
                owner,
                source_album_id,
                source_track_id,
                destination_playlist_id,
                TrackTaskStatus::Pending.as_db_str(),
            ],
        )?;
        let task = tx.query_row(
            "SELECT * FROM track_task WHERE id = ?1",
            params![id],
            Self::row_to_track_task,
        )?;
        tx.commit()?;
        Ok(task)
    }

    // === Scheduling ===

    fn get_oldest_incomplete_album_task(&self) -> Result<Option<AlbumTask>> {
        let conn = self.conn.lock().unwrap();
        let task = conn
            .query_row(
                r#"SELECT * FROM album_task
                   WHERE status != ?1
                   ORDER BY updated_at ASC
                   LIMIT 1"#,
                params![AlbumTaskStatus::TracksSpawned.as_db_str()],
                Self::row_to_album_task,
            )
            .optional()?;
        Ok(task)
    }

    fn get_oldest_incomplete_track_task(&self) -> Result<Option<TrackTask>> {
        let conn = self.conn.lock().unwrap();
        let task = conn
            .query_row(
                r#"SELECT * FROM track_task
                   WHERE status != ?1
                   ORDER BY updated_at ASC
                   LIMIT 1"#,
                params![TrackTaskStatus::Uploaded.as_db_str()],
                Self::row_to_track_task,
            )
            .optional()?;
        Ok(task)
    }

    fn get_album_task(&self, id: &str) -> Result<Option<AlbumTask>> {
        let conn = self.conn.lock().unwrap();
        let task = conn
            .query_row(
                "SELECT * FROM album_task WHERE id = ?1",
                params![id],
                Self::row_to_album_task,
            )
            .optional()?;
        Ok(task)
    }

    fn get_track_task(&self, id: &str) -> Result<Option<TrackTask>> {
        let conn = self.conn.lock().unwrap();
        let task = conn
            .query_row(
                "SELECT * FROM track_task WHERE id = ?1",
                params![id],
                Self::row_to_track_task,
            )
            .optional()?;
        Ok(task)
    }

    // === State transitions ===

    fn set_album_playlist_created(
        &self,
        task_id: &str,
        destination_playlist_id: &str,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            r#"UPDATE album_task
               SET destination_playlist_id = ?2, status = ?3, updated_at = ?4
               WHERE id = ?1 AND status = ?5"#,
            params![
                task_id,
                destination_playlist_id,
                AlbumTaskStatus::PlaylistCreated.as_db_str(),
                Self::now(),
                AlbumTaskStatus::Pending.as_db_str(),
            ],
        )?;
        if rows == 0 {
            bail!("Album task {} is not pending, refusing to record playlist", task_id);
        }
        Ok(())
    }

    fn mark_album_tracks_spawned(&self, task_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            r#"UPDATE album_task
               SET status = ?2, updated_at = ?3
               WHERE id = ?1 AND status = ?4"#,
            params![
                task_id,
                AlbumTaskStatus::TracksSpawned.as_db_str(),
                Self::now(),
                AlbumTaskStatus::PlaylistCreated.as_db_str(),
            ],
        )?;
        if rows == 0 {
            bail!(
                "Album task {} has no playlist yet, cannot mark tracks spawned",
                task_id
            );
        }
        Ok(())
    }

    fn mark_track_fetched(&self, task_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            r#"UPDATE track_task
               SET status = ?2, updated_at = ?3
               WHERE id = ?1 AND status = ?4"#,
            params![
                task_id,
                TrackTaskStatus::Fetched.as_db_str(),
                Self::now(),
                TrackTaskStatus::Pending.as_db_str(),
            ],
        )?;
        if rows == 0 {
            bail!("Track task {} is not pending, refusing to mark fetched", task_id);
        }
        Ok(())
    }

    fn mark_track_uploaded(
        &self,
        task_id: &str,
        destination_track_id: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            r#"UPDATE track_task
               SET destination_track_id = ?2, status = ?3, updated_at = ?4
               WHERE id = ?1 AND status != ?3"#,
            params![
                task_id,
                destination_track_id,
                TrackTaskStatus::Uploaded.as_db_str(),
                Self::now(),
            ],
        )?;
        if rows == 0 {
            bail!("Track task {} is already uploaded", task_id);
        }
        Ok(())
    }

    // === Reporting ===

    fn list_albums_with_progress(&self, owner: &str, limit: usize) -> Result<Vec<AlbumProgress>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"SELECT source_album_id FROM album_task
               WHERE owner = ?1
               ORDER BY created_at ASC
               LIMIT ?2"#,
        )?;
        let album_ids: Vec<String> = stmt
            .query_map(params![owner, limit as i64], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;

        let mut albums = Vec::with_capacity(album_ids.len());
        for source_album_id in album_ids {
            let (total_tracks, completed_tracks): (i64, i64) = conn.query_row(
                r#"SELECT
                     COUNT(*),
                     COALESCE(SUM(CASE WHEN status = ?3 THEN 1 ELSE 0 END), 0)
                   FROM track_task
                   WHERE owner = ?1 AND source_album_id = ?2"#,
                params![owner, source_album_id, TrackTaskStatus::Uploaded.as_db_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            albums.push(AlbumProgress {
                source_album_id,
                completed_tracks,
                total_tracks,
            });
        }
        Ok(albums)
    }
}

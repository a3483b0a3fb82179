mod models;
mod schema;
mod store;

pub use models::{
    format_album_progress, AlbumProgress, AlbumTask, AlbumTaskStatus, CollectionKind, TrackTask,
    TrackTaskStatus, User,
};
pub use store::{SqliteTaskStore, TaskStore};

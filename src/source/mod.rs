mod catalog;
mod client;
mod fetcher;
mod models;

pub use catalog::{SourceCatalog, SourceError, TrackFetcher};
pub use client::HttpSourceCatalog;
pub use fetcher::HttpTrackFetcher;
pub use models::CollectionMeta;

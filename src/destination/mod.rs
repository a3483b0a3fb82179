mod client;
mod models;
mod service;

pub use client::HttpDestinationClient;
pub use service::DestinationService;

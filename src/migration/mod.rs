mod manager;
mod processor;

pub use manager::{MigrationError, MigrationManager};
pub use processor::MigrationProcessor;

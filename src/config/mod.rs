mod file_config;

pub use file_config::{FileConfig, MigrationConfig};

use anyhow::{bail, Result};
use std::path::PathBuf;

/// Database file used when neither the CLI nor the config file names one.
const DEFAULT_DB_PATH: &str = "portamento.db";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub source_url: Option<String>,
    pub source_timeout_sec: u64,
    pub destination_url: Option<String>,
    pub destination_timeout_sec: u64,
    pub idle_poll_sec: Option<u64>,
    pub error_backoff_sec: Option<u64>,
    pub download_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_path: PathBuf,
    pub source_url: Option<String>,
    pub source_timeout_sec: u64,
    pub destination_url: Option<String>,
    pub destination_timeout_sec: u64,

    // Migration loop settings (with defaults)
    pub migration: MigrationSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        // TOML overrides CLI for each field
        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

        // Validate that the database can actually be created there
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                bail!("Database directory does not exist: {:?}", parent);
            }
        }

        let source_url = file.source_url.or_else(|| cli.source_url.clone());
        let source_timeout_sec = file.source_timeout_sec.unwrap_or(cli.source_timeout_sec);
        let destination_url = file
            .destination_url
            .or_else(|| cli.destination_url.clone());
        let destination_timeout_sec = file
            .destination_timeout_sec
            .unwrap_or(cli.destination_timeout_sec);

        // Migration settings - merge file config with defaults
        let defaults = MigrationSettings::default();
        let migration_file = file.migration.unwrap_or_default();
        let migration = MigrationSettings {
            idle_poll_sec: migration_file
                .idle_poll_sec
                .or(cli.idle_poll_sec)
                .unwrap_or(defaults.idle_poll_sec),
            error_backoff_sec: migration_file
                .error_backoff_sec
                .or(cli.error_backoff_sec)
                .unwrap_or(defaults.error_backoff_sec),
            download_dir: migration_file
                .download_dir
                .map(PathBuf::from)
                .or_else(|| cli.download_dir.clone())
                .unwrap_or(defaults.download_dir),
        };

        Ok(Self {
            db_path,
            source_url,
            source_timeout_sec,
            destination_url,
            destination_timeout_sec,
            migration,
        })
    }

    /// Base URL of the source catalog, required by networked commands.
    pub fn require_source_url(&self) -> Result<&str> {
        match self.source_url.as_deref() {
            Some(url) => Ok(url),
            None => bail!("source_url must be specified via --source-url or in the config file"),
        }
    }

    /// Base URL of the destination service, required by networked commands.
    pub fn require_destination_url(&self) -> Result<&str> {
        match self.destination_url.as_deref() {
            Some(url) => Ok(url),
            None => bail!(
                "destination_url must be specified via --destination-url or in the config file"
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MigrationSettings {
    /// Pause between drain passes once the queues are empty.
    pub idle_poll_sec: u64,
    /// Pause after a failed pass before draining continues.
    pub error_backoff_sec: u64,
    /// Directory fetched track audio is spooled into.
    pub download_dir: PathBuf,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            idle_poll_sec: 300, // 5 minutes
            error_backoff_sec: 1,
            download_dir: PathBuf::from("/tmp/portamento"),
        }
    }
}

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_path: Option<String>,
    pub source_url: Option<String>,
    pub source_timeout_sec: Option<u64>,
    pub destination_url: Option<String>,
    pub destination_timeout_sec: Option<u64>,

    // Feature configs
    pub migration: Option<MigrationConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct MigrationConfig {
    pub idle_poll_sec: Option<u64>,
    pub error_backoff_sec: Option<u64>,
    pub download_dir: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_full_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
db_path = "/data/tasks.db"
source_url = "https://source.example/api"
destination_url = "https://dest.example/api"

[migration]
idle_poll_sec = 60
download_dir = "/var/spool/audio"
"#
        )
        .unwrap();

        let config = FileConfig::load(file.path()).unwrap();

        assert_eq!(config.db_path, Some("/data/tasks.db".to_string()));
        assert_eq!(
            config.source_url,
            Some("https://source.example/api".to_string())
        );
        let migration = config.migration.unwrap();
        assert_eq!(migration.idle_poll_sec, Some(60));
        assert_eq!(migration.error_backoff_sec, None);
        assert_eq!(migration.download_dir, Some("/var/spool/audio".to_string()));
    }

    #[test]
    fn test_load_empty_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "").unwrap();

        let config = FileConfig::load(file.path()).unwrap();

        assert_eq!(config.db_path, None);
        assert!(config.migration.is_none());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = FileConfig::load(Path::new("/nonexistent/portamento.toml"));
        assert!(result.is_err());
    }
}

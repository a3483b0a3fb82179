use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
use config::{AppConfig, CliConfig, FileConfig};

mod destination;
use destination::HttpDestinationClient;

mod migration;
use migration::{MigrationManager, MigrationProcessor};

mod source;
use source::{HttpSourceCatalog, HttpTrackFetcher};

mod sqlite_persistence;

mod task_store;
use task_store::{format_album_progress, SqliteTaskStore, TaskStore};

/// How many of a user's albums the status command reports.
const STATUS_ALBUM_LIMIT: usize = 5;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite task database file.
    #[clap(long, value_parser = parse_path)]
    pub db: Option<PathBuf>,

    /// Path to a TOML config file. Values in the file override CLI flags.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Base URL of the source catalog service.
    #[clap(long)]
    pub source_url: Option<String>,

    /// Timeout in seconds for source catalog requests.
    #[clap(long, default_value_t = 300)]
    pub source_timeout_sec: u64,

    /// Base URL of the destination playlist service.
    #[clap(long)]
    pub destination_url: Option<String>,

    /// Timeout in seconds for destination requests.
    #[clap(long, default_value_t = 300)]
    pub destination_timeout_sec: u64,

    /// Seconds to idle between drain passes once the queues are empty.
    #[clap(long)]
    pub idle_poll_sec: Option<u64>,

    /// Seconds to back off after a failed pass before draining continues.
    #[clap(long)]
    pub error_backoff_sec: Option<u64>,

    /// Directory where fetched audio files are staged before upload.
    #[clap(long, value_parser = parse_path)]
    pub download_dir: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Queue a source album or playlist for migration.
    Add {
        /// External id of the user the migration belongs to.
        owner: String,
        /// Album or playlist reference to migrate.
        reference: String,
    },
    /// Show progress for a user's oldest album migrations.
    Status {
        /// External id of the user.
        owner: String,
    },
    /// Store a user's destination access token.
    SetToken {
        /// External id of the user.
        owner: String,
        /// Access token for the destination service.
        token: String,
    },
    /// Run the reconciliation loop until interrupted.
    Run,
    /// Drain both task queues once and exit.
    Drain,
}

fn build_manager(config: &AppConfig, task_store: Arc<SqliteTaskStore>) -> Result<Arc<MigrationManager>> {
    let source_url = config.require_source_url()?;
    let catalog = Arc::new(HttpSourceCatalog::new(
        source_url.to_string(),
        config.source_timeout_sec,
    ));
    let fetcher = Arc::new(HttpTrackFetcher::new(
        source_url.to_string(),
        config.source_timeout_sec,
        &config.migration.download_dir,
    ));
    let destination = Arc::new(HttpDestinationClient::new(
        config.require_destination_url()?.to_string(),
        config.destination_timeout_sec,
    ));
    Ok(Arc::new(MigrationManager::new(
        task_store,
        catalog,
        fetcher,
        destination,
        Duration::from_secs(config.migration.error_backoff_sec),
    )))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let cli_config = CliConfig {
        db_path: cli_args.db.clone(),
        source_url: cli_args.source_url.clone(),
        source_timeout_sec: cli_args.source_timeout_sec,
        destination_url: cli_args.destination_url.clone(),
        destination_timeout_sec: cli_args.destination_timeout_sec,
        idle_poll_sec: cli_args.idle_poll_sec,
        error_backoff_sec: cli_args.error_backoff_sec,
        download_dir: cli_args.download_dir.clone(),
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    info!("Opening SQLite task database at {:?}...", config.db_path);
    let task_store = Arc::new(SqliteTaskStore::new(&config.db_path)?);

    match cli_args.command {
        Command::Add { owner, reference } => {
            let user = task_store.get_or_create_user(&owner)?;
            if user.destination_access_token.is_none() {
                bail!(
                    "User {} has no destination access token. Run set-token first.",
                    owner
                );
            }
            let manager = build_manager(&config, task_store)?;
            let task = manager.enqueue_album(&owner, &reference).await?;
            println!(
                "Queued {} {} as task {}",
                task.collection_kind, task.source_album_id, task.id
            );
        }
        Command::Status { owner } => {
            let albums = task_store.list_albums_with_progress(&owner, STATUS_ALBUM_LIMIT)?;
            if albums.is_empty() {
                println!("Nothing queued for user {}", owner);
            } else {
                println!("{}", format_album_progress(&albums));
            }
        }
        Command::SetToken { owner, token } => {
            task_store.set_user_token(&owner, &token)?;
            println!("Token stored for user {}", owner);
        }
        Command::Run => {
            let manager = build_manager(&config, task_store)?;
            let processor = MigrationProcessor::new(manager, config.migration.idle_poll_sec);

            let shutdown = CancellationToken::new();
            let signal_token = shutdown.clone();
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        info!("Shutdown signal received");
                        signal_token.cancel();
                    }
                    Err(e) => error!("Failed to listen for shutdown signal: {}", e),
                }
            });

            processor.run(shutdown).await;
        }
        Command::Drain => {
            let manager = build_manager(&config, task_store)?;
            let advanced = manager.drain(&CancellationToken::new()).await;
            println!("Advanced {} migration steps", advanced);
        }
    }

    Ok(())
}

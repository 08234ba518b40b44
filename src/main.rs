use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ganjoor_server::archive_store::{ArchiveStore, SqliteArchiveStore};
use ganjoor_server::config::{AppConfig, CliConfig, FileConfig};
use ganjoor_server::search::{ArchiveSearchVault, SearchVault};
use ganjoor_server::server::{run_server, RequestsLoggingLevel, ServerConfig};
use ganjoor_server::user::{SqliteUserStore, UserManager};

/// Hours between two runs of the auth token pruning task.
const TOKEN_PRUNE_INTERVAL_HOURS: u64 = 24;

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
    /// Directory holding archive.db and user.db.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Optional TOML config file. Its values override the command line.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3002)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping). 0 disables it.
    #[clap(long, default_value_t = 9092)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// The maximum age of cacheable pages in seconds.
    #[clap(long, default_value_t = 900)]
    pub content_cache_age_sec: usize,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Number of read connections to the archive database.
    #[clap(long, default_value_t = 4)]
    pub read_pool_size: usize,

    /// Auth tokens unused for this many days are deleted. Set to 0 to disable pruning.
    #[clap(long, default_value_t = 30)]
    pub token_retention_days: u64,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_dir: self.db_dir.clone(),
            port: self.port,
            metrics_port: self.metrics_port,
            logging_level: self.logging_level.clone(),
            content_cache_age_sec: self.content_cache_age_sec,
            frontend_dir_path: self.frontend_dir_path.clone(),
            read_pool_size: self.read_pool_size,
            token_retention_days: self.token_retention_days,
        }
    }
}

fn spawn_token_pruning(user_manager: Arc<UserManager>, retention_days: u64) {
    info!(
        "Token pruning enabled: removing tokens unused for {} days, every {} hours",
        retention_days, TOKEN_PRUNE_INTERVAL_HOURS
    );

    tokio::spawn(async move {
        let interval = Duration::from_secs(TOKEN_PRUNE_INTERVAL_HOURS * 60 * 60);
        let mut ticker = tokio::time::interval(interval);

        loop {
            ticker.tick().await;

            match user_manager.prune_unused_auth_tokens(retention_days) {
                Ok(count) => {
                    if count > 0 {
                        info!("Pruned {} unused auth tokens", count);
                    }
                }
                Err(e) => {
                    error!("Failed to prune auth tokens: {}", e);
                }
            }
        }
    });
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
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let app_config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!(
        "Opening SQLite archive database at {:?}...",
        app_config.archive_db_path()
    );
    let archive_store: Arc<dyn ArchiveStore> = Arc::new(SqliteArchiveStore::new(
        app_config.archive_db_path(),
        app_config.read_pool_size,
    )?);

    info!(
        "Opening SQLite user database at {:?}...",
        app_config.user_db_path()
    );
    let user_store = SqliteUserStore::new(app_config.user_db_path())?;
    let user_manager = Arc::new(UserManager::new(
        archive_store.clone(),
        Box::new(user_store),
    ));

    if app_config.token_retention_days > 0 {
        spawn_token_pruning(user_manager.clone(), app_config.token_retention_days);
    }

    let search_vault: Arc<dyn SearchVault> = Arc::new(ArchiveSearchVault::new(
        archive_store.clone(),
        app_config.search.max_results,
    ));

    run_server(
        ServerConfig::from(&app_config),
        archive_store,
        search_vault,
        user_manager,
    )
    .await
}

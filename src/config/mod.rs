mod file_config;

pub use file_config::{FileConfig, PaginationConfig, SearchConfig};

use crate::search::DEFAULT_MAX_RESULTS;
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const DEFAULT_MAX_PAGE_SIZE: usize = 100;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub content_cache_age_sec: usize,
    pub frontend_dir_path: Option<String>,
    pub read_pool_size: usize,
    pub token_retention_days: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub content_cache_age_sec: usize,
    pub frontend_dir_path: Option<String>,
    pub read_pool_size: usize,
    /// Tokens unused for this many days are pruned. 0 disables pruning.
    pub token_retention_days: u64,

    pub search: SearchSettings,
    pub pagination: PaginationSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSettings {
    pub max_results: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationSettings {
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let content_cache_age_sec = file
            .content_cache_age_sec
            .unwrap_or(cli.content_cache_age_sec);
        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());
        let read_pool_size = file.read_pool_size.unwrap_or(cli.read_pool_size).max(1);
        let token_retention_days = file
            .token_retention_days
            .unwrap_or(cli.token_retention_days);

        let search_file = file.search.unwrap_or_default();
        let search = SearchSettings {
            max_results: search_file.max_results.unwrap_or(DEFAULT_MAX_RESULTS),
        };
        if search.max_results == 0 {
            bail!("search.max_results must be greater than 0");
        }

        let pagination_file = file.pagination.unwrap_or_default();
        let pagination = PaginationSettings {
            default_page_size: pagination_file
                .default_page_size
                .unwrap_or(DEFAULT_PAGE_SIZE),
            max_page_size: pagination_file
                .max_page_size
                .unwrap_or(DEFAULT_MAX_PAGE_SIZE),
        };
        if pagination.default_page_size == 0 || pagination.max_page_size == 0 {
            bail!("Page sizes must be greater than 0");
        }
        if pagination.default_page_size > pagination.max_page_size {
            bail!(
                "pagination.default_page_size ({}) exceeds pagination.max_page_size ({})",
                pagination.default_page_size,
                pagination.max_page_size
            );
        }

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            content_cache_age_sec,
            frontend_dir_path,
            read_pool_size,
            token_retention_days,
            search,
            pagination,
        })
    }

    pub fn archive_db_path(&self) -> PathBuf {
        self.db_dir.join("archive.db")
    }

    pub fn user_db_path(&self) -> PathBuf {
        self.db_dir.join("user.db")
    }
}

fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}

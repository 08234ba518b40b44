use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ganjoor_server::archive_store::{ArchiveStore, SqliteArchiveStore};
use ganjoor_server::import::{import_files, ImportFiles, DEFAULT_BATCH_SIZE};

const ARCHIVE_DB_FILE: &str = "archive.db";

#[derive(Parser, Debug)]
#[command(about = "Imports Ganjoor CSV exports into the archive database")]
struct Args {
    /// Directory holding archive.db.
    #[arg(long, conflicts_with = "archive_db")]
    db_dir: Option<PathBuf>,

    /// Path to the archive database file.
    #[arg(long)]
    archive_db: Option<PathBuf>,

    /// Poets CSV: Id, Name, Description, Century.
    #[arg(long)]
    poets: Option<PathBuf>,

    /// Categories CSV: Id, PoetId, ParentId, Title, Url.
    #[arg(long)]
    cats: Option<PathBuf>,

    /// Poems CSV: Id, CatId, Title, Url.
    #[arg(long)]
    poems: Option<PathBuf>,

    /// Verses CSV: Id, PoemId, VOrder, Position, Text.
    #[arg(long)]
    verses: Option<PathBuf>,

    /// Rows written per transaction.
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let db_path = match (args.archive_db, args.db_dir) {
        (Some(path), _) => path,
        (None, Some(dir)) => dir.join(ARCHIVE_DB_FILE),
        (None, None) => bail!("Either --db-dir or --archive-db must be given"),
    };

    let files = ImportFiles {
        poets: args.poets,
        categories: args.cats,
        poems: args.poems,
        verses: args.verses,
    };
    if files.is_empty() {
        bail!("Nothing to import: pass at least one of --poets, --cats, --poems or --verses");
    }

    info!("Ganjoor Import Tool");
    info!("===================");
    info!("Archive database: {}", db_path.display());

    let store = SqliteArchiveStore::new(&db_path, 1)?;
    import_files(&store, &files, args.batch_size)?;

    let counts = store.counts()?;
    info!(
        "Archive now holds {} poets, {} categories, {} poems, {} verses",
        counts.poets, counts.categories, counts.poems, counts.verses
    );
    Ok(())
}

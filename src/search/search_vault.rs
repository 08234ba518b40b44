//! Search vault trait and the archive-backed substring implementation

use crate::archive_store::{ArchiveStore, PoemSummary};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_MAX_RESULTS: usize = 100;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Please provide a search query.")]
    EmptyQuery,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub trait SearchVault: Send + Sync {
    /// Poems whose title or verse text contains `query`, case-insensitively,
    /// optionally restricted to one poet. Each poem appears once.
    fn search(&self, query: &str, poet: Option<i64>) -> Result<Vec<PoemSummary>, SearchError>;

    fn max_results(&self) -> usize;
}

/// Substring search answered by the archive database itself.
pub struct ArchiveSearchVault {
    store: Arc<dyn ArchiveStore>,
    max_results: usize,
}

impl ArchiveSearchVault {
    pub fn new(store: Arc<dyn ArchiveStore>, max_results: usize) -> Self {
        ArchiveSearchVault { store, max_results }
    }
}

impl SearchVault for ArchiveSearchVault {
    fn search(&self, query: &str, poet: Option<i64>) -> Result<Vec<PoemSummary>, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        let results = self.store.search_poems(query, poet, self.max_results)?;
        debug!(
            "Search '{}' (poet {:?}) matched {} poems",
            query,
            poet,
            results.len()
        );
        Ok(results)
    }

    fn max_results(&self) -> usize {
        self.max_results
    }
}

//! Ganjoor Server Library
//!
//! Persian poetry archive: storage, navigation, search, user accounts and the
//! HTTP server on top of them. Exposed as a library for the binaries and tests.

pub mod archive_store;
pub mod config;
pub mod import;
pub mod navigation;
pub mod search;
pub mod server;
pub mod sqlite_persistence;
pub mod user;

// Re-export commonly used types for convenience
pub use archive_store::{ArchiveStore, SqliteArchiveStore};
pub use search::{ArchiveSearchVault, SearchVault};
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig};
pub use user::{SqliteUserStore, UserManager, UserRole};

mod models;
mod schema;
mod store;
mod trait_def;
mod validation;

pub use models::*;
pub use schema::ARCHIVE_VERSIONED_SCHEMAS;
pub use store::{ArchiveTable, SqliteArchiveStore};
pub use trait_def::ArchiveStore;
pub use validation::{ValidationError, ValidationResult, NON_FIELD_ERRORS};

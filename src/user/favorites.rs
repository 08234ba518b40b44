use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A verse a user bookmarked, as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Favorite {
    pub id: usize,
    pub user_id: usize,
    pub poem_id: i64,
    pub verse_id: i64,
    /// Unix seconds.
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct FavoriteQuery {
    pub poem: Option<i64>,
    pub verse: Option<i64>,
}

/// A favorite joined with the archive rows it points at.
#[derive(Debug, Clone, Serialize)]
pub struct FavoriteView {
    pub id: usize,
    pub user: usize,
    pub user_username: String,
    pub poem: i64,
    pub poem_title: String,
    pub verse: i64,
    pub verse_text: String,
    pub poet_name: String,
    pub created_at: String,
}

pub fn format_created_at(unix_seconds: i64) -> String {
    DateTime::<Utc>::from_timestamp(unix_seconds, 0)
        .unwrap_or_default()
        .to_rfc3339()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FavoriteError {
    #[error("This verse has already been added to favorites.")]
    Duplicate,
}

impl FavoriteError {
    pub fn message_fa(&self) -> &'static str {
        match self {
            FavoriteError::Duplicate => "این مصرع قبلاً به علاقه‌مندی‌ها اضافه شده است.",
        }
    }
}

/// Result of a toggle request.
#[derive(Debug, Clone)]
pub enum FavoriteToggle {
    Added(FavoriteView),
    Removed,
}

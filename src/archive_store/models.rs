//! Archive models for the SQLite-backed poetry store.
//!
//! Records (`Poet`, `Category`, `Poem`, `Verse`, `PoemAudio`, `AudioSync`) map
//! one-to-one onto table rows and double as write payloads. The `*Summary`,
//! `*Detail` and `*View` types wrap a record with derived, read-only fields.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Enumerations
// =============================================================================

/// Era a poet belongs to.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Century {
    Ancient,
    #[default]
    Classical,
    Contemporary,
    Modern,
}

impl Century {
    /// All eras in display order.
    pub const ALL: [Century; 4] = [
        Century::Ancient,
        Century::Classical,
        Century::Contemporary,
        Century::Modern,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Century::Ancient => "ancient",
            Century::Classical => "classical",
            Century::Contemporary => "contemporary",
            Century::Modern => "modern",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Century::Ancient => "باستانی",
            Century::Classical => "کلاسیک",
            Century::Contemporary => "معاصر",
            Century::Modern => "نو",
        }
    }
}

impl FromStr for Century {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Century::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("Unknown century '{}'", s))
    }
}

impl fmt::Display for Century {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Placement of a verse line on the page.
///
/// Stored and serialized as its integer code. Codes outside the known set
/// are kept as `Unrecognized` so already-stored rows stay readable.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(into = "i64", from = "i64")]
pub enum VersePosition {
    #[default]
    Right,
    Left,
    CenteredVerse1,
    CenteredVerse2,
    Single,
    Comment,
    Paragraph,
    Unrecognized(i64),
}

impl VersePosition {
    pub fn code(&self) -> i64 {
        match self {
            VersePosition::Right => 0,
            VersePosition::Left => 1,
            VersePosition::CenteredVerse1 => 2,
            VersePosition::CenteredVerse2 => 3,
            VersePosition::Single => 4,
            VersePosition::Comment => 5,
            VersePosition::Paragraph => -1,
            VersePosition::Unrecognized(code) => *code,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            VersePosition::Right => "Right (مصرع اول)",
            VersePosition::Left => "Left (مصرع دوم)",
            VersePosition::CenteredVerse1 => "Centered Verse 1 (ترجیع/ترکیب)",
            VersePosition::CenteredVerse2 => "Centered Verse 2 (ترجیع/ترکیب)",
            VersePosition::Single => "Single (نیمایی/آزاد)",
            VersePosition::Comment => "Comment (توضیح)",
            VersePosition::Paragraph => "Paragraph (نثر)",
            VersePosition::Unrecognized(_) => "Unknown",
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, VersePosition::Unrecognized(_))
    }
}

impl From<i64> for VersePosition {
    fn from(code: i64) -> Self {
        match code {
            0 => VersePosition::Right,
            1 => VersePosition::Left,
            2 => VersePosition::CenteredVerse1,
            3 => VersePosition::CenteredVerse2,
            4 => VersePosition::Single,
            5 => VersePosition::Comment,
            -1 => VersePosition::Paragraph,
            other => VersePosition::Unrecognized(other),
        }
    }
}

impl From<VersePosition> for i64 {
    fn from(position: VersePosition) -> Self {
        position.code()
    }
}

// =============================================================================
// Records
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Poet {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub century: Century,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub image_slug: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "poet")]
    pub poet_id: i64,
    pub title: String,
    #[serde(rename = "parent", default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Poem {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "category")]
    pub category_id: i64,
    pub title: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Verse {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "poem")]
    pub poem_id: i64,
    pub order: i64,
    #[serde(default)]
    pub position: VersePosition,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoemAudio {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "poem")]
    pub poem_id: i64,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub description: Option<String>,
    pub download_url: String,
    #[serde(default)]
    pub is_direct: bool,
    #[serde(default)]
    pub sync_guid: String,
    #[serde(default)]
    pub file_checksum: String,
    #[serde(default)]
    pub is_uploaded: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AudioSync {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "poem")]
    pub poem_id: i64,
    #[serde(rename = "audio")]
    pub audio_id: i64,
    pub verse_order: i64,
    pub millisec: i64,
}

// =============================================================================
// Read models
// =============================================================================

#[derive(Clone, Debug, Serialize)]
pub struct PoetSummary {
    #[serde(flatten)]
    pub poet: Poet,
    pub poems_count: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct PoetDetail {
    #[serde(flatten)]
    pub poet: Poet,
    pub century_display: &'static str,
    pub categories_count: usize,
    pub poems_count: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct CategorySummary {
    #[serde(flatten)]
    pub category: Category,
    pub poet_name: String,
    pub parent_title: Option<String>,
    /// Poems filed directly under this category.
    pub poems_count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Breadcrumb {
    pub id: i64,
    pub title: String,
}

impl From<&Category> for Breadcrumb {
    fn from(category: &Category) -> Self {
        Breadcrumb {
            id: category.id,
            title: category.title.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub summary: CategorySummary,
    pub children: Vec<CategorySummary>,
    pub breadcrumbs: Vec<Breadcrumb>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PoemSummary {
    #[serde(flatten)]
    pub poem: Poem,
    pub category_title: String,
    pub poet_name: String,
    pub verses_count: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct VerseView {
    #[serde(flatten)]
    pub verse: Verse,
    pub position_display: &'static str,
}

impl From<Verse> for VerseView {
    fn from(verse: Verse) -> Self {
        let position_display = verse.position.display_name();
        VerseView {
            verse,
            position_display,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct AudioView {
    #[serde(flatten)]
    pub audio: PoemAudio,
    pub poem_title: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct AudioSyncView {
    #[serde(flatten)]
    pub sync: AudioSync,
    pub poem_title: String,
    pub verse_text: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PoemDetail {
    #[serde(flatten)]
    pub summary: PoemSummary,
    pub poet_id: i64,
    pub verses: Vec<VerseView>,
    /// Uploaded recitations only.
    pub audios: Vec<AudioView>,
}

// =============================================================================
// Queries
// =============================================================================

/// Sort key accepted from the `ordering` query parameter, e.g. `-name`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortOrder {
    pub column: &'static str,
    pub descending: bool,
}

impl SortOrder {
    pub const fn asc(column: &'static str) -> Self {
        SortOrder {
            column,
            descending: false,
        }
    }

    /// Parses `raw` against `allowed` pairs of (public field, SQL column).
    /// Unknown fields yield `None` so callers fall back to their default.
    pub fn parse(raw: &str, allowed: &[(&str, &'static str)]) -> Option<Self> {
        let raw = raw.trim();
        let (field, descending) = match raw.strip_prefix('-') {
            Some(field) => (field, true),
            None => (raw, false),
        };
        allowed
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, column)| SortOrder {
                column,
                descending,
            })
    }

    pub fn to_sql(&self) -> String {
        format!(
            "{} {}",
            self.column,
            if self.descending { "DESC" } else { "ASC" }
        )
    }
}

/// Offset/limit window over a list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
}

/// One window of a list plus the total number of matching rows.
#[derive(Clone, Debug)]
pub struct Page<T> {
    pub count: usize,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct PoetQuery {
    pub century: Option<Century>,
    pub search: Option<String>,
    pub ordering: Option<SortOrder>,
}

#[derive(Clone, Debug, Default)]
pub struct CategoryQuery {
    pub poet: Option<i64>,
    pub parent: Option<i64>,
    pub top_level_only: bool,
    pub search: Option<String>,
    pub ordering: Option<SortOrder>,
}

#[derive(Clone, Debug, Default)]
pub struct PoemQuery {
    pub category: Option<i64>,
    pub poet: Option<i64>,
    pub search: Option<String>,
    pub ordering: Option<SortOrder>,
}

#[derive(Clone, Debug, Default)]
pub struct VerseQuery {
    pub poem: Option<i64>,
    pub position: Option<VersePosition>,
    pub search: Option<String>,
    pub ordering: Option<SortOrder>,
}

#[derive(Clone, Debug, Default)]
pub struct AudioQuery {
    pub poem: Option<i64>,
    pub is_uploaded: Option<bool>,
    pub is_direct: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct AudioSyncQuery {
    pub poem: Option<i64>,
    pub audio: Option<i64>,
    pub ordering: Option<SortOrder>,
}

pub const POET_ORDERING: &[(&str, &str)] = &[("name", "p.name"), ("century", "p.century"), ("id", "p.id")];
pub const CATEGORY_ORDERING: &[(&str, &str)] = &[("title", "c.title"), ("id", "c.id")];
pub const POEM_ORDERING: &[(&str, &str)] = &[("title", "pm.title"), ("id", "pm.id")];
pub const VERSE_ORDERING: &[(&str, &str)] = &[("order", "v.verse_order"), ("id", "v.id")];
pub const AUDIO_SYNC_ORDERING: &[(&str, &str)] =
    &[("verse_order", "s.verse_order"), ("millisec", "s.millisec")];

/// Row totals, used by metrics and the stats endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ArchiveCounts {
    pub poets: usize,
    pub categories: usize,
    pub poems: usize,
    pub verses: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn century_round_trips_through_str() {
        for century in Century::ALL {
            assert_eq!(century.as_str().parse::<Century>().unwrap(), century);
        }
        assert!("medieval".parse::<Century>().is_err());
        assert_eq!(Century::default(), Century::Classical);
    }

    #[test]
    fn verse_position_keeps_unknown_codes() {
        assert_eq!(VersePosition::from(-1), VersePosition::Paragraph);
        assert_eq!(VersePosition::from(9), VersePosition::Unrecognized(9));
        assert_eq!(VersePosition::Unrecognized(9).code(), 9);
        assert!(!VersePosition::from(9).is_recognized());
    }

    #[test]
    fn verse_serializes_position_as_integer() {
        let verse = Verse {
            id: 3,
            poem_id: 7,
            order: 1,
            position: VersePosition::Left,
            text: "بیت".to_string(),
        };
        let json = serde_json::to_value(VerseView::from(verse)).unwrap();
        assert_eq!(json["position"], 1);
        assert_eq!(json["poem"], 7);
        assert_eq!(json["position_display"], "Left (مصرع دوم)");
    }

    #[test]
    fn verse_payload_defaults_position_to_right() {
        let verse: Verse =
            serde_json::from_value(serde_json::json!({"poem": 1, "order": 0, "text": "x"}))
                .unwrap();
        assert_eq!(verse.position, VersePosition::Right);
    }

    #[test]
    fn sort_order_parses_whitelisted_fields_only() {
        assert_eq!(
            SortOrder::parse("-name", POET_ORDERING),
            Some(SortOrder {
                column: "p.name",
                descending: true
            })
        );
        assert_eq!(SortOrder::parse("password", POET_ORDERING), None);
        assert_eq!(SortOrder::parse("id", POET_ORDERING).unwrap().to_sql(), "p.id ASC");
    }
}

//! Validation for archive entities.
//!
//! Each validator trims text fields in place and rejects values the store
//! must never persist. Checks that need the database (foreign keys, verse
//! ownership) live in the store itself and report through the same error type.

use super::models::{AudioSync, Category, Poem, PoemAudio, Poet, Verse};
use thiserror::Error;

/// Field-level rejection carrying both the Persian and English message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: {message_en}")]
    Invalid {
        field: &'static str,
        message_en: String,
        message_fa: String,
    },
    #[error("Verse order {order} is invalid.")]
    InvalidVerseOrder { field: &'static str, order: i64 },
}

/// Key used for errors that do not belong to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

impl ValidationError {
    pub fn invalid(
        field: &'static str,
        message_en: impl Into<String>,
        message_fa: impl Into<String>,
    ) -> Self {
        ValidationError::Invalid {
            field,
            message_en: message_en.into(),
            message_fa: message_fa.into(),
        }
    }

    pub fn missing_reference(field: &'static str, id: i64) -> Self {
        ValidationError::invalid(
            field,
            format!("Invalid pk \"{}\" - object does not exist.", id),
            format!("شناسه «{}» وجود ندارد.", id),
        )
    }

    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::Invalid { field, .. } => field,
            ValidationError::InvalidVerseOrder { field, .. } => field,
        }
    }

    pub fn message_en(&self) -> String {
        match self {
            ValidationError::Invalid { message_en, .. } => message_en.clone(),
            ValidationError::InvalidVerseOrder { order, .. } => {
                format!("Verse order {} is invalid.", order)
            }
        }
    }

    pub fn message_fa(&self) -> String {
        match self {
            ValidationError::Invalid { message_fa, .. } => message_fa.clone(),
            ValidationError::InvalidVerseOrder { order, .. } => {
                format!("ترتیب مصرع {} نامعتبر است.", order)
            }
        }
    }
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

fn require_text(
    value: &mut String,
    field: &'static str,
    message_en: &str,
    message_fa: &str,
) -> ValidationResult<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::invalid(field, message_en, message_fa));
    }
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
    Ok(())
}

fn require_non_negative(value: i64, field: &'static str) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::InvalidVerseOrder {
            field,
            order: value,
        });
    }
    Ok(())
}

pub fn validate_poet(poet: &mut Poet) -> ValidationResult<()> {
    require_text(
        &mut poet.name,
        "name",
        "Poet name cannot be empty.",
        "نام شاعر نمی‌تواند خالی باشد.",
    )
}

pub fn validate_category(category: &mut Category) -> ValidationResult<()> {
    require_text(
        &mut category.title,
        "title",
        "Category title cannot be empty.",
        "عنوان دسته‌بندی نمی‌تواند خالی باشد.",
    )?;
    if category.id != 0 && category.parent_id == Some(category.id) {
        return Err(ValidationError::invalid(
            "parent",
            "A category cannot be its own parent.",
            "یک دسته‌بندی نمی‌تواند والد خودش باشد.",
        ));
    }
    Ok(())
}

pub fn validate_poem(poem: &mut Poem) -> ValidationResult<()> {
    require_text(
        &mut poem.title,
        "title",
        "Poem title cannot be empty.",
        "عنوان شعر نمی‌تواند خالی باشد.",
    )
}

pub fn validate_verse(verse: &mut Verse) -> ValidationResult<()> {
    require_text(
        &mut verse.text,
        "text",
        "Verse text cannot be empty.",
        "متن مصرع نمی‌تواند خالی باشد.",
    )?;
    require_non_negative(verse.order, "order")?;
    if !verse.position.is_recognized() {
        let code = verse.position.code();
        return Err(ValidationError::invalid(
            "position",
            format!("\"{}\" is not a valid choice.", code),
            format!("موقعیت {} معتبر نیست.", code),
        ));
    }
    Ok(())
}

pub fn validate_audio(audio: &mut PoemAudio) -> ValidationResult<()> {
    let url = audio.download_url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ValidationError::invalid(
            "download_url",
            "Download URL must start with http:// or https://",
            "آدرس دانلود باید با http:// یا https:// شروع شود.",
        ));
    }
    audio.download_url = url.to_string();
    Ok(())
}

pub fn validate_audio_sync(sync: &AudioSync) -> ValidationResult<()> {
    require_non_negative(sync.verse_order, "verse_order")?;
    if sync.millisec < 0 {
        return Err(ValidationError::invalid(
            "millisec",
            "Time must be a positive number.",
            "زمان باید عددی مثبت باشد.",
        ));
    }
    Ok(())
}

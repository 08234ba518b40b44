//! Reader display settings.
//!
//! Every user has at most one settings record. A record is created on the
//! first write and later writes only touch the fields they carry.

use crate::archive_store::{ValidationError, ValidationResult};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIN_FONT_SIZE: f64 = 8.0;
pub const MAX_FONT_SIZE: f64 = 48.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Centered,
    Rtl,
    Ltr,
    Justified,
}

impl ViewMode {
    pub const ALL: [ViewMode; 4] = [
        ViewMode::Centered,
        ViewMode::Rtl,
        ViewMode::Ltr,
        ViewMode::Justified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Centered => "centered",
            ViewMode::Rtl => "rtl",
            ViewMode::Ltr => "ltr",
            ViewMode::Justified => "justified",
        }
    }
}

impl FromStr for ViewMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ViewMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| {
                let modes = ViewMode::ALL.map(|m| m.as_str()).join(", ");
                ValidationError::invalid(
                    "view_mode",
                    format!("View mode must be one of: {}", modes),
                    format!("حالت نمایش باید یکی از این موارد باشد: {}", modes),
                )
            })
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored settings of one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    pub id: usize,
    #[serde(rename = "user")]
    pub user_id: usize,
    pub view_mode: ViewMode,
    pub font_size: f64,
    pub show_line_numbers: bool,
    pub last_highlight: Option<String>,
    pub browse_button_visible: bool,
    pub comments_button_visible: bool,
    pub copy_button_visible: bool,
    pub print_button_visible: bool,
    pub home_button_visible: bool,
    pub random_button_visible: bool,
    pub editor_button_visible: bool,
    pub download_button_visible: bool,
}

impl UserSettings {
    pub fn defaults_for(user_id: usize) -> Self {
        UserSettings {
            id: 0,
            user_id,
            view_mode: ViewMode::default(),
            font_size: 16.0,
            show_line_numbers: true,
            last_highlight: None,
            browse_button_visible: true,
            comments_button_visible: true,
            copy_button_visible: true,
            print_button_visible: true,
            home_button_visible: true,
            random_button_visible: true,
            editor_button_visible: true,
            download_button_visible: true,
        }
    }

    /// Validates `update` and applies the fields it carries.
    /// On error nothing is changed.
    pub fn apply(&mut self, update: &UserSettingsUpdate) -> ValidationResult<()> {
        let view_mode = update
            .view_mode
            .as_deref()
            .map(ViewMode::from_str)
            .transpose()?;
        if let Some(font_size) = update.font_size {
            validate_font_size(font_size)?;
        }

        if let Some(view_mode) = view_mode {
            self.view_mode = view_mode;
        }
        if let Some(font_size) = update.font_size {
            self.font_size = font_size;
        }
        if let Some(last_highlight) = &update.last_highlight {
            self.last_highlight = last_highlight.clone();
        }

        let flags = [
            (update.show_line_numbers, &mut self.show_line_numbers),
            (update.browse_button_visible, &mut self.browse_button_visible),
            (
                update.comments_button_visible,
                &mut self.comments_button_visible,
            ),
            (update.copy_button_visible, &mut self.copy_button_visible),
            (update.print_button_visible, &mut self.print_button_visible),
            (update.home_button_visible, &mut self.home_button_visible),
            (update.random_button_visible, &mut self.random_button_visible),
            (update.editor_button_visible, &mut self.editor_button_visible),
            (
                update.download_button_visible,
                &mut self.download_button_visible,
            ),
        ];
        for (value, target) in flags {
            if let Some(value) = value {
                *target = value;
            }
        }
        Ok(())
    }
}

fn validate_font_size(font_size: f64) -> ValidationResult<()> {
    if !(MIN_FONT_SIZE..=MAX_FONT_SIZE).contains(&font_size) {
        return Err(ValidationError::invalid(
            "font_size",
            "Font size must be between 8 and 48.",
            "اندازه قلم باید بین ۸ و ۴۸ باشد.",
        ));
    }
    Ok(())
}

/// Absent keys leave the stored value alone; an explicit `null` clears
/// `last_highlight`.
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Partial settings write.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserSettingsUpdate {
    #[serde(default)]
    pub view_mode: Option<String>,
    #[serde(default)]
    pub font_size: Option<f64>,
    #[serde(default)]
    pub show_line_numbers: Option<bool>,
    #[serde(default, deserialize_with = "present")]
    pub last_highlight: Option<Option<String>>,
    #[serde(default)]
    pub browse_button_visible: Option<bool>,
    #[serde(default)]
    pub comments_button_visible: Option<bool>,
    #[serde(default)]
    pub copy_button_visible: Option<bool>,
    #[serde(default)]
    pub print_button_visible: Option<bool>,
    #[serde(default)]
    pub home_button_visible: Option<bool>,
    #[serde(default)]
    pub random_button_visible: Option<bool>,
    #[serde(default)]
    pub editor_button_visible: Option<bool>,
    #[serde(default)]
    pub download_button_visible: Option<bool>,
}

/// Settings as returned to their owner.
#[derive(Debug, Clone, Serialize)]
pub struct UserSettingsView {
    pub username: String,
    #[serde(flatten)]
    pub settings: UserSettings,
}

//! Task label with a display color and optional icon.

use super::validation::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static TAG_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid tag color regex"));

/// Optional label attached to a task.
///
/// # Invariants
/// - `name` is non-empty.
/// - `color` matches `#RRGGBB`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TagData", into = "TagData")]
pub struct Tag {
    name: String,
    color: String,
    icon: Option<String>,
}

/// Plain wire/storage shape of a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagData {
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub icon: Option<String>,
}

impl Tag {
    pub fn new(
        name: impl Into<String>,
        color: impl Into<String>,
        icon: Option<String>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyTagName);
        }
        let color = color.into();
        if !is_valid_color(&color) {
            return Err(ValidationError::InvalidTagColor(color));
        }
        Ok(Self { name, color, icon })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }
}

impl TryFrom<TagData> for Tag {
    type Error = ValidationError;

    fn try_from(value: TagData) -> Result<Self, Self::Error> {
        Tag::new(value.name, value.color, value.icon)
    }
}

impl From<Tag> for TagData {
    fn from(value: Tag) -> Self {
        Self {
            name: value.name,
            color: value.color,
            icon: value.icon,
        }
    }
}

/// Returns whether `color` is a `#RRGGBB` hex color.
pub fn is_valid_color(color: &str) -> bool {
    TAG_COLOR_RE.is_match(color)
}

//! Note domain model.
//!
//! # Responsibility
//! - Define the persisted `Note` record and the `NoteDraft` write input.
//! - Provide caller-side validation and list preview helpers.
//!
//! # Invariants
//! - `id` and `created_at` never change after creation.
//! - `last_updated` is `None` until the first successful edit.
//! - Field names serialize as `id|title|content|createdAt|lastUpdated`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Default preview length used by list views.
pub const PREVIEW_DEFAULT_CHARS: usize = 100;

/// Stable identifier of one note.
///
/// Stored as plain text so collections written by older clients (numeric
/// timestamp ids) still load.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    /// Generates a fresh collision-free id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for NoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for NoteId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for NoteId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Persisted note record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Assigned at creation, immutable.
    pub id: NoteId,
    pub title: String,
    pub content: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds of the latest edit; absent until edited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<i64>,
}

impl Note {
    /// Returns whether the note was edited at least once.
    pub fn is_edited(&self) -> bool {
        self.last_updated.is_some()
    }

    /// Returns content with whitespace collapsed, capped at `max_chars`.
    ///
    /// Appends `...` when the content was truncated.
    pub fn preview(&self, max_chars: usize) -> String {
        let normalized = WHITESPACE_RE.replace_all(self.content.trim(), " ");
        if normalized.chars().count() <= max_chars {
            return normalized.into_owned();
        }
        let mut truncated = normalized.chars().take(max_chars).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

/// Validation failures detected on the caller side before writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteValidationError {
    EmptyTitle,
    EmptyContent,
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "Title is required"),
            Self::EmptyContent => write!(f, "Content is required"),
        }
    }
}

impl Error for NoteValidationError {}

/// Title/content input for create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    /// Rejects whitespace-only title or content.
    ///
    /// Write paths do not call this; it exists for UI/CLI callers that must
    /// validate before invoking the store.
    pub fn validate(&self) -> Result<(), NoteValidationError> {
        if self.title.trim().is_empty() {
            return Err(NoteValidationError::EmptyTitle);
        }
        if self.content.trim().is_empty() {
            return Err(NoteValidationError::EmptyContent);
        }
        Ok(())
    }
}

//! Owned letter drafts and their ownership invariant.

use crate::{LetterboxError, Principal, error::Result};
use serde::{Deserialize, Serialize};

/// A letter draft owned by exactly one principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub id: String,
    /// Immutable after creation.
    pub owner_id: String,
    pub title: String,
    /// Opaque rich-text payload.
    pub content: String,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds; strictly increases on every mutation.
    pub updated_at: i64,
}

impl Draft {
    /// Fail with [`LetterboxError::Forbidden`] unless `principal` owns this draft.
    ///
    /// # Errors
    ///
    /// Returns [`LetterboxError::Forbidden`] when the owner differs.
    pub fn ensure_owned_by(&self, principal: &Principal) -> Result<()> {
        if self.owner_id == principal.id {
            Ok(())
        } else {
            Err(LetterboxError::Forbidden(format!(
                "draft {} belongs to another user",
                self.id
            )))
        }
    }

    /// Apply `update` and bump `updated_at` to a value strictly after the previous one.
    pub fn apply(&mut self, update: DraftUpdate, now: i64) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(content) = update.content {
            self.content = content;
        }
        self.updated_at = next_updated_at(self.updated_at, now);
    }
}

/// The timestamp a mutation should record: `now`, or one past `previous` when the
/// clock has not advanced.
#[must_use]
pub fn next_updated_at(previous: i64, now: i64) -> i64 {
    now.max(previous.saturating_add(1))
}

/// Fields supplied when creating a draft.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DraftInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

impl DraftInput {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    /// Both `title` and `content` must be non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`LetterboxError::Validation`] naming the missing field.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() || self.content.is_empty() {
            return Err(LetterboxError::Validation(
                "title and content are required".into(),
            ));
        }
        Ok(())
    }
}

/// A partial draft update; absent fields are left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DraftUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl DraftUpdate {
    /// At least one field must be present and no present field may be empty.
    ///
    /// # Errors
    ///
    /// Returns [`LetterboxError::Validation`] for an empty or blank update.
    pub fn validate(&self) -> Result<()> {
        if self.title.is_none() && self.content.is_none() {
            return Err(LetterboxError::Validation(
                "title or content is required".into(),
            ));
        }
        if self.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(LetterboxError::Validation("title must not be empty".into()));
        }
        if self.content.as_deref().is_some_and(str::is_empty) {
            return Err(LetterboxError::Validation(
                "content must not be empty".into(),
            ));
        }
        Ok(())
    }
}

impl From<DraftInput> for DraftUpdate {
    fn from(input: DraftInput) -> Self {
        Self {
            title: Some(input.title),
            content: Some(input.content),
        }
    }
}

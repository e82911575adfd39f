//! The paper draft under revision.
//!
//! A [`Draft`] owns the current text of every section. Its word count is
//! always derived from that text, so there is no cached total that could
//! drift out of step with the content.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::section::SectionKind;

/// Lifecycle status of a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    /// Still being written.
    #[default]
    Draft,
    /// Under review.
    InReview,
    /// Approved by the reviewer.
    Approved,
}

impl DraftStatus {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::InReview => "in_review",
            Self::Approved => "approved",
        }
    }
}

impl std::fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counts whitespace-separated words.
#[must_use]
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// A versioned paper draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    /// Draft identity.
    pub id: Uuid,
    /// Owning session.
    pub session_id: Uuid,
    /// Incremented once per completed edit pass.
    #[serde(default = "first_version")]
    pub version: u32,
    /// Cycle number of the most recent review (0 before any review).
    #[serde(default)]
    pub review_cycle: u32,
    /// Lifecycle status.
    #[serde(default)]
    pub status: DraftStatus,
    /// Creation time.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    sections: BTreeMap<SectionKind, String>,
}

const fn first_version() -> u32 {
    1
}

impl Draft {
    /// Creates an empty version-1 draft for a session.
    #[must_use]
    pub fn new(session_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            session_id,
            version: 1,
            review_cycle: 0,
            status: DraftStatus::Draft,
            created_at: now,
            updated_at: now,
            sections: BTreeMap::new(),
        }
    }

    /// Returns the text of a section, if it has been written.
    #[must_use]
    pub fn section(&self, kind: SectionKind) -> Option<&str> {
        self.sections.get(&kind).map(String::as_str)
    }

    /// Replaces the text of a section.
    pub fn set_section(&mut self, kind: SectionKind, content: impl Into<String>) {
        self.sections.insert(kind, content.into());
        self.updated_at = Utc::now();
    }

    /// Iterates over every stored section in canonical order.
    pub fn sections(&self) -> impl Iterator<Item = (SectionKind, &str)> {
        self.sections.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// Iterates over sections whose text is not blank, in canonical order.
    pub fn populated_sections(&self) -> impl Iterator<Item = (SectionKind, &str)> {
        self.sections().filter(|(_, text)| !text.trim().is_empty())
    }

    /// Whether any section has text.
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.populated_sections().next().is_some()
    }

    /// Word count of a single section.
    #[must_use]
    pub fn section_word_count(&self, kind: SectionKind) -> usize {
        self.section(kind).map_or(0, count_words)
    }

    /// Total word count across all sections.
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.sections.values().map(|s| count_words(s)).sum()
    }

    /// Records a completed edit pass.
    pub fn bump_version(&mut self) {
        self.version = self.version.saturating_add(1);
        self.updated_at = Utc::now();
    }

    /// Renders every populated section under a markdown heading.
    #[must_use]
    pub fn full_text(&self) -> String {
        let mut out = String::new();
        for (kind, text) in self.populated_sections() {
            out.push_str("## ");
            out.push_str(kind.title());
            out.push_str("\n\n");
            out.push_str(text.trim());
            out.push_str("\n\n");
        }
        out
    }
}

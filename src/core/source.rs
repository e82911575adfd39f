//! Bibliographic source records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a source came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// arXiv preprint.
    Arxiv,
    /// Web page.
    #[default]
    Web,
    /// Book.
    Book,
    /// Journal article.
    Journal,
}

/// Credibility rating of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Credibility {
    /// Peer-reviewed or academic host.
    High,
    /// Unknown provenance.
    #[default]
    Medium,
    /// Low-quality host.
    Low,
}

/// An academic or web source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Source identity.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Owning session.
    #[serde(default)]
    pub session_id: Option<Uuid>,
    /// Title.
    #[serde(default)]
    pub title: String,
    /// Author names as listed.
    #[serde(default)]
    pub authors: Vec<String>,
    /// Publication year.
    #[serde(default)]
    pub year: Option<i32>,
    /// Canonical URL.
    #[serde(default)]
    pub url: String,
    /// DOI, if known.
    #[serde(default)]
    pub doi: Option<String>,
    /// Abstract or snippet.
    #[serde(default)]
    pub abstract_text: String,
    /// Generated summary.
    #[serde(default)]
    pub summary: String,
    /// Origin.
    #[serde(default)]
    pub kind: SourceKind,
    /// Ranking score assigned during discovery.
    #[serde(default)]
    pub relevance_score: f64,
    /// Credibility rating.
    #[serde(default)]
    pub credibility: Credibility,
    /// Whether the content could be retrieved.
    #[serde(default = "accessible_by_default")]
    pub accessible: bool,
    /// Retrieval time.
    #[serde(default = "Utc::now")]
    pub retrieved_at: DateTime<Utc>,
    /// Journal name.
    #[serde(default)]
    pub journal: Option<String>,
    /// Journal volume.
    #[serde(default)]
    pub volume: Option<String>,
    /// Journal issue.
    #[serde(default)]
    pub issue: Option<String>,
    /// Page range.
    #[serde(default)]
    pub pages: Option<String>,
    /// Publisher.
    #[serde(default)]
    pub publisher: Option<String>,
}

const fn accessible_by_default() -> bool {
    true
}

impl Default for Source {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id: None,
            title: String::new(),
            authors: Vec::new(),
            year: None,
            url: String::new(),
            doi: None,
            abstract_text: String::new(),
            summary: String::new(),
            kind: SourceKind::Web,
            relevance_score: 0.0,
            credibility: Credibility::Medium,
            accessible: true,
            retrieved_at: Utc::now(),
            journal: None,
            volume: None,
            issue: None,
            pages: None,
            publisher: None,
        }
    }
}

impl Source {
    /// Creates a source with a title and URL.
    #[must_use]
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            ..Self::default()
        }
    }

    /// Short author string: one name, `A & B`, `A, B & C`, or `A et al.`.
    #[must_use]
    pub fn authors_short(&self) -> String {
        match self.authors.as_slice() {
            [] => "Unknown".to_string(),
            [only] => only.clone(),
            [first, .., _] if self.authors.len() > 3 => format!("{first} et al."),
            [init @ .., last] => format!("{} & {last}", init.join(", ")),
        }
    }
}

//! Research sessions and workflow stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Supported citation styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CitationStyle {
    /// American Psychological Association, 7th edition.
    #[default]
    Apa,
    /// Modern Language Association, 9th edition.
    Mla,
    /// Chicago author-date.
    Chicago,
    /// IEEE numbered references.
    Ieee,
    /// Harvard author-date.
    Harvard,
}

impl CitationStyle {
    /// All styles.
    pub const ALL: [Self; 5] = [
        Self::Apa,
        Self::Mla,
        Self::Chicago,
        Self::Ieee,
        Self::Harvard,
    ];

    /// Parses a style name (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "APA" => Some(Self::Apa),
            "MLA" => Some(Self::Mla),
            "CHICAGO" => Some(Self::Chicago),
            "IEEE" => Some(Self::Ieee),
            "HARVARD" => Some(Self::Harvard),
            _ => None,
        }
    }

    /// Returns the canonical upper-case name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Apa => "APA",
            Self::Mla => "MLA",
            Self::Chicago => "CHICAGO",
            Self::Ieee => "IEEE",
            Self::Harvard => "HARVARD",
        }
    }
}

impl std::fmt::Display for CitationStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CitationStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            format!("unknown citation style '{s}' (expected APA, MLA, CHICAGO, IEEE or HARVARD)")
        })
    }
}

/// Status of a research session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Created, not started.
    #[default]
    Draft,
    /// Pipeline running.
    InProgress,
    /// In the review-edit loop.
    Review,
    /// Finished successfully.
    Completed,
    /// Aborted by a fatal error.
    Failed,
}

impl SessionStatus {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::InProgress => "in_progress",
            Self::Review => "review",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline stage a session is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    /// Not started.
    #[default]
    Init,
    /// Refining the topic and formulating a title.
    TopicRefinement,
    /// Searching for sources.
    SourceDiscovery,
    /// Summarizing sources.
    SourceSummarization,
    /// Planning the outline.
    ResearchPlanning,
    /// Writing body sections.
    BodyWriting,
    /// Writing introduction, conclusion and abstract.
    IntroConclusion,
    /// Review-edit loop: reviewing.
    Review,
    /// Review-edit loop: editing.
    Editing,
    /// Relaxed final review.
    FinalReview,
    /// Writing output documents.
    Export,
    /// Done.
    Completed,
    /// Aborted.
    Failed,
}

impl WorkflowStage {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::TopicRefinement => "topic_refinement",
            Self::SourceDiscovery => "source_discovery",
            Self::SourceSummarization => "source_summarization",
            Self::ResearchPlanning => "research_planning",
            Self::BodyWriting => "body_writing",
            Self::IntroConclusion => "intro_conclusion",
            Self::Review => "review",
            Self::Editing => "editing",
            Self::FinalReview => "final_review",
            Self::Export => "export",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One paper-generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Session identity.
    pub id: Uuid,
    /// Topic as given by the user.
    #[serde(default)]
    pub topic: String,
    /// Formulated paper title.
    #[serde(default)]
    pub title: String,
    /// Citation style for the paper.
    #[serde(default)]
    pub citation_style: CitationStyle,
    /// Requested length in words.
    #[serde(default)]
    pub target_word_count: usize,
    /// Journal the paper is aimed at, if any.
    #[serde(default)]
    pub target_journal: Option<String>,
    /// Lifecycle status.
    #[serde(default)]
    pub status: SessionStatus,
    /// Current pipeline stage.
    #[serde(default)]
    pub current_stage: WorkflowStage,
    /// Progress in percent.
    #[serde(default)]
    pub progress: f32,
    /// Message of the error that failed the session.
    #[serde(default)]
    pub last_error: Option<String>,
    /// Creation time.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Last update time.
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Creates a new session for a topic.
    #[must_use]
    pub fn new(topic: impl Into<String>, citation_style: CitationStyle, target_word_count: usize) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            topic: topic.into(),
            title: String::new(),
            citation_style,
            target_word_count,
            target_journal: None,
            status: SessionStatus::Draft,
            current_stage: WorkflowStage::Init,
            progress: 0.0,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Records progress through the pipeline.
    pub fn update_progress(&mut self, stage: WorkflowStage, progress: f32) {
        self.current_stage = stage;
        self.progress = progress.clamp(0.0, 100.0);
        self.updated_at = Utc::now();
    }

    /// Marks the session completed.
    pub fn mark_completed(&mut self) {
        self.status = SessionStatus::Completed;
        self.current_stage = WorkflowStage::Completed;
        self.progress = 100.0;
        self.updated_at = Utc::now();
    }

    /// Marks the session failed, retaining the error message.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = SessionStatus::Failed;
        self.current_stage = WorkflowStage::Failed;
        self.last_error = Some(error.into());
        self.updated_at = Utc::now();
    }
}

//! Issue taxonomy and review feedback.
//!
//! The reviewer creates [`Issue`]s; afterwards only their `resolved` flag
//! changes. One [`Feedback`] is produced per review cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::section::SectionKind;

/// Closed taxonomy of review issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A claim needs a citation.
    MissingCitation,
    /// Statements contradict each other.
    Inconsistency,
    /// A claim is too vague to evaluate.
    #[default]
    VagueClaim,
    /// Formatting problem.
    FormatError,
    /// Register or voice problem.
    StyleIssue,
    /// Grammar problem.
    GrammarError,
    /// Flawed reasoning.
    LogicError,
    /// An argument is left unfinished.
    IncompleteArgument,
}

impl IssueKind {
    /// Parses an issue kind, falling back to [`IssueKind::VagueClaim`].
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "missing_citation" => Self::MissingCitation,
            "inconsistency" => Self::Inconsistency,
            "format_error" => Self::FormatError,
            "style_issue" => Self::StyleIssue,
            "grammar_error" => Self::GrammarError,
            "logic_error" => Self::LogicError,
            "incomplete_argument" => Self::IncompleteArgument,
            _ => Self::VagueClaim,
        }
    }

    /// Returns the snake-case identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MissingCitation => "missing_citation",
            Self::Inconsistency => "inconsistency",
            Self::VagueClaim => "vague_claim",
            Self::FormatError => "format_error",
            Self::StyleIssue => "style_issue",
            Self::GrammarError => "grammar_error",
            Self::LogicError => "logic_error",
            Self::IncompleteArgument => "incomplete_argument",
        }
    }
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of an issue, ordered from most to least severe.
///
/// Discriminants are inverted (`Critical = 0`) so the derived [`Ord`] sorts
/// critical issues first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks approval in every review.
    Critical = 0,
    /// Blocks approval in a standard review.
    Major = 1,
    /// Never blocks approval.
    #[default]
    Minor = 2,
}

impl Severity {
    /// Parses a severity (case-insensitive), falling back to [`Severity::Minor`].
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "critical" => Self::Critical,
            "major" => Self::Major,
            _ => Self::Minor,
        }
    }

    /// Whether this severity blocks standard approval.
    #[must_use]
    pub const fn is_blocking(self) -> bool {
        matches!(self, Self::Critical | Self::Major)
    }

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Major => "major",
            Self::Minor => "minor",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label used for findings that span several sections.
pub const CROSS_SECTION: &str = "cross-section";

/// The section an issue points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SectionRef {
    /// A section in the taxonomy.
    Known(SectionKind),
    /// The synthetic location used by the consistency pass.
    CrossSection,
    /// A name the taxonomy does not recognise (possibly empty).
    Unknown(String),
}

impl SectionRef {
    /// The section kind, if the reference is to a known section.
    #[must_use]
    pub const fn kind(&self) -> Option<SectionKind> {
        match self {
            Self::Known(kind) => Some(*kind),
            Self::CrossSection | Self::Unknown(_) => None,
        }
    }
}

impl From<String> for SectionRef {
    fn from(s: String) -> Self {
        if s.trim() == CROSS_SECTION {
            return Self::CrossSection;
        }
        SectionKind::parse(&s).map_or(Self::Unknown(s), Self::Known)
    }
}

impl From<&str> for SectionRef {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<SectionKind> for SectionRef {
    fn from(kind: SectionKind) -> Self {
        Self::Known(kind)
    }
}

impl From<SectionRef> for String {
    fn from(r: SectionRef) -> Self {
        r.to_string()
    }
}

impl std::fmt::Display for SectionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Known(kind) => f.write_str(kind.as_str()),
            Self::CrossSection => f.write_str(CROSS_SECTION),
            Self::Unknown(name) => f.write_str(name),
        }
    }
}

impl Default for SectionRef {
    fn default() -> Self {
        Self::Unknown(String::new())
    }
}

/// Where an issue was found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueLocation {
    /// Section reference.
    #[serde(default)]
    pub section: SectionRef,
    /// Verbatim passage identifying the problem. May be empty.
    #[serde(default)]
    pub excerpt: String,
}

impl IssueLocation {
    /// Creates a location.
    #[must_use]
    pub fn new(section: impl Into<SectionRef>, excerpt: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            excerpt: excerpt.into(),
        }
    }
}

/// A single review finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Issue identity.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Issue kind.
    #[serde(default)]
    pub kind: IssueKind,
    /// Issue severity.
    #[serde(default)]
    pub severity: Severity,
    /// Location in the paper.
    #[serde(default)]
    pub location: IssueLocation,
    /// What is wrong.
    #[serde(default)]
    pub description: String,
    /// How to fix it.
    #[serde(default)]
    pub suggested_fix: String,
    /// Whether the issue has been addressed.
    #[serde(default)]
    pub resolved: bool,
}

impl Issue {
    /// Creates an unresolved issue.
    #[must_use]
    pub fn new(
        kind: IssueKind,
        severity: Severity,
        location: IssueLocation,
        description: impl Into<String>,
        suggested_fix: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            severity,
            location,
            description: description.into(),
            suggested_fix: suggested_fix.into(),
            resolved: false,
        }
    }
}

/// Per-severity issue counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    /// Critical issues.
    pub critical: usize,
    /// Major issues.
    pub major: usize,
    /// Minor issues.
    pub minor: usize,
}

impl SeverityCounts {
    /// Total issues counted.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.critical + self.major + self.minor
    }
}

/// Outcome of one review cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    /// Feedback identity.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Draft that was reviewed.
    #[serde(default)]
    pub draft_id: Option<Uuid>,
    /// 1-based review cycle.
    #[serde(default = "first_cycle")]
    pub cycle: u32,
    /// Issues found in this cycle.
    #[serde(default)]
    pub issues: Vec<Issue>,
    /// Human-readable summary.
    #[serde(default)]
    pub assessment: String,
    /// Whether the draft passed.
    #[serde(default)]
    pub approved: bool,
    /// When the review finished.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

const fn first_cycle() -> u32 {
    1
}

impl Feedback {
    /// Creates an empty, unapproved feedback record.
    #[must_use]
    pub fn new(draft_id: Uuid, cycle: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            draft_id: Some(draft_id),
            cycle,
            issues: Vec::new(),
            assessment: String::new(),
            approved: false,
            created_at: Utc::now(),
        }
    }

    /// Issues not yet resolved, in discovery order.
    pub fn unresolved(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| !i.resolved)
    }

    /// Number of resolved issues.
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.issues.iter().filter(|i| i.resolved).count()
    }

    /// Counts every issue in this cycle by severity.
    #[must_use]
    pub fn severity_counts(&self) -> SeverityCounts {
        let mut counts = SeverityCounts::default();
        for issue in &self.issues {
            match issue.severity {
                Severity::Critical => counts.critical += 1,
                Severity::Major => counts.major += 1,
                Severity::Minor => counts.minor += 1,
            }
        }
        counts
    }

    /// Whether an unresolved critical issue remains.
    #[must_use]
    pub fn has_unresolved_critical(&self) -> bool {
        self.unresolved().any(|i| i.severity == Severity::Critical)
    }

    /// Whether an unresolved critical or major issue remains.
    #[must_use]
    pub fn has_unresolved_blocking(&self) -> bool {
        self.unresolved().any(|i| i.severity.is_blocking())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(severity: Severity, resolved: bool) -> Issue {
        let mut issue = Issue::new(
            IssueKind::LogicError,
            severity,
            IssueLocation::new(SectionKind::Introduction, "excerpt"),
            "desc",
            "fix",
        );
        issue.resolved = resolved;
        issue
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical < Severity::Major);
        assert!(Severity::Major < Severity::Minor);
    }

    #[test]
    fn test_severity_parse_defaults_to_minor() {
        assert_eq!(Severity::parse("CRITICAL"), Severity::Critical);
        assert_eq!(Severity::parse("major"), Severity::Major);
        assert_eq!(Severity::parse("severe"), Severity::Minor);
    }

    #[test]
    fn test_issue_kind_parse_defaults_to_vague_claim() {
        assert_eq!(IssueKind::parse("missing citation"), IssueKind::MissingCitation);
        assert_eq!(IssueKind::parse("Logic-Error"), IssueKind::LogicError);
        assert_eq!(IssueKind::parse("typo"), IssueKind::VagueClaim);
    }

    #[test]
    fn test_section_ref_serialization() {
        let known: SectionRef = "Literature Review".into();
        assert_eq!(known, SectionRef::Known(SectionKind::LiteratureReview));
        assert_eq!(
            serde_json::to_string(&known).unwrap_or_default(),
            "\"literature_review\""
        );

        let cross: SectionRef = CROSS_SECTION.into();
        assert_eq!(cross, SectionRef::CrossSection);

        let unknown: SectionRef =
            serde_json::from_str("\"appendix\"").unwrap_or_else(|_| unreachable!());
        assert_eq!(unknown, SectionRef::Unknown("appendix".to_string()));
        assert!(unknown.kind().is_none());
    }

    #[test]
    fn test_feedback_blocking_checks() {
        let mut feedback = Feedback::new(Uuid::new_v4(), 2);
        feedback.issues = vec![issue(Severity::Minor, false), issue(Severity::Major, true)];
        assert!(!feedback.has_unresolved_blocking());
        assert!(!feedback.has_unresolved_critical());

        feedback.issues.push(issue(Severity::Major, false));
        assert!(feedback.has_unresolved_blocking());
        assert!(!feedback.has_unresolved_critical());

        feedback.issues.push(issue(Severity::Critical, false));
        assert!(feedback.has_unresolved_critical());
        assert_eq!(
            feedback.severity_counts(),
            SeverityCounts {
                critical: 1,
                major: 2,
                minor: 1
            }
        );
        assert_eq!(feedback.resolved_count(), 1);
    }

    #[test]
    fn test_issue_deserialize_defaults() {
        let issue: Issue = serde_json::from_str(r#"{"location":{"section":"methodology"}}"#)
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(issue.kind, IssueKind::VagueClaim);
        assert_eq!(issue.severity, Severity::Minor);
        assert!(!issue.resolved);
        assert!(issue.location.excerpt.is_empty());
    }

    #[test]
    fn test_issue_without_location_deserializes() {
        let issue: Issue = serde_json::from_str(r#"{"description":"uncited claim"}"#)
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(issue.location, IssueLocation::default());
        assert_eq!(issue.location.section, SectionRef::Unknown(String::new()));
        assert!(issue.location.section.kind().is_none());
        assert_eq!(issue.description, "uncited claim");
    }
}

//! Core data model: sections, drafts, review issues, sessions and sources.
//!
//! Everything here is plain data with local invariants. Nothing in this
//! module talks to a language model, the network or the filesystem.

pub mod draft;
pub mod review;
pub mod section;
pub mod session;
pub mod source;

pub use draft::{Draft, DraftStatus, count_words};
pub use review::{
    CROSS_SECTION, Feedback, Issue, IssueKind, IssueLocation, SectionRef, Severity,
    SeverityCounts,
};
pub use section::SectionKind;
pub use session::{CitationStyle, Session, SessionStatus, WorkflowStage};
pub use source::{Credibility, Source, SourceKind};

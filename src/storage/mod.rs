//! Persistence for sessions, sources, drafts and review feedback.
//!
//! Records are stored as JSON documents so that older rows keep loading
//! after fields are added: anything missing falls back to its serde
//! default.

pub mod artifacts;
pub mod sqlite;

use uuid::Uuid;

use crate::core::{Draft, Feedback, Session, Source};
use crate::error::StorageError;

pub use artifacts::ArtifactStore;
pub use sqlite::SqliteStorage;

/// Row counts across all tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct StorageStats {
    /// Stored sessions.
    pub sessions: usize,
    /// Stored sources.
    pub sources: usize,
    /// Stored drafts.
    pub drafts: usize,
    /// Stored feedback records.
    pub feedback: usize,
}

/// Keyed save/load of pipeline records.
pub trait Storage: Send {
    /// Creates the schema if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the schema cannot be created.
    fn init(&mut self) -> Result<(), StorageError>;

    /// Whether the schema exists.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the database cannot be queried.
    fn is_initialized(&self) -> Result<bool, StorageError>;

    /// Inserts or replaces a session.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on database or serialization failure.
    fn save_session(&mut self, session: &Session) -> Result<(), StorageError>;

    /// Loads a session by id.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on database or deserialization failure.
    fn load_session(&self, id: Uuid) -> Result<Option<Session>, StorageError>;

    /// Most recently updated sessions first.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on database or deserialization failure.
    fn list_sessions(&self, limit: usize) -> Result<Vec<Session>, StorageError>;

    /// Replaces the sources stored for a session.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on database or serialization failure.
    fn save_sources(&mut self, session_id: Uuid, sources: &[Source]) -> Result<(), StorageError>;

    /// Sources of a session, highest relevance first.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on database or deserialization failure.
    fn load_sources(&self, session_id: Uuid) -> Result<Vec<Source>, StorageError>;

    /// Inserts or replaces a draft.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on database or serialization failure.
    fn save_draft(&mut self, draft: &Draft) -> Result<(), StorageError>;

    /// Highest-version draft of a session.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on database or deserialization failure.
    fn load_draft(&self, session_id: Uuid) -> Result<Option<Draft>, StorageError>;

    /// Inserts or replaces a feedback record.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on database or serialization failure.
    fn save_feedback(&mut self, feedback: &Feedback) -> Result<(), StorageError>;

    /// Feedback for a draft in cycle order.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on database or deserialization failure.
    fn load_feedback(&self, draft_id: Uuid) -> Result<Vec<Feedback>, StorageError>;

    /// Row counts.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the database cannot be queried.
    fn stats(&self) -> Result<StorageStats, StorageError>;

    /// Loads a session or fails with [`StorageError::SessionNotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::SessionNotFound`] if no such session exists.
    fn require_session(&self, id: Uuid) -> Result<Session, StorageError> {
        self.load_session(id)?
            .ok_or_else(|| StorageError::SessionNotFound { id: id.to_string() })
    }
}

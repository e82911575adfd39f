//! `SQLite` storage backend.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use uuid::Uuid;

use super::{Storage, StorageStats};
use crate::core::{Draft, Feedback, Session, Source};
use crate::error::StorageError;

/// Schema version stored in `PRAGMA user_version`.
const SCHEMA_VERSION: i32 = 1;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    status TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    data TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS sources (
    id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL,
    relevance REAL NOT NULL DEFAULT 0,
    data TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_sources_session ON sources(session_id);
CREATE TABLE IF NOT EXISTS drafts (
    id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL,
    version INTEGER NOT NULL,
    updated_at TEXT NOT NULL,
    data TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_drafts_session ON drafts(session_id);
CREATE TABLE IF NOT EXISTS feedback (
    id TEXT PRIMARY KEY,
    draft_id TEXT,
    cycle INTEGER NOT NULL,
    data TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_feedback_draft ON feedback(draft_id);
";

/// Storage in a single `SQLite` file.
pub struct SqliteStorage {
    conn: Connection,
}

impl std::fmt::Debug for SqliteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStorage")
            .field("path", &self.conn.path())
            .finish()
    }
}

impl SqliteStorage {
    /// Opens (or creates) the database file, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the directory or database cannot be
    /// opened.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        debug!(path = %path.display(), "Opened database");
        Ok(Self { conn })
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if `SQLite` cannot allocate the database.
    pub fn in_memory() -> Result<Self, StorageError> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Opens the database and creates the schema if it is missing.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if opening or initialization fails.
    pub fn open_initialized(path: &Path) -> Result<Self, StorageError> {
        let mut storage = Self::open(path)?;
        if !storage.is_initialized()? {
            storage.init()?;
        }
        Ok(storage)
    }

    fn count(&self, table: &str) -> Result<usize, StorageError> {
        let n: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(usize::try_from(n).unwrap_or(0))
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, StorageError> {
    Ok(serde_json::to_string(value)?)
}

fn from_rows<T: DeserializeOwned>(rows: Vec<String>) -> Result<Vec<T>, StorageError> {
    rows.iter()
        .map(|data| serde_json::from_str(data).map_err(StorageError::from))
        .collect()
}

impl Storage for SqliteStorage {
    fn init(&mut self) -> Result<(), StorageError> {
        self.conn.execute_batch(SCHEMA)?;
        self.conn
            .pragma_update(None, "user_version", SCHEMA_VERSION)?;
        info!(version = SCHEMA_VERSION, "Database initialized");
        Ok(())
    }

    fn is_initialized(&self) -> Result<bool, StorageError> {
        let version: i32 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        Ok(version >= SCHEMA_VERSION)
    }

    fn save_session(&mut self, session: &Session) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO sessions (id, status, updated_at, data) VALUES (?1, ?2, ?3, ?4)",
            params![
                session.id.to_string(),
                session.status.as_str(),
                session.updated_at.to_rfc3339(),
                to_json(session)?,
            ],
        )?;
        Ok(())
    }

    fn load_session(&self, id: Uuid) -> Result<Option<Session>, StorageError> {
        let data: Option<String> = self
            .conn
            .query_row(
                "SELECT data FROM sessions WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        data.map(|d| serde_json::from_str(&d).map_err(StorageError::from))
            .transpose()
    }

    fn list_sessions(&self, limit: usize) -> Result<Vec<Session>, StorageError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self
            .conn
            .prepare("SELECT data FROM sessions ORDER BY updated_at DESC LIMIT ?1")?;
        let rows = stmt
            .query_map(params![limit], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        from_rows(rows)
    }

    fn save_sources(&mut self, session_id: Uuid, sources: &[Source]) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM sources WHERE session_id = ?1",
            params![session_id.to_string()],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO sources (id, session_id, relevance, data) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for source in sources {
                let mut record = source.clone();
                record.session_id = Some(session_id);
                stmt.execute(params![
                    record.id.to_string(),
                    session_id.to_string(),
                    record.relevance_score,
                    to_json(&record)?,
                ])?;
            }
        }
        tx.commit()?;
        debug!(%session_id, count = sources.len(), "Sources saved");
        Ok(())
    }

    fn load_sources(&self, session_id: Uuid) -> Result<Vec<Source>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT data FROM sources WHERE session_id = ?1 ORDER BY relevance DESC, rowid ASC",
        )?;
        let rows = stmt
            .query_map(params![session_id.to_string()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        from_rows(rows)
    }

    fn save_draft(&mut self, draft: &Draft) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO drafts (id, session_id, version, updated_at, data) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                draft.id.to_string(),
                draft.session_id.to_string(),
                draft.version,
                draft.updated_at.to_rfc3339(),
                to_json(draft)?,
            ],
        )?;
        Ok(())
    }

    fn load_draft(&self, session_id: Uuid) -> Result<Option<Draft>, StorageError> {
        let data: Option<String> = self
            .conn
            .query_row(
                "SELECT data FROM drafts WHERE session_id = ?1 ORDER BY version DESC, updated_at DESC LIMIT 1",
                params![session_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        data.map(|d| serde_json::from_str(&d).map_err(StorageError::from))
            .transpose()
    }

    fn save_feedback(&mut self, feedback: &Feedback) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO feedback (id, draft_id, cycle, data) VALUES (?1, ?2, ?3, ?4)",
            params![
                feedback.id.to_string(),
                feedback.draft_id.map(|id| id.to_string()),
                feedback.cycle,
                to_json(feedback)?,
            ],
        )?;
        Ok(())
    }

    fn load_feedback(&self, draft_id: Uuid) -> Result<Vec<Feedback>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT data FROM feedback WHERE draft_id = ?1 ORDER BY cycle ASC, rowid ASC")?;
        let rows = stmt
            .query_map(params![draft_id.to_string()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        from_rows(rows)
    }

    fn stats(&self) -> Result<StorageStats, StorageError> {
        Ok(StorageStats {
            sessions: self.count("sessions")?,
            sources: self.count("sources")?,
            drafts: self.count("drafts")?,
            feedback: self.count("feedback")?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::core::{
        CitationStyle, Issue, IssueKind, IssueLocation, SectionKind, SessionStatus, Severity,
    };

    fn storage() -> SqliteStorage {
        let mut storage = SqliteStorage::in_memory().unwrap_or_else(|_| unreachable!());
        storage.init().unwrap_or_else(|_| unreachable!());
        storage
    }

    #[test]
    fn test_init() {
        let mut storage = SqliteStorage::in_memory().unwrap_or_else(|_| unreachable!());
        assert!(!storage.is_initialized().unwrap_or(true));
        storage.init().unwrap_or_else(|_| unreachable!());
        assert!(storage.is_initialized().unwrap_or(false));
        storage.init().unwrap_or_else(|_| unreachable!());
    }

    #[test]
    fn test_session_roundtrip_and_update() {
        let mut storage = storage();
        let mut session = Session::new("soil carbon", CitationStyle::Mla, 6000);
        storage.save_session(&session).unwrap_or_else(|_| unreachable!());

        session.mark_failed("boom");
        storage.save_session(&session).unwrap_or_else(|_| unreachable!());

        let loaded = storage
            .require_session(session.id)
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(loaded.status, SessionStatus::Failed);
        assert_eq!(loaded.citation_style, CitationStyle::Mla);
        assert_eq!(storage.stats().unwrap_or_default().sessions, 1);
    }

    #[test]
    fn test_missing_session() {
        let storage = storage();
        let result = storage.require_session(Uuid::new_v4());
        assert!(matches!(result, Err(StorageError::SessionNotFound { .. })));
    }

    #[test]
    fn test_list_sessions_newest_first() {
        let mut storage = storage();
        let mut older = Session::new("a", CitationStyle::Apa, 5000);
        older.updated_at = chrono::Utc::now() - chrono::Duration::hours(1);
        let newer = Session::new("b", CitationStyle::Apa, 5000);
        storage.save_session(&older).unwrap_or_else(|_| unreachable!());
        storage.save_session(&newer).unwrap_or_else(|_| unreachable!());

        let listed = storage.list_sessions(10).unwrap_or_default();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].topic, "b");
        assert_eq!(storage.list_sessions(1).unwrap_or_default().len(), 1);
    }

    #[test]
    fn test_sources_replaced_per_session() {
        let mut storage = storage();
        let session = Uuid::new_v4();
        let mut low = Source::new("Low", "http://low");
        low.relevance_score = 0.1;
        let mut high = Source::new("High", "http://high");
        high.relevance_score = 0.9;
        storage
            .save_sources(session, &[low.clone(), high])
            .unwrap_or_else(|_| unreachable!());

        let loaded = storage.load_sources(session).unwrap_or_default();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].title, "High");
        assert_eq!(loaded[0].session_id, Some(session));

        storage
            .save_sources(session, &[low])
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(storage.load_sources(session).unwrap_or_default().len(), 1);
        assert!(storage.load_sources(Uuid::new_v4()).unwrap_or_default().is_empty());
    }

    #[test]
    fn test_draft_latest_version() {
        let mut storage = storage();
        let session = Uuid::new_v4();
        let mut draft = Draft::new(session);
        draft.set_section(SectionKind::Introduction, "hello world");
        storage.save_draft(&draft).unwrap_or_else(|_| unreachable!());
        draft.bump_version();
        storage.save_draft(&draft).unwrap_or_else(|_| unreachable!());

        let loaded = storage
            .load_draft(session)
            .unwrap_or_default()
            .unwrap_or_else(|| unreachable!());
        assert_eq!(loaded.version, 2);
        assert_eq!(loaded.section(SectionKind::Introduction), Some("hello world"));
        assert!(storage.load_draft(Uuid::new_v4()).unwrap_or_default().is_none());
    }

    #[test]
    fn test_feedback_in_cycle_order() {
        let mut storage = storage();
        let draft_id = Uuid::new_v4();
        let mut second = Feedback::new(draft_id, 2);
        second.issues.push(Issue::new(
            IssueKind::GrammarError,
            Severity::Minor,
            IssueLocation::new(SectionKind::Abstract, "teh"),
            "typo",
            "the",
        ));
        let first = Feedback::new(draft_id, 1);
        storage.save_feedback(&second).unwrap_or_else(|_| unreachable!());
        storage.save_feedback(&first).unwrap_or_else(|_| unreachable!());

        let loaded = storage.load_feedback(draft_id).unwrap_or_default();
        assert_eq!(loaded.iter().map(|f| f.cycle).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(loaded[1].issues.len(), 1);
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let path = dir.path().join("nested").join("academician.db");
        let storage = SqliteStorage::open_initialized(&path).unwrap_or_else(|_| unreachable!());
        assert!(storage.is_initialized().unwrap_or(false));
        assert!(path.exists());
    }
}

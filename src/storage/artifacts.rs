//! Flat-file JSON artifacts grouped by session.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use crate::error::StorageError;

/// Writes `<root>/<session id>/<name>.json` files.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Creates a store rooted at `root`. Nothing is created until the first
    /// save.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding a session's artifacts.
    #[must_use]
    pub fn session_dir(&self, session_id: Uuid) -> PathBuf {
        self.root.join(session_id.to_string())
    }

    fn artifact_path(&self, session_id: Uuid, name: &str) -> PathBuf {
        self.session_dir(session_id).join(format!("{name}.json"))
    }

    /// Serializes `value` as pretty JSON and returns the written path.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if serialization or writing fails.
    pub fn save<T: Serialize>(
        &self,
        session_id: Uuid,
        name: &str,
        value: &T,
    ) -> Result<PathBuf, StorageError> {
        let dir = self.session_dir(session_id);
        std::fs::create_dir_all(&dir)?;
        let path = self.artifact_path(session_id, name);
        std::fs::write(&path, serde_json::to_string_pretty(value)?)?;
        debug!(path = %path.display(), "Saved artifact");
        Ok(path)
    }

    /// Loads an artifact, or `None` if it was never written.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the file exists but cannot be read or
    /// parsed.
    pub fn load<T: DeserializeOwned>(
        &self,
        session_id: Uuid,
        name: &str,
    ) -> Result<Option<T>, StorageError> {
        let path = self.artifact_path(session_id, name);
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Artifact names stored for a session, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the directory cannot be read.
    pub fn list(&self, session_id: Uuid) -> Result<Vec<String>, StorageError> {
        let dir = self.session_dir(session_id);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "json")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::core::Feedback;

    #[test]
    fn test_save_load_list() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let store = ArtifactStore::new(dir.path());
        let session = Uuid::new_v4();
        let feedback = Feedback::new(Uuid::new_v4(), 3);

        let path = store
            .save(session, "final_feedback", &feedback)
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(path, dir.path().join(session.to_string()).join("final_feedback.json"));

        let loaded: Feedback = store
            .load(session, "final_feedback")
            .unwrap_or_default()
            .unwrap_or_else(|| unreachable!());
        assert_eq!(loaded.cycle, 3);

        store.save(session, "outline", &vec!["a"]).unwrap_or_else(|_| unreachable!());
        assert_eq!(
            store.list(session).unwrap_or_default(),
            vec!["final_feedback".to_string(), "outline".to_string()]
        );
    }

    #[test]
    fn test_missing_artifacts() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let store = ArtifactStore::new(dir.path());
        let session = Uuid::new_v4();
        let missing: Option<Feedback> = store.load(session, "nope").unwrap_or_default();
        assert!(missing.is_none());
        assert!(store.list(session).unwrap_or_default().is_empty());
    }
}

//! Error types for academician.
//!
//! Each layer owns a `thiserror` enum. The top-level [`Error`] wraps them
//! so CLI commands can propagate any failure with `?`.

use thiserror::Error;

/// Result alias using the crate-wide [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// LLM collaborator or pipeline failure.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Persistence failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Source discovery failure.
    #[error(transparent)]
    Search(#[from] SearchError),

    /// Document export failure.
    #[error(transparent)]
    Export(#[from] ExportError),

    /// CLI command failure.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Invalid paper configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised at the language-model boundary and by the pipeline stages
/// that depend on it.
#[derive(Debug, Error)]
pub enum AgentError {
    /// No API key was configured.
    #[error("API key not configured (set OPENAI_API_KEY or ACADEMICIAN_API_KEY)")]
    ApiKeyMissing,

    /// The configured provider name is unknown.
    #[error("unsupported LLM provider: {name}")]
    UnsupportedProvider {
        /// Provider name as configured.
        name: String,
    },

    /// The provider request failed.
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Provider error message.
        message: String,
        /// HTTP status, when known.
        status: Option<u16>,
    },

    /// The provider did not answer within the configured timeout.
    #[error("request timed out after {seconds}s")]
    Timeout {
        /// Timeout that elapsed.
        seconds: u64,
    },

    /// The model output could not be parsed into the expected structure.
    #[error("failed to parse model response: {message}")]
    ResponseParse {
        /// What went wrong.
        message: String,
        /// The raw model output.
        content: String,
    },

    /// An operation required a draft with at least one populated section.
    #[error("draft has no populated sections")]
    EmptyDraft,

    /// A pipeline stage failed.
    #[error("pipeline error: {message}")]
    Orchestration {
        /// Failure description.
        message: String,
    },

    /// Agent configuration is invalid.
    #[error("invalid agent configuration: {message}")]
    Config {
        /// What is invalid.
        message: String,
    },
}

impl AgentError {
    /// Whether a retry might succeed.
    ///
    /// Request failures without a status, request timeouts, rate limits and
    /// server errors are transient. Configuration and parse errors are not.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::ApiRequest { status, .. } => match status {
                None => true,
                Some(code) => *code == 408 || *code == 429 || *code >= 500,
            },
            Self::Timeout { .. } => true,
            Self::ApiKeyMissing
            | Self::UnsupportedProvider { .. }
            | Self::ResponseParse { .. }
            | Self::EmptyDraft
            | Self::Orchestration { .. }
            | Self::Config { .. } => false,
        }
    }
}

/// Persistence errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// `SQLite` failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Record (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The database schema has not been created.
    #[error("database not initialized")]
    NotInitialized,

    /// No session with the given id.
    #[error("session not found: {id}")]
    SessionNotFound {
        /// Requested session id.
        id: String,
    },
}

/// Source discovery errors.
#[derive(Debug, Error)]
pub enum SearchError {
    /// HTTP failure talking to a search backend.
    #[error("{backend} request failed: {message}")]
    Request {
        /// Backend name.
        backend: &'static str,
        /// Error description.
        message: String,
    },

    /// The backend answered with something we could not read.
    #[error("{backend} returned an unreadable response: {message}")]
    InvalidResponse {
        /// Backend name.
        backend: &'static str,
        /// Error description.
        message: String,
    },

    /// The backend is missing credentials.
    #[error("{backend} is not configured: {message}")]
    NotConfigured {
        /// Backend name.
        backend: &'static str,
        /// What is missing.
        message: String,
    },
}

/// Document export errors.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Archive failure while writing a DOCX package.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// The requested format is unknown.
    #[error("unknown export format: {0}")]
    UnknownFormat(String),

    /// The draft has nothing to export.
    #[error("draft has no content to export")]
    EmptyDraft,
}

/// CLI command errors.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Command failed.
    #[error("{0}")]
    ExecutionFailed(String),

    /// Invalid argument value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Output could not be rendered.
    #[error("output format error: {0}")]
    OutputFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(None, true ; "network failure")]
    #[test_case(Some(429), true ; "rate limited")]
    #[test_case(Some(503), true ; "server error")]
    #[test_case(Some(408), true ; "request timeout")]
    #[test_case(Some(400), false ; "bad request")]
    #[test_case(Some(401), false ; "unauthorized")]
    fn test_api_request_retryable(status: Option<u16>, expected: bool) {
        let err = AgentError::ApiRequest {
            message: "boom".to_string(),
            status,
        };
        assert_eq!(err.is_retryable(), expected);
    }

    #[test]
    fn test_config_errors_not_retryable() {
        assert!(!AgentError::ApiKeyMissing.is_retryable());
        assert!(
            !AgentError::UnsupportedProvider {
                name: "x".to_string()
            }
            .is_retryable()
        );
        assert!(AgentError::Timeout { seconds: 1 }.is_retryable());
    }

    #[test]
    fn test_error_wrapping() {
        let err: Error = AgentError::EmptyDraft.into();
        assert_eq!(err.to_string(), "draft has no populated sections");
        let err: Error = StorageError::NotInitialized.into();
        assert!(matches!(err, Error::Storage(_)));
    }
}

//! Agent configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::AgentError;

/// Default model for drafting and planning roles.
const DEFAULT_WRITER_MODEL: &str = "gpt-4o";
/// Default model for the reviewer.
const DEFAULT_REVIEWER_MODEL: &str = "gpt-4o";
/// Default model for the editor.
const DEFAULT_EDITOR_MODEL: &str = "gpt-4o";
/// Default model for short structured tasks (queries, titles, outlines).
const DEFAULT_PLANNER_MODEL: &str = "gpt-4o-mini";
/// Default writer max tokens. Section drafts run long.
const DEFAULT_WRITER_MAX_TOKENS: u32 = 8192;
/// Default reviewer max tokens.
const DEFAULT_REVIEWER_MAX_TOKENS: u32 = 4096;
/// Default ceiling for editor rewrites.
const DEFAULT_EDITOR_MAX_TOKENS: u32 = 16384;
/// Default planner max tokens.
const DEFAULT_PLANNER_MAX_TOKENS: u32 = 2048;
/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 180;
/// Default attempts per logical call (first try included).
const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default first backoff delay.
const DEFAULT_RETRY_MIN_WAIT: Duration = Duration::from_secs(1);
/// Default backoff ceiling.
const DEFAULT_RETRY_MAX_WAIT: Duration = Duration::from_secs(60);
/// Default concurrent per-section review calls.
const DEFAULT_REVIEW_CONCURRENCY: usize = 4;

/// Configuration for the language-model collaborators.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// LLM provider name (e.g., "openai").
    pub provider: String,
    /// API key for the provider.
    pub api_key: String,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Model for section writing.
    pub writer_model: String,
    /// Model for the reviewer.
    pub reviewer_model: String,
    /// Model for the editor.
    pub editor_model: String,
    /// Model for planning-type stages.
    pub planner_model: String,
    /// Maximum tokens for section writing.
    pub writer_max_tokens: u32,
    /// Maximum tokens for review responses.
    pub reviewer_max_tokens: u32,
    /// Upper bound on editor rewrite budgets.
    pub editor_max_tokens: u32,
    /// Maximum tokens for planning-type stages.
    pub planner_max_tokens: u32,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Attempts per logical call, first try included.
    pub max_retries: u32,
    /// First backoff delay.
    pub retry_min_wait: Duration,
    /// Backoff ceiling.
    pub retry_max_wait: Duration,
    /// Concurrent per-section review calls within one cycle.
    pub review_concurrency: usize,
    /// Directory containing prompt template files.
    ///
    /// When set, system prompts are loaded from markdown files in this
    /// directory, falling back to compiled-in defaults for any missing files.
    pub prompt_dir: Option<PathBuf>,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key is found.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    writer_model: Option<String>,
    reviewer_model: Option<String>,
    editor_model: Option<String>,
    planner_model: Option<String>,
    writer_max_tokens: Option<u32>,
    reviewer_max_tokens: Option<u32>,
    editor_max_tokens: Option<u32>,
    planner_max_tokens: Option<u32>,
    timeout: Option<Duration>,
    max_retries: Option<u32>,
    retry_min_wait: Option<Duration>,
    retry_max_wait: Option<Duration>,
    review_concurrency: Option<usize>,
    prompt_dir: Option<PathBuf>,
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("ACADEMICIAN_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY")
                .or_else(|_| std::env::var("ACADEMICIAN_API_KEY"))
                .ok()
                .filter(|k| !k.is_empty());
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("OPENAI_BASE_URL")
                .or_else(|_| std::env::var("ACADEMICIAN_BASE_URL"))
                .ok();
        }
        if self.writer_model.is_none() {
            self.writer_model = std::env::var("ACADEMICIAN_WRITER_MODEL").ok();
        }
        if self.reviewer_model.is_none() {
            self.reviewer_model = std::env::var("ACADEMICIAN_REVIEWER_MODEL").ok();
        }
        if self.editor_model.is_none() {
            self.editor_model = std::env::var("ACADEMICIAN_EDITOR_MODEL").ok();
        }
        if self.planner_model.is_none() {
            self.planner_model = std::env::var("ACADEMICIAN_PLANNER_MODEL").ok();
        }
        if self.max_retries.is_none() {
            self.max_retries = std::env::var("ACADEMICIAN_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.timeout.is_none() {
            self.timeout = std::env::var("ACADEMICIAN_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs);
        }
        if self.review_concurrency.is_none() {
            self.review_concurrency = std::env::var("ACADEMICIAN_REVIEW_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("ACADEMICIAN_PROMPT_DIR")
                .ok()
                .map(PathBuf::from);
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the writer model.
    #[must_use]
    pub fn writer_model(mut self, model: impl Into<String>) -> Self {
        self.writer_model = Some(model.into());
        self
    }

    /// Sets the reviewer model.
    #[must_use]
    pub fn reviewer_model(mut self, model: impl Into<String>) -> Self {
        self.reviewer_model = Some(model.into());
        self
    }

    /// Sets the editor model.
    #[must_use]
    pub fn editor_model(mut self, model: impl Into<String>) -> Self {
        self.editor_model = Some(model.into());
        self
    }

    /// Sets the planner model.
    #[must_use]
    pub fn planner_model(mut self, model: impl Into<String>) -> Self {
        self.planner_model = Some(model.into());
        self
    }

    /// Sets the editor rewrite ceiling.
    #[must_use]
    pub const fn editor_max_tokens(mut self, n: u32) -> Self {
        self.editor_max_tokens = Some(n);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the attempts per logical call.
    #[must_use]
    pub const fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = Some(n);
        self
    }

    /// Sets the backoff bounds.
    #[must_use]
    pub const fn retry_wait(mut self, min: Duration, max: Duration) -> Self {
        self.retry_min_wait = Some(min);
        self.retry_max_wait = Some(max);
        self
    }

    /// Sets the per-section review concurrency.
    #[must_use]
    pub const fn review_concurrency(mut self, n: usize) -> Self {
        self.review_concurrency = Some(n);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key was set, or
    /// [`AgentError::Config`] if the retry bounds are inverted.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let api_key = self
            .api_key
            .filter(|k| !k.is_empty())
            .ok_or(AgentError::ApiKeyMissing)?;

        let retry_min_wait = self.retry_min_wait.unwrap_or(DEFAULT_RETRY_MIN_WAIT);
        let retry_max_wait = self.retry_max_wait.unwrap_or(DEFAULT_RETRY_MAX_WAIT);
        if retry_min_wait > retry_max_wait {
            return Err(AgentError::Config {
                message: format!(
                    "retry min wait ({retry_min_wait:?}) exceeds max wait ({retry_max_wait:?})"
                ),
            });
        }

        Ok(AgentConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url: self.base_url,
            writer_model: self
                .writer_model
                .unwrap_or_else(|| DEFAULT_WRITER_MODEL.to_string()),
            reviewer_model: self
                .reviewer_model
                .unwrap_or_else(|| DEFAULT_REVIEWER_MODEL.to_string()),
            editor_model: self
                .editor_model
                .unwrap_or_else(|| DEFAULT_EDITOR_MODEL.to_string()),
            planner_model: self
                .planner_model
                .unwrap_or_else(|| DEFAULT_PLANNER_MODEL.to_string()),
            writer_max_tokens: self.writer_max_tokens.unwrap_or(DEFAULT_WRITER_MAX_TOKENS),
            reviewer_max_tokens: self
                .reviewer_max_tokens
                .unwrap_or(DEFAULT_REVIEWER_MAX_TOKENS),
            editor_max_tokens: self.editor_max_tokens.unwrap_or(DEFAULT_EDITOR_MAX_TOKENS),
            planner_max_tokens: self
                .planner_max_tokens
                .unwrap_or(DEFAULT_PLANNER_MAX_TOKENS),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES).max(1),
            retry_min_wait,
            retry_max_wait,
            review_concurrency: self
                .review_concurrency
                .unwrap_or(DEFAULT_REVIEW_CONCURRENCY)
                .max(1),
            prompt_dir: self.prompt_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = AgentConfig::builder()
            .api_key("test-key")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.provider, "openai");
        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(config.retry_min_wait, Duration::from_secs(1));
        assert_eq!(config.retry_max_wait, Duration::from_secs(60));
        assert_eq!(config.planner_model, DEFAULT_PLANNER_MODEL);
    }

    #[test]
    fn test_builder_missing_api_key() {
        let result = AgentConfig::builder().build();
        assert!(matches!(result, Err(AgentError::ApiKeyMissing)));

        let result = AgentConfig::builder().api_key("").build();
        assert!(matches!(result, Err(AgentError::ApiKeyMissing)));
    }

    #[test]
    fn test_builder_custom_values() {
        let config = AgentConfig::builder()
            .api_key("key")
            .provider("custom")
            .reviewer_model("gpt-4.1")
            .review_concurrency(0)
            .max_retries(0)
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.provider, "custom");
        assert_eq!(config.reviewer_model, "gpt-4.1");
        assert_eq!(config.review_concurrency, 1);
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_inverted_retry_bounds_rejected() {
        let result = AgentConfig::builder()
            .api_key("key")
            .retry_wait(Duration::from_secs(10), Duration::from_secs(1))
            .build();
        assert!(matches!(result, Err(AgentError::Config { .. })));
    }
}

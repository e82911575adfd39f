//! Paper generation configuration with builder pattern and environment
//! variable support.
//!
//! Configuration is resolved in order: explicit values → environment
//! variables → defaults.

use std::path::PathBuf;

use serde::Serialize;

use crate::core::CitationStyle;
use crate::error::Error;

/// Default paper length in words.
pub const DEFAULT_WORD_COUNT: usize = 18_000;
/// Shortest paper the pipeline will plan.
pub const MIN_WORD_COUNT: usize = 5_000;
/// Longest paper the pipeline will plan.
pub const MAX_WORD_COUNT: usize = 30_000;
/// Default minimum number of review cycles before approval is possible.
pub const DEFAULT_MIN_REVIEW_CYCLES: u32 = 2;
/// Default hard cap on review cycles.
pub const DEFAULT_MAX_REVIEW_CYCLES: u32 = 5;
/// Default number of sources the discovery stage aims for.
const DEFAULT_MIN_SOURCES: usize = 20;
/// Default number of sources kept after ranking.
const DEFAULT_MAX_SOURCES: usize = 30;
/// Default results requested per search query.
const DEFAULT_RESULTS_PER_QUERY: usize = 10;
/// Default database location.
pub const DEFAULT_DB_PATH: &str = "./data/academician.db";
/// Default output directory.
pub const DEFAULT_OUTPUT_DIR: &str = "./output";

/// Settings for a paper-generation run.
#[derive(Debug, Clone, Serialize)]
pub struct PaperConfig {
    /// Requested paper length in words.
    pub word_count: usize,
    /// Citation style.
    pub citation_style: CitationStyle,
    /// Minimum review cycles before approval is possible.
    pub min_review_cycles: u32,
    /// Hard cap on review cycles.
    pub max_review_cycles: u32,
    /// Sources the discovery stage aims for.
    pub min_sources: usize,
    /// Sources kept after ranking.
    pub max_sources: usize,
    /// Results requested per search query.
    pub results_per_query: usize,
    /// `SQLite` database path.
    pub database_path: PathBuf,
    /// Directory exported documents are written to.
    pub output_dir: PathBuf,
    /// Google Custom Search API key.
    #[serde(skip)]
    pub google_api_key: Option<String>,
    /// Google Custom Search engine id.
    pub google_cse_id: Option<String>,
}

impl PaperConfig {
    /// Creates a new builder for `PaperConfig`.
    #[must_use]
    pub fn builder() -> PaperConfigBuilder {
        PaperConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the resolved values are inconsistent.
    pub fn from_env() -> Result<Self, Error> {
        Self::builder().from_env().build()
    }

    /// Whether the Google backend has credentials.
    #[must_use]
    pub fn google_configured(&self) -> bool {
        self.google_api_key.as_deref().is_some_and(|k| !k.is_empty())
            && self.google_cse_id.as_deref().is_some_and(|k| !k.is_empty())
    }
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            word_count: DEFAULT_WORD_COUNT,
            citation_style: CitationStyle::Apa,
            min_review_cycles: DEFAULT_MIN_REVIEW_CYCLES,
            max_review_cycles: DEFAULT_MAX_REVIEW_CYCLES,
            min_sources: DEFAULT_MIN_SOURCES,
            max_sources: DEFAULT_MAX_SOURCES,
            results_per_query: DEFAULT_RESULTS_PER_QUERY,
            database_path: PathBuf::from(DEFAULT_DB_PATH),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            google_api_key: None,
            google_cse_id: None,
        }
    }
}

/// Builder for [`PaperConfig`].
#[derive(Debug, Clone, Default)]
pub struct PaperConfigBuilder {
    word_count: Option<usize>,
    citation_style: Option<CitationStyle>,
    min_review_cycles: Option<u32>,
    max_review_cycles: Option<u32>,
    min_sources: Option<usize>,
    max_sources: Option<usize>,
    results_per_query: Option<usize>,
    database_path: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    google_api_key: Option<String>,
    google_cse_id: Option<String>,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl PaperConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.word_count.is_none() {
            self.word_count = env_parse("DEFAULT_WORD_COUNT");
        }
        if self.citation_style.is_none() {
            self.citation_style = std::env::var("DEFAULT_CITATION_STYLE")
                .ok()
                .and_then(|v| CitationStyle::parse(&v));
        }
        if self.min_review_cycles.is_none() {
            self.min_review_cycles = env_parse("MIN_REVIEW_CYCLES");
        }
        if self.max_review_cycles.is_none() {
            self.max_review_cycles = env_parse("MAX_REVIEW_CYCLES");
        }
        if self.min_sources.is_none() {
            self.min_sources = env_parse("MIN_SOURCES");
        }
        if self.max_sources.is_none() {
            self.max_sources = env_parse("MAX_SOURCES");
        }
        if self.database_path.is_none() {
            self.database_path = std::env::var("DATABASE_PATH").ok().map(PathBuf::from);
        }
        if self.output_dir.is_none() {
            self.output_dir = std::env::var("OUTPUT_DIR").ok().map(PathBuf::from);
        }
        if self.google_api_key.is_none() {
            self.google_api_key = std::env::var("GOOGLE_API_KEY").ok();
        }
        if self.google_cse_id.is_none() {
            self.google_cse_id = std::env::var("GOOGLE_CSE_ID").ok();
        }
        self
    }

    /// Sets the target word count.
    #[must_use]
    pub const fn word_count(mut self, n: usize) -> Self {
        self.word_count = Some(n);
        self
    }

    /// Sets the citation style.
    #[must_use]
    pub const fn citation_style(mut self, style: CitationStyle) -> Self {
        self.citation_style = Some(style);
        self
    }

    /// Sets the minimum review cycles.
    #[must_use]
    pub const fn min_review_cycles(mut self, n: u32) -> Self {
        self.min_review_cycles = Some(n);
        self
    }

    /// Sets the maximum review cycles.
    #[must_use]
    pub const fn max_review_cycles(mut self, n: u32) -> Self {
        self.max_review_cycles = Some(n);
        self
    }

    /// Sets the source count bounds.
    #[must_use]
    pub const fn sources(mut self, min: usize, max: usize) -> Self {
        self.min_sources = Some(min);
        self.max_sources = Some(max);
        self
    }

    /// Sets the database path.
    #[must_use]
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Sets the output directory.
    #[must_use]
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Builds the [`PaperConfig`].
    ///
    /// The word count is clamped to the supported range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a review-cycle bound is zero.
    pub fn build(self) -> Result<PaperConfig, Error> {
        let min_review_cycles = self
            .min_review_cycles
            .unwrap_or(DEFAULT_MIN_REVIEW_CYCLES);
        let max_review_cycles = self
            .max_review_cycles
            .unwrap_or(DEFAULT_MAX_REVIEW_CYCLES);
        if min_review_cycles == 0 || max_review_cycles == 0 {
            return Err(Error::Config(
                "review cycle bounds must be at least 1".to_string(),
            ));
        }

        let min_sources = self.min_sources.unwrap_or(DEFAULT_MIN_SOURCES);
        let max_sources = self.max_sources.unwrap_or(DEFAULT_MAX_SOURCES).max(1);

        Ok(PaperConfig {
            word_count: self
                .word_count
                .unwrap_or(DEFAULT_WORD_COUNT)
                .clamp(MIN_WORD_COUNT, MAX_WORD_COUNT),
            citation_style: self.citation_style.unwrap_or_default(),
            min_review_cycles,
            max_review_cycles,
            min_sources: min_sources.min(max_sources),
            max_sources,
            results_per_query: self
                .results_per_query
                .unwrap_or(DEFAULT_RESULTS_PER_QUERY),
            database_path: self
                .database_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            output_dir: self
                .output_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            google_api_key: self.google_api_key.filter(|k| !k.is_empty()),
            google_cse_id: self.google_cse_id.filter(|k| !k.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = PaperConfig::builder()
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.word_count, DEFAULT_WORD_COUNT);
        assert_eq!(config.citation_style, CitationStyle::Apa);
        assert_eq!(config.min_review_cycles, 2);
        assert_eq!(config.max_review_cycles, 5);
        assert_eq!(config.min_sources, 20);
        assert_eq!(config.max_sources, 30);
        assert!(!config.google_configured());
    }

    #[test]
    fn test_word_count_clamped() {
        let config = PaperConfig::builder()
            .word_count(100)
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.word_count, MIN_WORD_COUNT);

        let config = PaperConfig::builder()
            .word_count(1_000_000)
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.word_count, MAX_WORD_COUNT);
    }

    #[test]
    fn test_zero_review_cycles_rejected() {
        assert!(PaperConfig::builder().max_review_cycles(0).build().is_err());
        assert!(PaperConfig::builder().min_review_cycles(0).build().is_err());
    }

    #[test]
    fn test_min_sources_not_above_max() {
        let config = PaperConfig::builder()
            .sources(40, 10)
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.min_sources, 10);
        assert_eq!(config.max_sources, 10);
    }
}

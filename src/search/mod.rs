//! Source discovery.
//!
//! Backends implement [`SourceSearch`] and all return [`Source`] records of
//! the same shape. Deduplication and ranking happen here, after every
//! backend has answered.

pub mod arxiv;
pub mod fetch;
pub mod google;

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::core::{Credibility, Source, SourceKind};
use crate::error::SearchError;

pub use arxiv::ArxivSearch;
pub use fetch::PageFetcher;
pub use google::GoogleSearch;

/// Characters of the normalized title used as a duplicate key.
const TITLE_KEY_CHARS: usize = 50;

/// A source-discovery backend.
#[async_trait]
pub trait SourceSearch: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Returns up to `max_results` sources for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] on transport or decoding failures.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Source>, SearchError>;
}

/// Normalizes a URL for duplicate detection: trimmed, lowercased, without a
/// trailing slash.
#[must_use]
pub fn normalize_url(url: &str) -> String {
    url.trim().to_lowercase().trim_end_matches('/').to_string()
}

/// Duplicate key for a title: the first 50 characters, trimmed and lowercased.
#[must_use]
pub fn title_key(title: &str) -> String {
    title.trim().to_lowercase().chars().take(TITLE_KEY_CHARS).collect()
}

/// Drops sources whose URL or title key was already seen, keeping the first.
///
/// Empty keys never match, so two sources with no URL are only duplicates
/// if their titles collide.
#[must_use]
pub fn dedupe_sources(sources: Vec<Source>) -> Vec<Source> {
    let mut seen_urls = HashSet::new();
    let mut seen_titles = HashSet::new();
    let mut unique = Vec::with_capacity(sources.len());

    for source in sources {
        let url = normalize_url(&source.url);
        let title = title_key(&source.title);
        let url_dup = !url.is_empty() && seen_urls.contains(&url);
        let title_dup = !title.is_empty() && seen_titles.contains(&title);
        if url_dup || title_dup {
            continue;
        }
        if !url.is_empty() {
            seen_urls.insert(url);
        }
        if !title.is_empty() {
            seen_titles.insert(title);
        }
        unique.push(source);
    }
    unique
}

/// Relevance score in `[0, 1]` for a source against a topic.
#[must_use]
pub fn score_source(source: &Source, topic: &str) -> f64 {
    let mut score = match source.credibility {
        Credibility::High => 0.4,
        Credibility::Medium => 0.2,
        Credibility::Low => 0.0,
    };
    if source.kind == SourceKind::Arxiv {
        score += 0.2;
    }
    if source.abstract_text.chars().count() > 100 {
        score += 0.1;
    }
    if source.year.is_some_and(|y| y >= 2020) {
        score += 0.1;
    }

    let topic_words = word_set(topic);
    if !topic_words.is_empty() {
        let total = f64::from(u32::try_from(topic_words.len()).unwrap_or(u32::MAX));
        let overlap = |text: &str| {
            let words = word_set(text);
            let shared = topic_words.intersection(&words).count();
            f64::from(u32::try_from(shared).unwrap_or(u32::MAX)) / total
        };
        score += overlap(&source.title) * 0.2;
        score += overlap(&source.abstract_text) * 0.1;
    }
    score.min(1.0)
}

fn word_set(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Scores every source and sorts by descending relevance (stable).
pub fn rank_sources(sources: &mut [Source], topic: &str) {
    for source in sources.iter_mut() {
        source.relevance_score = score_source(source, topic);
    }
    sources.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
}

/// Appends the sources in `extra` whose URL is not already in `existing`.
///
/// Returns how many were added.
pub fn merge_new_sources(existing: &mut Vec<Source>, extra: Vec<Source>) -> usize {
    let mut seen: HashSet<String> = existing.iter().map(|s| normalize_url(&s.url)).collect();
    let before = existing.len();
    for source in extra {
        let key = normalize_url(&source.url);
        if key.is_empty() || seen.insert(key) {
            existing.push(source);
        }
    }
    existing.len() - before
}

/// Runs every query against every backend, then dedupes and ranks.
///
/// Backend failures are logged and skipped; discovery never fails as a
/// whole.
pub async fn discover(
    backends: &[Box<dyn SourceSearch>],
    queries: &[String],
    per_query: usize,
    topic: &str,
) -> Vec<Source> {
    let mut found = Vec::new();
    for backend in backends {
        for query in queries {
            match backend.search(query, per_query).await {
                Ok(sources) => {
                    info!(backend = backend.name(), query = %query, count = sources.len(), "Search finished");
                    found.extend(sources);
                }
                Err(e) => warn!(backend = backend.name(), query = %query, error = %e, "Search failed"),
            }
        }
    }

    let total = found.len();
    let mut unique = dedupe_sources(found);
    rank_sources(&mut unique, topic);
    info!(total, unique = unique.len(), "Sources discovered");
    unique
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn source(title: &str, url: &str) -> Source {
        Source::new(title, url)
    }

    #[test]
    fn test_dedupe_by_url() {
        let sources = vec![
            source("Paper One", "http://a.com/x"),
            source("Paper One (copy)", "http://a.com/x"),
            source("Paper Two", "http://b.com/y"),
        ];
        let unique = dedupe_sources(sources);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].title, "Paper One");
        assert_eq!(unique[1].title, "Paper Two");
    }

    #[test]
    fn test_dedupe_normalizes_url_and_title() {
        let sources = vec![
            source("A Study", "HTTP://A.com/x/"),
            source("Different", " http://a.com/x "),
            source("  a study", "http://c.com"),
        ];
        assert_eq!(dedupe_sources(sources).len(), 1);
    }

    #[test]
    fn test_merge_new_sources_skips_known_urls() {
        let mut existing = vec![source("Kept", "http://a.com/x")];
        let extra = vec![
            source("Same page", "HTTP://A.com/x/"),
            source("New", "http://b.com/y"),
            source("New again", "http://b.com/y"),
        ];
        assert_eq!(merge_new_sources(&mut existing, extra), 1);
        let titles: Vec<&str> = existing.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Kept", "New"]);
    }

    #[test]
    fn test_empty_keys_never_collide() {
        let sources = vec![source("One", ""), source("Two", ""), source("", "http://x.org")];
        assert_eq!(dedupe_sources(sources).len(), 3);
    }

    #[test]
    fn test_title_key_uses_first_fifty_chars() {
        let long = "x".repeat(60);
        let a = source(&format!("{long} alpha"), "http://a.org");
        let b = source(&format!("{long} beta"), "http://b.org");
        assert_eq!(dedupe_sources(vec![a, b]).len(), 1);
    }

    #[test]
    fn test_rank_prefers_credible_recent_arxiv() {
        let mut web = source("Unrelated blog", "http://blog.example");
        web.credibility = Credibility::Low;
        let mut paper = source("Soil carbon dynamics", "http://arxiv.org/abs/1");
        paper.kind = SourceKind::Arxiv;
        paper.credibility = Credibility::High;
        paper.year = Some(2023);
        paper.abstract_text = "soil ".repeat(30);

        let mut sources = vec![web, paper];
        rank_sources(&mut sources, "soil carbon");
        assert_eq!(sources[0].title, "Soil carbon dynamics");
        assert!(sources[0].relevance_score > sources[1].relevance_score);
        assert!(sources[0].relevance_score <= 1.0);
    }

    proptest! {
        #[test]
        fn prop_dedupe_is_idempotent(titles in proptest::collection::vec("[a-c]{0,3}", 0..12)) {
            let sources: Vec<Source> = titles
                .iter()
                .enumerate()
                .map(|(i, t)| source(t, &format!("http://h/{}", i % 4)))
                .collect();
            let once = dedupe_sources(sources);
            let n = once.len();
            let twice = dedupe_sources(once);
            prop_assert_eq!(twice.len(), n);
        }

        #[test]
        fn prop_score_bounded(year in 1900i32..2100, abstract_len in 0usize..300) {
            let mut s = source("soil carbon", "http://x");
            s.year = Some(year);
            s.abstract_text = "a".repeat(abstract_len);
            s.credibility = Credibility::High;
            s.kind = SourceKind::Arxiv;
            let score = score_source(&s, "soil carbon");
            prop_assert!((0.0..=1.0).contains(&score));
        }
    }
}

//! arXiv export API backend.
//!
//! The API answers with an Atom feed. Only a handful of elements are
//! needed, so entries are picked apart with regular expressions rather
//! than a full XML parser.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use super::SourceSearch;
use crate::core::{Credibility, Source, SourceKind};
use crate::error::SearchError;

const BACKEND: &str = "arxiv";
/// Production endpoint.
pub const DEFAULT_BASE_URL: &str = "http://export.arxiv.org/api/query";

static ENTRY: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?s)<entry>(.*?)</entry>").ok());
static AUTHOR_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)<author>\s*<name>(.*?)</name>").ok());
static DOI: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)<arxiv:doi[^>]*>(.*?)</arxiv:doi>").ok());

/// Preprint search against arXiv.
#[derive(Debug, Clone)]
pub struct ArxivSearch {
    client: reqwest::Client,
    base_url: String,
}

impl Default for ArxivSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl ArxivSearch {
    /// Creates a backend for the public API.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Points the backend at a different endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl SourceSearch for ArxivSearch {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Source>, SearchError> {
        let search_query = format!("all:{query}");
        let max = max_results.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("search_query", search_query.as_str()),
                ("start", "0"),
                ("max_results", max.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SearchError::Request {
                backend: BACKEND,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Request {
                backend: BACKEND,
                message: format!("HTTP {status}"),
            });
        }
        let body = response.text().await.map_err(|e| SearchError::InvalidResponse {
            backend: BACKEND,
            message: e.to_string(),
        })?;

        let sources = parse_feed(&body)?;
        debug!(query, entries = sources.len(), "arXiv results received");
        Ok(sources)
    }
}

/// Parses an arXiv Atom feed into sources.
///
/// # Errors
///
/// Returns [`SearchError::InvalidResponse`] if the body is not a feed.
pub fn parse_feed(body: &str) -> Result<Vec<Source>, SearchError> {
    if !body.contains("<feed") {
        return Err(SearchError::InvalidResponse {
            backend: BACKEND,
            message: "response is not an Atom feed".to_string(),
        });
    }
    let Some(entry_re) = ENTRY.as_ref() else {
        return Ok(Vec::new());
    };
    Ok(entry_re
        .captures_iter(body)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| parse_entry(m.as_str()))
        .collect())
}

fn parse_entry(entry: &str) -> Option<Source> {
    let url = element(entry, "id")?;
    let title = collapse_whitespace(&element(entry, "title").unwrap_or_default());

    let mut source = Source::new(title, url);
    source.abstract_text = collapse_whitespace(&element(entry, "summary").unwrap_or_default());
    source.kind = SourceKind::Arxiv;
    source.credibility = Credibility::High;
    source.journal = Some("arXiv".to_string());
    source.year = element(entry, "published")
        .and_then(|p| p.get(..4).and_then(|y| y.parse().ok()));
    if let Some(re) = AUTHOR_NAME.as_ref() {
        source.authors = re
            .captures_iter(entry)
            .filter_map(|c| c.get(1))
            .map(|m| unescape(m.as_str().trim()))
            .filter(|name| !name.is_empty())
            .collect();
    }
    source.doi = DOI
        .as_ref()
        .and_then(|re| re.captures(entry))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string());
    Some(source)
}

/// Text of the first `<tag>` element directly in `entry`.
fn element(entry: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = entry.find(&open)? + open.len();
    let end = entry[start..].find(&close)? + start;
    let text = unescape(entry[start..end].trim());
    (!text.is_empty()).then_some(text)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title>ArXiv Query</title>
  <entry>
    <id>http://arxiv.org/abs/2101.00001v1</id>
    <published>2021-01-04T10:00:00Z</published>
    <title>Graph Neural
      Networks for Soil &amp; Water</title>
    <summary>  We study graphs.
      Results are good.  </summary>
    <author><name>Ada Lovelace</name></author>
    <author>
      <name>Alan Turing</name>
    </author>
    <arxiv:doi xmlns:arxiv="http://arxiv.org/schemas/atom">10.1000/xyz</arxiv:doi>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/1901.00002v2</id>
    <published>2019-01-01T00:00:00Z</published>
    <title>Second</title>
    <summary>Short.</summary>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_feed() {
        let sources = parse_feed(FEED).unwrap_or_else(|_| unreachable!());
        assert_eq!(sources.len(), 2);

        let first = &sources[0];
        assert_eq!(first.title, "Graph Neural Networks for Soil & Water");
        assert_eq!(first.url, "http://arxiv.org/abs/2101.00001v1");
        assert_eq!(first.abstract_text, "We study graphs. Results are good.");
        assert_eq!(first.year, Some(2021));
        assert_eq!(first.authors, vec!["Ada Lovelace", "Alan Turing"]);
        assert_eq!(first.doi.as_deref(), Some("10.1000/xyz"));
        assert_eq!(first.kind, SourceKind::Arxiv);
        assert_eq!(first.credibility, Credibility::High);

        assert!(sources[1].authors.is_empty());
        assert!(sources[1].doi.is_none());
    }

    #[test]
    fn test_parse_rejects_non_feed() {
        assert!(parse_feed("<html>rate limited</html>").is_err());
    }

    #[test]
    fn test_empty_feed() {
        let sources = parse_feed("<feed></feed>").unwrap_or_else(|_| unreachable!());
        assert!(sources.is_empty());
    }

    #[tokio::test]
    async fn test_search_queries_api() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("search_query", "all:soil carbon"))
            .and(query_param("max_results", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .mount(&server)
            .await;

        let backend = ArxivSearch::new().with_base_url(server.uri());
        let sources = backend
            .search("soil carbon", 3)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(sources.len(), 2);
    }

    #[tokio::test]
    async fn test_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let backend = ArxivSearch::new().with_base_url(server.uri());
        assert!(matches!(
            backend.search("x", 3).await,
            Err(SearchError::Request { .. })
        ));
    }
}

//! Google Custom Search JSON API backend.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::SourceSearch;
use crate::core::{Credibility, Source, SourceKind};
use crate::error::SearchError;

const BACKEND: &str = "google";
/// Production endpoint.
pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/customsearch/v1";
/// The API returns at most this many results per request.
const MAX_PER_REQUEST: usize = 10;

const HIGH_CREDIBILITY_DOMAINS: &[&str] = &[
    "edu",
    "gov",
    "scholar.google.com",
    "researchgate.net",
    "academia.edu",
    "jstor.org",
    "sciencedirect.com",
    "springer.com",
    "nature.com",
    "science.org",
    "ieee.org",
    "acm.org",
    "nih.gov",
    "pubmed.gov",
];

const MEDIUM_CREDIBILITY_DOMAINS: &[&str] = &[
    "wikipedia.org",
    "britannica.com",
    "news",
    "reuters.com",
    "bbc.com",
    "nytimes.com",
    "theguardian.com",
];

/// Credibility guess from a result's display domain.
#[must_use]
pub fn assess_credibility(domain: &str) -> Credibility {
    let domain = domain.to_lowercase();
    if HIGH_CREDIBILITY_DOMAINS.iter().any(|d| domain.contains(d)) {
        Credibility::High
    } else if MEDIUM_CREDIBILITY_DOMAINS.iter().any(|d| domain.contains(d)) {
        Credibility::Medium
    } else {
        Credibility::Low
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    display_link: String,
}

/// Web search through a Google Programmable Search Engine.
#[derive(Debug, Clone)]
pub struct GoogleSearch {
    client: reqwest::Client,
    api_key: String,
    cse_id: String,
    base_url: String,
}

impl GoogleSearch {
    /// Creates a backend for the given credentials.
    #[must_use]
    pub fn new(api_key: impl Into<String>, cse_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            cse_id: cse_id.into(),
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
impl SourceSearch for GoogleSearch {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Source>, SearchError> {
        if self.api_key.is_empty() || self.cse_id.is_empty() {
            return Err(SearchError::NotConfigured {
                backend: BACKEND,
                message: "set GOOGLE_API_KEY and GOOGLE_CSE_ID".to_string(),
            });
        }
        let num = max_results.clamp(1, MAX_PER_REQUEST).to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.cse_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
                ("start", "1"),
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
        let body: SearchResponse = response.json().await.map_err(|e| SearchError::InvalidResponse {
            backend: BACKEND,
            message: e.to_string(),
        })?;
        debug!(query, items = body.items.len(), "Google results received");

        Ok(body
            .items
            .into_iter()
            .filter(|item| !item.link.is_empty())
            .map(|item| {
                let mut source = Source::new(item.title, item.link);
                source.abstract_text = item.snippet;
                source.kind = SourceKind::Web;
                source.credibility = assess_credibility(&item.display_link);
                source
            })
            .collect())
    }
}

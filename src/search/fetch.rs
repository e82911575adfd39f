//! Page text for sources that arrive without an abstract.
//!
//! Pages are reduced to plain text with a few regular expressions: scripts
//! and stylesheets are dropped, remaining tags become spaces, whitespace is
//! collapsed.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::debug;

use crate::error::SearchError;

const BACKEND: &str = "fetch";
/// Characters of page text kept for summarization.
pub const MAX_PAGE_CHARS: usize = 10_000;
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("academician/", env!("CARGO_PKG_VERSION"));

static SCRIPT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").ok());
static STYLE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").ok());
static TAG: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<[^>]+>").ok());

/// Reduces an HTML page to whitespace-collapsed text.
#[must_use]
pub fn strip_html(html: &str) -> String {
    let mut text = html.to_string();
    for (re, replacement) in [(SCRIPT.as_ref(), ""), (STYLE.as_ref(), ""), (TAG.as_ref(), " ")] {
        if let Some(re) = re {
            text = re.replace_all(&text, replacement).into_owned();
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Downloads source pages and returns their text.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: reqwest::Client,
    max_chars: usize,
}

impl Default for PageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PageFetcher {
    /// Creates a fetcher with a 10 second timeout.
    #[must_use]
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            max_chars: MAX_PAGE_CHARS,
        }
    }

    /// Caps the returned text at `max_chars` characters.
    #[must_use]
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Fetches `url` and returns its text, possibly empty.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Request`] on transport failures and non-2xx
    /// answers.
    pub async fn fetch_text(&self, url: &str) -> Result<String, SearchError> {
        let response = self
            .client
            .get(url)
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

        let text: String = strip_html(&body).chars().take(self.max_chars).collect();
        debug!(url, len = text.len(), "Fetched page text");
        Ok(text)
    }
}

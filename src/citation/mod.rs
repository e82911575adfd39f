//! Citation formatting.
//!
//! Each style is a pair of pure functions (in-text marker and reference
//! entry) over a [`Source`]. Numbered styles need to remember which number a
//! source received; that state lives in a [`CitationContext`] created per
//! document, so two documents formatted concurrently never share numbering.

pub mod apa;
pub mod chicago;
pub mod harvard;
pub mod ieee;
pub mod mla;

use std::collections::HashMap;

use uuid::Uuid;

use crate::core::{CitationStyle, Source};

/// Placeholder year for undated sources.
pub const NO_DATE: &str = "n.d.";

/// Per-document citation state.
#[derive(Debug, Clone)]
pub struct CitationContext {
    style: CitationStyle,
    numbers: HashMap<Uuid, usize>,
}

impl CitationContext {
    /// Creates an empty context for one document.
    #[must_use]
    pub fn new(style: CitationStyle) -> Self {
        Self {
            style,
            numbers: HashMap::new(),
        }
    }

    /// Citation style in use.
    #[must_use]
    pub const fn style(&self) -> CitationStyle {
        self.style
    }

    /// Number assigned to a source, assigning the next one on first use.
    pub fn number(&mut self, source: &Source) -> usize {
        let next = self.numbers.len() + 1;
        *self.numbers.entry(source.id).or_insert(next)
    }

    /// In-text citation marker for a source.
    pub fn in_text(&mut self, source: &Source) -> String {
        match self.style {
            CitationStyle::Apa => apa::in_text(source),
            CitationStyle::Mla => mla::in_text(source),
            CitationStyle::Chicago => chicago::in_text(source),
            CitationStyle::Harvard => harvard::in_text(source),
            CitationStyle::Ieee => ieee::in_text(self.number(source)),
        }
    }

    /// Sample marker in this style, for writing instructions.
    #[must_use]
    pub const fn example_marker(&self) -> &'static str {
        match self.style {
            CitationStyle::Apa => "(Smith, 2020)",
            CitationStyle::Mla => "(Smith 45)",
            CitationStyle::Chicago => "(Smith 2020, 45)",
            CitationStyle::Harvard => "(Smith 2020)",
            CitationStyle::Ieee => "[1]",
        }
    }

    /// Tells a writer which in-text marker form to use.
    #[must_use]
    pub fn instruction(&self) -> String {
        format!(
            "Cite sources in-text in {} style, e.g. {}, using exactly the marker listed with each source.",
            self.style,
            self.example_marker()
        )
    }

    /// Reference-list entry for a source.
    pub fn entry(&mut self, source: &Source) -> String {
        match self.style {
            CitationStyle::Apa => apa::entry(source),
            CitationStyle::Mla => mla::entry(source),
            CitationStyle::Chicago => chicago::entry(source),
            CitationStyle::Harvard => harvard::entry(source),
            CitationStyle::Ieee => ieee::entry(source, self.number(source)),
        }
    }

    /// Renders the references section for `sources`.
    ///
    /// Numbered styles list sources by citation number, with sources never
    /// cited in the text numbered after them in input order. Author-date
    /// styles sort by first author's surname, then title.
    pub fn bibliography(&mut self, sources: &[Source]) -> String {
        let mut ordered: Vec<&Source> = sources.iter().collect();
        if self.style == CitationStyle::Ieee {
            for source in &ordered {
                self.number(source);
            }
            ordered.sort_by_key(|s| self.numbers.get(&s.id).copied().unwrap_or(usize::MAX));
        } else {
            ordered.sort_by_cached_key(|s| {
                let author = s.authors.first().map_or_else(|| s.title.clone(), |a| last_name(a).to_string());
                (author.to_lowercase(), s.title.to_lowercase())
            });
        }
        ordered
            .into_iter()
            .map(|s| self.entry(s))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Last whitespace-separated token of a name.
pub(crate) fn last_name(author: &str) -> &str {
    author.split_whitespace().last().unwrap_or("Unknown")
}

/// Given names of an author, or nothing for a mononym.
pub(crate) fn given_names(author: &str) -> Vec<&str> {
    let parts: Vec<&str> = author.split_whitespace().collect();
    parts.split_last().map(|(_, init)| init.to_vec()).unwrap_or_default()
}

/// Initials of the given names, each followed by a period, joined by `sep`.
pub(crate) fn initials(author: &str, sep: &str) -> String {
    given_names(author)
        .iter()
        .filter_map(|p| p.chars().next())
        .map(|c| format!("{c}."))
        .collect::<Vec<_>>()
        .join(sep)
}

/// `Last, First Middle` form.
pub(crate) fn inverted(author: &str) -> String {
    let given = given_names(author);
    if given.is_empty() {
        author.trim().to_string()
    } else {
        format!("{}, {}", last_name(author), given.join(" "))
    }
}

pub(crate) fn year(source: &Source) -> String {
    source.year.map_or_else(|| NO_DATE.to_string(), |y| y.to_string())
}

/// Title shortened to `limit` characters with an ellipsis, used when no
/// author is known.
pub(crate) fn short_title(title: &str, limit: usize) -> String {
    if title.chars().count() > limit {
        format!("{}...", title.chars().take(limit).collect::<String>())
    } else {
        title.to_string()
    }
}

/// First page of a page range.
pub(crate) fn first_page(pages: &str) -> &str {
    pages.split('-').next().unwrap_or(pages).trim()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_helpers() {
        assert_eq!(last_name("Jane Marie Smith"), "Smith");
        assert_eq!(initials("Jane Marie Smith", " "), "J. M.");
        assert_eq!(initials("Plato", " "), "");
        assert_eq!(inverted("Jane Marie Smith"), "Smith, Jane Marie");
        assert_eq!(inverted("Plato"), "Plato");
        assert_eq!(first_page("45-67"), "45");
        assert_eq!(short_title("abcdef", 3), "abc...");
    }

    #[test]
    fn test_ieee_numbering_is_per_context() {
        let a = fixtures::article();
        let b = fixtures::web_page();

        let mut first = CitationContext::new(CitationStyle::Ieee);
        assert_eq!(first.in_text(&b), "[1]");
        assert_eq!(first.in_text(&a), "[2]");
        assert_eq!(first.in_text(&b), "[1]");

        let mut second = CitationContext::new(CitationStyle::Ieee);
        assert_eq!(second.in_text(&a), "[1]");
    }

    #[test]
    fn test_ieee_bibliography_follows_citation_order() {
        let a = fixtures::article();
        let b = fixtures::web_page();
        let mut ctx = CitationContext::new(CitationStyle::Ieee);
        ctx.in_text(&b);
        let refs = ctx.bibliography(&[a, b]);
        let lines: Vec<&str> = refs.split("\n\n").collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("[1]"));
        assert!(lines[0].contains("Carbon Markets"));
        assert!(lines[1].starts_with("[2]"));
    }

    #[test]
    fn test_instruction_names_style_marker() {
        let ieee = CitationContext::new(CitationStyle::Ieee);
        assert!(ieee.instruction().contains("IEEE style, e.g. [1]"));
        let apa = CitationContext::new(CitationStyle::Apa);
        assert!(apa.instruction().contains("(Smith, 2020)"));
    }

    #[test]
    fn test_author_date_bibliography_sorted() {
        let mut zed = fixtures::article();
        zed.authors = vec!["Anna Zed".to_string()];
        let mut abe = fixtures::article();
        abe.authors = vec!["Tom Abe".to_string()];
        let mut ctx = CitationContext::new(CitationStyle::Apa);
        let refs = ctx.bibliography(&[zed, abe]);
        assert!(refs.starts_with("Abe, T."));
    }
}

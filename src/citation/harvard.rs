//! Harvard author-date.

use super::{initials, last_name, short_title, year};
use crate::core::Source;

/// `(Smith and Patel 2021)`.
#[must_use]
pub fn in_text(source: &Source) -> String {
    let who = match source.authors.as_slice() {
        [] => short_title(&source.title, 20),
        [only] => last_name(only).to_string(),
        [a, b] => format!("{} and {}", last_name(a), last_name(b)),
        [first, ..] => format!("{} et al.", last_name(first)),
    };
    format!("({who} {})", year(source))
}

/// Reference-list entry.
#[must_use]
pub fn entry(source: &Source) -> String {
    let mut parts = Vec::new();
    if !source.authors.is_empty() {
        parts.push(authors(&source.authors));
    }
    parts.push(format!("({})", year(source)));

    if let Some(journal) = &source.journal {
        parts.push(format!("'{}',", source.title));
        let mut container = format!("*{journal}*");
        if let Some(volume) = &source.volume {
            container.push_str(&format!(", vol. {volume}"));
        }
        if let Some(issue) = &source.issue {
            container.push_str(&format!(", no. {issue}"));
        }
        if let Some(pages) = &source.pages {
            container.push_str(&format!(", pp. {pages}"));
        }
        container.push('.');
        parts.push(container);
    } else {
        parts.push(format!("*{}*,", source.title));
        if let Some(publisher) = &source.publisher {
            parts.push(format!("{publisher}."));
        }
    }

    if let Some(doi) = &source.doi {
        parts.push(format!("Available at: https://doi.org/{doi}"));
    } else if !source.url.is_empty() {
        parts.push(format!("Available at: {}", source.url));
    }
    parts.join(" ")
}

fn author(name: &str) -> String {
    let init = initials(name, "");
    if init.is_empty() {
        name.trim().to_string()
    } else {
        format!("{}, {init}", last_name(name))
    }
}

fn authors(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [only] => author(only),
        [a, b] => format!("{} and {}", author(a), author(b)),
        [a, b, c] => format!("{}, {} and {}", author(a), author(b), author(c)),
        [first, ..] => format!("{} et al.", author(first)),
    }
}

//! APA 7th edition.

use super::{initials, last_name, short_title, year};
use crate::core::Source;

/// Authors listed in full before the list is elided.
const MAX_LISTED_AUTHORS: usize = 20;

/// `(Smith, 2021)`, `(Smith & Patel, 2021)` or `(Smith et al., 2021)`.
#[must_use]
pub fn in_text(source: &Source) -> String {
    let who = match source.authors.as_slice() {
        [] => short_title(&source.title, 20),
        [only] => last_name(only).to_string(),
        [a, b] => format!("{} & {}", last_name(a), last_name(b)),
        [first, ..] => format!("{} et al.", last_name(first)),
    };
    format!("({who}, {})", year(source))
}

/// Reference-list entry.
#[must_use]
pub fn entry(source: &Source) -> String {
    let mut parts = Vec::new();
    parts.push(if source.authors.is_empty() {
        "Unknown Author".to_string()
    } else {
        authors(&source.authors)
    });
    parts.push(format!("({}).", year(source)));

    if let Some(journal) = &source.journal {
        parts.push(format!("{}.", source.title));
        let mut container = format!("*{journal}*");
        if let Some(volume) = &source.volume {
            container.push_str(&format!(", *{volume}*"));
        }
        if let Some(issue) = &source.issue {
            container.push_str(&format!("({issue})"));
        }
        if let Some(pages) = &source.pages {
            container.push_str(&format!(", {pages}"));
        }
        container.push('.');
        parts.push(container);
    } else {
        parts.push(format!("*{}*.", source.title));
    }

    if let Some(doi) = &source.doi {
        parts.push(format!("https://doi.org/{doi}"));
    } else if !source.url.is_empty() {
        parts.push(source.url.clone());
    }
    parts.join(" ")
}

fn author(name: &str) -> String {
    let init = initials(name, " ");
    if init.is_empty() {
        name.trim().to_string()
    } else {
        format!("{}, {init}", last_name(name))
    }
}

fn authors(names: &[String]) -> String {
    match names {
        [only] => author(only),
        [a, b] => format!("{}, & {}", author(a), author(b)),
        [init @ .., last] if names.len() <= MAX_LISTED_AUTHORS => format!(
            "{}, & {}",
            init.iter().map(|n| author(n)).collect::<Vec<_>>().join(", "),
            author(last)
        ),
        _ => {
            let head: Vec<String> = names
                .iter()
                .take(MAX_LISTED_AUTHORS - 1)
                .map(|n| author(n))
                .collect();
            let last = names.last().map(|n| author(n)).unwrap_or_default();
            format!("{}, ... {last}", head.join(", "))
        }
    }
}

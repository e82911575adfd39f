//! IEEE numbered references.
//!
//! Numbers come from the caller's [`CitationContext`](super::CitationContext).

use super::{initials, last_name};
use crate::core::Source;

/// Authors listed in full before `et al.` is used.
const MAX_LISTED_AUTHORS: usize = 6;

/// `[n]`.
#[must_use]
pub fn in_text(number: usize) -> String {
    format!("[{number}]")
}

/// Reference-list entry numbered `number`.
#[must_use]
pub fn entry(source: &Source, number: usize) -> String {
    let mut parts = vec![in_text(number)];
    if !source.authors.is_empty() {
        parts.push(format!("{},", authors(&source.authors)));
    }

    if let Some(journal) = &source.journal {
        parts.push(format!("\"{},\"", source.title));
        parts.push(format!("*{journal}*,"));
    } else {
        parts.push(format!("*{}*,", source.title));
    }
    if let Some(volume) = &source.volume {
        match &source.issue {
            Some(issue) => parts.push(format!("vol. {volume}, no. {issue},")),
            None => parts.push(format!("vol. {volume},")),
        }
    }
    if let Some(pages) = &source.pages {
        parts.push(format!("pp. {pages},"));
    }
    match source.year {
        Some(year) => parts.push(format!("{year}.")),
        None => {
            if let Some(last) = parts.last_mut()
                && last.ends_with(',')
            {
                last.pop();
                last.push('.');
            }
        }
    }

    if let Some(doi) = &source.doi {
        parts.push(format!("doi: {doi}."));
    } else if !source.url.is_empty() {
        parts.push(format!("[Online]. Available: {}", source.url));
    }
    parts.join(" ")
}

fn author(name: &str) -> String {
    let init = initials(name, " ");
    if init.is_empty() {
        name.trim().to_string()
    } else {
        format!("{init} {}", last_name(name))
    }
}

fn authors(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [only] => author(only),
        [a, b] => format!("{} and {}", author(a), author(b)),
        [init @ .., last] if names.len() <= MAX_LISTED_AUTHORS => format!(
            "{}, and {}",
            init.iter().map(|n| author(n)).collect::<Vec<_>>().join(", "),
            author(last)
        ),
        [first, ..] => format!("{} *et al.*", author(first)),
    }
}

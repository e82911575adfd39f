//! MLA 9th edition.

use super::{first_page, inverted, last_name, short_title};
use crate::core::Source;

/// `(Smith)`, `(Smith and Patel 45)` or `("Title")` when no author is known.
#[must_use]
pub fn in_text(source: &Source) -> String {
    let who = match source.authors.as_slice() {
        [] => format!("\"{}\"", short_title(&source.title, 30)),
        [only] => last_name(only).to_string(),
        [a, b] => format!("{} and {}", last_name(a), last_name(b)),
        [first, ..] => format!("{} et al.", last_name(first)),
    };
    match &source.pages {
        Some(pages) => format!("({who} {})", first_page(pages)),
        None => format!("({who})"),
    }
}

/// Works Cited entry.
#[must_use]
pub fn entry(source: &Source) -> String {
    let mut parts = Vec::new();
    if !source.authors.is_empty() {
        parts.push(format!("{}.", authors(&source.authors)));
    }

    if let Some(journal) = &source.journal {
        parts.push(format!("\"{}.\"", source.title));
        parts.push(format!("*{journal}*,"));
    } else {
        parts.push(format!("*{}*.", source.title));
    }

    if let Some(volume) = &source.volume {
        match &source.issue {
            Some(issue) => parts.push(format!("vol. {volume}, no. {issue},")),
            None => parts.push(format!("vol. {volume},")),
        }
    }
    if let Some(year) = source.year {
        parts.push(format!("{year},"));
    }
    match &source.pages {
        Some(pages) => parts.push(format!("pp. {pages}.")),
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
        parts.push(format!("doi:{doi}."));
    } else if !source.url.is_empty() {
        parts.push(format!("{}.", source.url));
    }
    parts.join(" ")
}

fn authors(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [only] => inverted(only),
        [a, b] => format!("{}, and {b}", inverted(a)),
        [a, b, c] => format!("{}, {b}, and {c}", inverted(a)),
        [first, ..] => format!("{}, et al", inverted(first)),
    }
}

//! Chicago author-date.

use super::{first_page, inverted, last_name, short_title, year};
use crate::core::Source;

/// `(Smith and Patel 2021, 45)`.
#[must_use]
pub fn in_text(source: &Source) -> String {
    let who = match source.authors.as_slice() {
        [] => short_title(&source.title, 20),
        [only] => last_name(only).to_string(),
        [a, b] => format!("{} and {}", last_name(a), last_name(b)),
        [a, b, c] => format!("{}, {}, and {}", last_name(a), last_name(b), last_name(c)),
        [first, ..] => format!("{} et al.", last_name(first)),
    };
    match &source.pages {
        Some(pages) => format!("({who} {}, {})", year(source), first_page(pages)),
        None => format!("({who} {})", year(source)),
    }
}

/// Bibliography entry.
#[must_use]
pub fn entry(source: &Source) -> String {
    let mut parts = Vec::new();
    if !source.authors.is_empty() {
        parts.push(format!("{}.", authors(&source.authors)));
    }
    parts.push(format!("{}.", year(source)));

    if let Some(journal) = &source.journal {
        parts.push(format!("\"{}.\"", source.title));
        let mut container = format!("*{journal}*");
        if let Some(volume) = &source.volume {
            container.push_str(&format!(" {volume}"));
        }
        if let Some(issue) = &source.issue {
            container.push_str(&format!(", no. {issue}"));
        }
        if let Some(pages) = &source.pages {
            container.push_str(&format!(": {pages}"));
        }
        container.push('.');
        parts.push(container);
    } else {
        parts.push(format!("*{}*.", source.title));
        if let Some(publisher) = &source.publisher {
            parts.push(format!("{publisher}."));
        }
    }

    if let Some(doi) = &source.doi {
        parts.push(format!("https://doi.org/{doi}."));
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
        [first, middle @ .., last] if names.len() <= 10 => {
            let mut listed = vec![inverted(first)];
            listed.extend(middle.iter().cloned());
            listed.push(format!("and {last}"));
            listed.join(", ")
        }
        [first, rest @ ..] => {
            let mut listed = vec![inverted(first)];
            listed.extend(rest.iter().take(6).cloned());
            format!("{}, et al", listed.join(", "))
        }
    }
}

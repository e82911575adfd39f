//! Output formatting for CLI commands.
//!
//! Every command renders either a human-readable text block or JSON.
//! `ndjson` emits one compact JSON document per line.

use std::fmt::Write as _;

use serde::Serialize;

use crate::agent::{AgentConfig, PaperReport};
use crate::config::PaperConfig;
use crate::core::Session;

/// Output format selected with `--output-format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
    /// Compact, newline-delimited JSON.
    Ndjson,
}

impl OutputFormat {
    /// Parses a format name, falling back to text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            "ndjson" | "jsonl" => Self::Ndjson,
            _ => Self::Text,
        }
    }

    /// Serializes `value` in this format's JSON flavor.
    #[must_use]
    pub fn to_json<T: Serialize + ?Sized>(self, value: &T) -> String {
        let rendered = match self {
            Self::Ndjson => serde_json::to_string(value),
            Self::Text | Self::Json => serde_json::to_string_pretty(value),
        };
        match rendered {
            Ok(mut s) => {
                s.push('\n');
                s
            }
            Err(e) => format!("{{\"error\": \"serialization failed: {e}\"}}\n"),
        }
    }
}

/// Truncates to `max_len` characters, ending with `...` when cut.
pub(crate) fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len <= 3 {
        return s.chars().take(max_len).collect();
    }
    let mut out: String = s.chars().take(max_len - 3).collect();
    out.push_str("...");
    out
}

/// Renders the result of `generate`.
#[must_use]
pub fn format_report(report: &PaperReport, format: OutputFormat) -> String {
    if format != OutputFormat::Text {
        return format.to_json(report);
    }

    let mut out = String::new();
    let _ = writeln!(out, "Paper generated: {}", report.session.title);
    let _ = writeln!(out, "  Session:  {}", report.session.id);
    let _ = writeln!(out, "  Topic:    {}", report.session.topic);
    let _ = writeln!(
        out,
        "  Style:    {} | Words: {} (target {})",
        report.session.citation_style,
        report.draft.word_count(),
        report.session.target_word_count
    );
    let _ = writeln!(out, "  Sources:  {}", report.sources);
    let _ = writeln!(
        out,
        "  Review:   {} after {} cycle(s), version {} | approved: {}",
        report.loop_state,
        report.cycles,
        report.draft.version,
        if report.feedback.approved { "yes" } else { "no" }
    );
    let _ = writeln!(
        out,
        "  Issues:   {} unresolved of {}",
        report.feedback.unresolved().count(),
        report.feedback.issues.len()
    );
    let _ = writeln!(
        out,
        "  Format:   {} ({} note(s))",
        if report.format_review.approved { "approved" } else { "needs revision" },
        report.format_review.notes()
    );

    if report.exports.is_empty() {
        out.push_str("\nNo documents exported.\n");
    } else {
        out.push_str("\nExports:\n");
        for (format, path) in &report.exports {
            let _ = writeln!(out, "  {:<9} {}", format.as_str(), path.display());
        }
    }
    if !report.failures.is_empty() {
        out.push_str("\nFailed exports:\n");
        for (format, message) in &report.failures {
            let _ = writeln!(out, "  {:<9} {message}", format.as_str());
        }
    }

    let _ = writeln!(
        out,
        "\nTokens: {} | Time: {:.1}s",
        report.tokens.total_tokens,
        report.elapsed.as_secs_f64()
    );
    out
}

/// Renders the session list.
#[must_use]
pub fn format_sessions(sessions: &[Session], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format.to_json(sessions),
        OutputFormat::Ndjson => sessions.iter().map(|s| format.to_json(s)).collect(),
        OutputFormat::Text => {
            if sessions.is_empty() {
                return "No sessions found.\n".to_string();
            }
            let mut out = format!(
                "{:<8}  {:<11}  {:>5}  {:<16}  {}\n",
                "ID", "STATUS", "PROG", "UPDATED", "TOPIC"
            );
            for session in sessions {
                let id = session.id.to_string();
                let _ = writeln!(
                    out,
                    "{:<8}  {:<11}  {:>4.0}%  {:<16}  {}",
                    &id[..8],
                    session.status.as_str(),
                    session.progress,
                    session.updated_at.format("%Y-%m-%d %H:%M"),
                    truncate_str(&session.topic, 60)
                );
            }
            out
        }
    }
}

/// Renders the resolved configuration. API keys are never printed.
#[must_use]
pub fn format_config(
    paper: &PaperConfig,
    agent: Option<&AgentConfig>,
    format: OutputFormat,
) -> String {
    let agent_json = agent.map(|a| {
        serde_json::json!({
            "provider": a.provider,
            "base_url": a.base_url,
            "writer_model": a.writer_model,
            "reviewer_model": a.reviewer_model,
            "editor_model": a.editor_model,
            "planner_model": a.planner_model,
            "timeout_secs": a.timeout.as_secs(),
            "max_retries": a.max_retries,
            "review_concurrency": a.review_concurrency,
            "prompt_dir": a.prompt_dir,
        })
    });

    if format != OutputFormat::Text {
        let json = serde_json::json!({
            "paper": paper,
            "google_search": paper.google_configured(),
            "llm": agent_json,
        });
        return format.to_json(&json);
    }

    let mut out = String::from("Paper\n");
    let _ = writeln!(out, "  Word count:      {}", paper.word_count);
    let _ = writeln!(out, "  Citation style:  {}", paper.citation_style);
    let _ = writeln!(
        out,
        "  Review cycles:   {}..={}",
        paper.min_review_cycles, paper.max_review_cycles
    );
    let _ = writeln!(
        out,
        "  Sources:         {}..={} ({} per query)",
        paper.min_sources, paper.max_sources, paper.results_per_query
    );
    let _ = writeln!(out, "  Database:        {}", paper.database_path.display());
    let _ = writeln!(out, "  Output:          {}", paper.output_dir.display());
    let _ = writeln!(
        out,
        "  Google search:   {}",
        if paper.google_configured() {
            "configured"
        } else {
            "not configured (arXiv only)"
        }
    );

    out.push_str("\nLLM\n");
    match agent {
        Some(a) => {
            let _ = writeln!(out, "  Provider:        {}", a.provider);
            if let Some(url) = &a.base_url {
                let _ = writeln!(out, "  Base URL:        {url}");
            }
            let _ = writeln!(out, "  Writer model:    {}", a.writer_model);
            let _ = writeln!(out, "  Reviewer model:  {}", a.reviewer_model);
            let _ = writeln!(out, "  Editor model:    {}", a.editor_model);
            let _ = writeln!(out, "  Planner model:   {}", a.planner_model);
            let _ = writeln!(
                out,
                "  Retries:         {} (timeout {}s)",
                a.max_retries,
                a.timeout.as_secs()
            );
        }
        None => out.push_str("  Not configured (set OPENAI_API_KEY or ACADEMICIAN_API_KEY)\n"),
    }
    out
}

//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Academician: LLM-driven academic paper generation.
///
/// Researches a topic, drafts a paper, and iterates a review–edit loop
/// until the reviewer approves or the cycle budget runs out.
#[derive(Parser, Debug)]
#[command(name = "academician")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the session database.
    ///
    /// Defaults to `./data/academician.db`.
    #[arg(short, long, env = "DATABASE_PATH", global = true)]
    pub db_path: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json, ndjson).
    #[arg(long, default_value = "text", global = true)]
    pub output_format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a paper on a topic.
    ///
    /// Runs topic refinement, source discovery, writing, the review–edit
    /// loop and export. Requires an LLM API key.
    #[command(after_help = r#"Examples:
  academician generate "soil carbon sequestration"           # Defaults (APA, 18000 words)
  academician generate "urban heat islands" -s ieee -w 8000  # IEEE, shorter paper
  academician generate "CRISPR ethics" -f pdf -f markdown    # Selected formats only
  academician generate "remote work" --interactive           # Answer clarifying questions
  academician --output-format json generate "topic" | jq '.exports'
"#)]
    Generate {
        /// Research topic.
        topic: String,

        /// Citation style (apa, mla, chicago, ieee, harvard).
        #[arg(short, long)]
        style: Option<String>,

        /// Target word count (5000-30000).
        #[arg(short, long)]
        words: Option<usize>,

        /// Output directory for exported documents.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Export formats (pdf, docx, latex, markdown). Defaults to all.
        #[arg(short, long = "format", value_delimiter = ',')]
        formats: Vec<String>,

        /// Answer topic clarification questions on stdin.
        #[arg(short, long)]
        interactive: bool,

        /// Directory containing prompt template files.
        #[arg(long)]
        prompt_dir: Option<PathBuf>,
    },

    /// Show the resolved configuration.
    Config,

    /// Show version information.
    Version,

    /// List recent sessions.
    #[command(after_help = r#"Examples:
  academician sessions               # 20 most recent
  academician sessions --limit 5     # 5 most recent
"#)]
    Sessions {
        /// Maximum sessions to list.
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Write default prompt templates to a directory for customization.
    ///
    /// Creates one markdown file per role (reviewer, editor, researcher,
    /// planner, writer, summarizer). Existing files are not overwritten.
    #[command(after_help = r#"Examples:
  academician init-prompts                     # Write to ~/.config/academician/prompts/
  academician init-prompts --dir ./my-prompts  # Write to custom directory
"#)]
    InitPrompts {
        /// Target directory for prompt templates.
        ///
        /// Defaults to `~/.config/academician/prompts/`.
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

impl Cli {
    /// Returns the database path, using the default if not specified.
    #[must_use]
    pub fn get_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(crate::config::DEFAULT_DB_PATH))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_db_path() {
        let cli = Cli {
            db_path: None,
            verbose: false,
            output_format: "text".to_string(),
            command: Commands::Version,
        };
        assert_eq!(
            cli.get_db_path(),
            PathBuf::from(crate::config::DEFAULT_DB_PATH)
        );
    }

    #[test]
    fn test_generate_arguments() {
        let cli = Cli::try_parse_from([
            "academician",
            "generate",
            "soil carbon",
            "-s",
            "ieee",
            "--words",
            "8000",
            "-f",
            "pdf,markdown",
            "--format",
            "docx",
            "-i",
        ])
        .unwrap_or_else(|_| unreachable!());
        let Commands::Generate {
            topic,
            style,
            words,
            formats,
            interactive,
            ..
        } = cli.command
        else {
            unreachable!()
        };
        assert_eq!(topic, "soil carbon");
        assert_eq!(style.as_deref(), Some("ieee"));
        assert_eq!(words, Some(8000));
        assert_eq!(formats, vec!["pdf", "markdown", "docx"]);
        assert!(interactive);
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "academician",
            "sessions",
            "--limit",
            "3",
            "--output-format",
            "json",
            "--db-path",
            "/tmp/x.db",
        ])
        .unwrap_or_else(|_| unreachable!());
        assert_eq!(cli.output_format, "json");
        assert_eq!(cli.get_db_path(), PathBuf::from("/tmp/x.db"));
        assert!(matches!(cli.command, Commands::Sessions { limit: 3 }));
    }
}

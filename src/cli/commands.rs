//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

use std::fmt::Write as FmtWrite;
use std::io::{self, BufRead, Write as IoWrite};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::agent::client::create_provider;
use crate::agent::config::AgentConfig;
use crate::agent::orchestrator::{Orchestrator, PipelineContext};
use crate::agent::prompt::PromptSet;
use crate::agent::stages::{Clarifier, NoClarifier};
use crate::cli::output::{OutputFormat, format_config, format_report, format_sessions};
use crate::cli::parser::{Cli, Commands};
use crate::config::PaperConfig;
use crate::core::CitationStyle;
use crate::error::{CommandError, Result};
use crate::export::ExportFormat;
use crate::search::{ArxivSearch, GoogleSearch, PageFetcher, SourceSearch};
use crate::storage::{ArtifactStore, SqliteStorage, Storage};

/// Parameters for the generate command.
#[derive(Debug, Clone, Default)]
pub struct GenerateParams<'a> {
    /// Research topic.
    pub topic: &'a str,
    /// Citation style name.
    pub style: Option<&'a str>,
    /// Target word count.
    pub words: Option<usize>,
    /// Output directory.
    pub output: Option<&'a Path>,
    /// Export format names; empty means all.
    pub formats: &'a [String],
    /// Ask clarification questions on stdin.
    pub interactive: bool,
    /// Directory containing prompt template files.
    pub prompt_dir: Option<&'a Path>,
}

/// Executes the CLI command.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.output_format);
    let db_path = cli.get_db_path();

    match &cli.command {
        Commands::Generate {
            topic,
            style,
            words,
            output,
            formats,
            interactive,
            prompt_dir,
        } => {
            let params = GenerateParams {
                topic,
                style: style.as_deref(),
                words: *words,
                output: output.as_deref(),
                formats,
                interactive: *interactive,
                prompt_dir: prompt_dir.as_deref(),
            };
            cmd_generate(&db_path, &params, format)
        }
        Commands::Config => cmd_config(&db_path, format),
        Commands::Version => Ok(cmd_version(format)),
        Commands::Sessions { limit } => cmd_sessions(&db_path, *limit, format),
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
    }
}

/// Parses export format names; an empty list selects every format.
///
/// # Errors
///
/// Returns [`CommandError::InvalidArgument`] for an unknown name.
pub fn parse_formats(names: &[String]) -> Result<Vec<ExportFormat>> {
    if names.is_empty() {
        return Ok(ExportFormat::ALL.to_vec());
    }
    let mut formats = Vec::new();
    for name in names {
        let format = ExportFormat::parse(name).ok_or_else(|| {
            CommandError::InvalidArgument(format!(
                "unknown export format '{name}' (expected pdf, docx, latex or markdown)"
            ))
        })?;
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    Ok(formats)
}

fn parse_style(name: &str) -> Result<CitationStyle> {
    CitationStyle::parse(name).map_or_else(
        || {
            Err(CommandError::InvalidArgument(format!(
                "unknown citation style '{name}' (expected apa, mla, chicago, ieee or harvard)"
            ))
            .into())
        },
        Ok,
    )
}

/// Resolves paper configuration from CLI overrides and the environment.
fn paper_config(
    db_path: &Path,
    style: Option<&str>,
    words: Option<usize>,
    output: Option<&Path>,
) -> Result<PaperConfig> {
    let mut builder = PaperConfig::builder().database_path(db_path);
    if let Some(style) = style {
        builder = builder.citation_style(parse_style(style)?);
    }
    if let Some(words) = words {
        builder = builder.word_count(words);
    }
    if let Some(output) = output {
        builder = builder.output_dir(output);
    }
    builder.from_env().build()
}

/// Reads clarification answers from stdin, one line per question.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinClarifier;

fn ask_on_terminal(questions: &[String]) -> Option<String> {
    let mut stderr = io::stderr();
    let stdin = io::stdin();
    let mut lines = stdin.lock();
    let _ = writeln!(stderr, "\nThe topic needs clarification. Press Enter to skip a question.\n");

    let mut answers = String::new();
    for (i, question) in questions.iter().enumerate() {
        let _ = write!(stderr, "{}. {question}\n> ", i + 1);
        let _ = stderr.flush();
        let mut line = String::new();
        if lines.read_line(&mut line).ok()? == 0 {
            break;
        }
        let answer = line.trim();
        if !answer.is_empty() {
            let _ = writeln!(answers, "Q: {question}\nA: {answer}");
        }
    }
    (!answers.is_empty()).then_some(answers)
}

#[async_trait]
impl Clarifier for StdinClarifier {
    async fn answer(&self, questions: &[String]) -> Option<String> {
        let questions = questions.to_vec();
        tokio::task::spawn_blocking(move || ask_on_terminal(&questions))
            .await
            .ok()
            .flatten()
    }
}

fn search_backends(paper: &PaperConfig) -> Vec<Box<dyn SourceSearch>> {
    let mut backends: Vec<Box<dyn SourceSearch>> = vec![Box::new(ArxivSearch::new())];
    if let (Some(key), Some(cx)) = (&paper.google_api_key, &paper.google_cse_id) {
        backends.push(Box::new(GoogleSearch::new(key, cx)));
    } else {
        debug!("Google search not configured, using arXiv only");
    }
    backends
}

// ==================== Command Implementations ====================

fn cmd_generate(db_path: &Path, params: &GenerateParams<'_>, format: OutputFormat) -> Result<String> {
    let topic = params.topic.trim();
    if topic.is_empty() {
        return Err(CommandError::InvalidArgument("topic must not be empty".to_string()).into());
    }
    let formats = parse_formats(params.formats)?;
    let paper = paper_config(db_path, params.style, params.words, params.output)?;

    let mut builder = AgentConfig::builder().from_env();
    if let Some(dir) = params.prompt_dir {
        builder = builder.prompt_dir(dir);
    }
    let config = builder.build()?;
    let provider = create_provider(&config)?;

    let backends = search_backends(&paper);
    let artifacts = ArtifactStore::new(paper.output_dir.join("artifacts"));
    let mut storage = SqliteStorage::open_initialized(&paper.database_path)?;
    let orchestrator = Orchestrator::new(provider, config, paper)?.with_page_fetcher(PageFetcher::new());

    let clarifier: &dyn Clarifier = if params.interactive {
        &StdinClarifier
    } else {
        &NoClarifier
    };

    // Create tokio runtime as sync/async bridge
    let rt = tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}"))
    })?;

    let report = rt.block_on(orchestrator.generate(
        topic,
        &formats,
        PipelineContext {
            storage: &mut storage,
            backends: &backends,
            clarifier,
            artifacts: Some(&artifacts),
        },
    ))?;

    Ok(format_report(&report, format))
}

fn cmd_config(db_path: &Path, format: OutputFormat) -> Result<String> {
    let paper = paper_config(db_path, None, None, None)?;
    let agent = AgentConfig::from_env().ok();
    Ok(format_config(&paper, agent.as_ref(), format))
}

fn cmd_version(format: OutputFormat) -> String {
    let name = env!("CARGO_PKG_NAME");
    let version = env!("CARGO_PKG_VERSION");
    match format {
        OutputFormat::Text => format!("{name} {version}\n"),
        OutputFormat::Json | OutputFormat::Ndjson => {
            format.to_json(&serde_json::json!({ "name": name, "version": version }))
        }
    }
}

fn cmd_sessions(db_path: &Path, limit: usize, format: OutputFormat) -> Result<String> {
    if !db_path.exists() {
        return Ok(format_sessions(&[], format));
    }
    let storage = SqliteStorage::open(db_path)?;
    if !storage.is_initialized()? {
        return Ok(format_sessions(&[], format));
    }
    let sessions = storage.list_sessions(limit)?;
    Ok(format_sessions(&sessions, format))
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(PathBuf::from)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                return Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ));
            }
            let mut output = format!(
                "Wrote {} prompt template(s) to: {}\n",
                written.len(),
                target_dir.display()
            );
            for path in &written {
                let _ = writeln!(
                    output,
                    "  {}",
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("unknown")
                );
            }
            output.push_str("\nEdit these files to customize agent system prompts.\n");
            Ok(output)
        }
        OutputFormat::Json | OutputFormat::Ndjson => {
            let json = serde_json::json!({
                "directory": target_dir.to_string_lossy(),
                "written": written.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
                "count": written.len()
            });
            Ok(format.to_json(&json))
        }
    }
}

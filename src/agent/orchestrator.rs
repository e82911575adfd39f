//! Orchestrator for the paper-generation pipeline.
//!
//! Drives the stages in order: topic refinement → source discovery →
//! summarization → planning → body → framing sections → references →
//! review–edit loop → final review → format review → export. The session is saved after
//! every stage so a failed run leaves an accurate record behind.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::config::AgentConfig;
use super::editor::EditorAgent;
use super::message::TokenUsage;
use super::prompt::PromptSet;
use super::provider::LlmProvider;
use super::review_loop::{LoopState, ReviewLoop};
use super::reviewer::ReviewerAgent;
use super::stages::{Clarifier, FormatReview, Stages};
use crate::citation::CitationContext;
use crate::config::PaperConfig;
use crate::core::{Draft, Feedback, SectionKind, Session, Source, WorkflowStage};
use crate::error::{AgentError, Error};
use crate::export::{ExportFormat, ExportSummary, PaperMetadata, export_all};
use crate::search::{PageFetcher, SourceSearch, discover, merge_new_sources};
use crate::storage::{ArtifactStore, Storage};

/// Collaborators a single run needs besides the language model.
pub struct PipelineContext<'a> {
    /// Where sessions, sources, drafts and feedback are saved.
    pub storage: &'a mut dyn Storage,
    /// Search backends queried during discovery.
    pub backends: &'a [Box<dyn SourceSearch>],
    /// Answers topic clarification questions.
    pub clarifier: &'a dyn Clarifier,
    /// Optional flat-file artifact sink.
    pub artifacts: Option<&'a ArtifactStore>,
}

impl std::fmt::Debug for PipelineContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field(
                "backends",
                &self.backends.iter().map(|b| b.name()).collect::<Vec<_>>(),
            )
            .field("artifacts", &self.artifacts.map(ArtifactStore::root))
            .finish_non_exhaustive()
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct PaperReport {
    /// Final session record.
    pub session: Session,
    /// Final draft.
    pub draft: Draft,
    /// Feedback of the last review, final review included.
    pub feedback: Feedback,
    /// Citation-format and structure notes on the final draft.
    pub format_review: FormatReview,
    /// Terminal state of the review–edit loop.
    pub loop_state: LoopState,
    /// Review cycles run by the loop.
    pub cycles: u32,
    /// Written documents.
    pub exports: Vec<(ExportFormat, PathBuf)>,
    /// Formats that failed to export.
    pub failures: Vec<(ExportFormat, String)>,
    /// Sources used.
    pub sources: usize,
    /// Tokens used across all collaborators.
    pub tokens: TokenUsage,
    /// Wall-clock time of the run.
    #[serde(serialize_with = "serialize_duration")]
    pub elapsed: Duration,
}

fn serialize_duration<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// What the stage sequence hands back to [`Orchestrator::generate`].
struct PipelineOutput {
    draft: Draft,
    feedback: Feedback,
    format_review: FormatReview,
    loop_state: LoopState,
    cycles: u32,
    sources: usize,
    exports: ExportSummary,
}

/// Coordinates the stage runner, reviewer, editor and loop controller.
pub struct Orchestrator {
    stages: Stages,
    reviewer: ReviewerAgent,
    editor: EditorAgent,
    review_loop: ReviewLoop,
    paper: PaperConfig,
}

impl Orchestrator {
    /// Creates an orchestrator, loading prompts from the configured
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Config`] if the review cycle bounds are
    /// inconsistent.
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        config: AgentConfig,
        paper: PaperConfig,
    ) -> Result<Self, AgentError> {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        Self::with_prompts(provider, config, paper, prompts)
    }

    /// Creates an orchestrator with an explicit prompt set.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Config`] if the review cycle bounds are
    /// inconsistent.
    pub fn with_prompts(
        provider: Arc<dyn LlmProvider>,
        config: AgentConfig,
        paper: PaperConfig,
        prompts: PromptSet,
    ) -> Result<Self, AgentError> {
        let review_loop = ReviewLoop::new(paper.min_review_cycles, paper.max_review_cycles)?;
        let reviewer = ReviewerAgent::new(Arc::clone(&provider), &config, prompts.reviewer.clone())
            .with_min_cycles(paper.min_review_cycles);
        let editor = EditorAgent::new(Arc::clone(&provider), &config, prompts.editor.clone());
        Ok(Self {
            stages: Stages::new(provider, config, prompts),
            reviewer,
            editor,
            review_loop,
            paper,
        })
    }

    /// Fetches source pages for summarization when a source has no
    /// abstract.
    #[must_use]
    pub fn with_page_fetcher(mut self, fetcher: PageFetcher) -> Self {
        self.stages = self.stages.with_fetcher(fetcher);
        self
    }

    /// Paper settings for this orchestrator.
    #[must_use]
    pub const fn paper_config(&self) -> &PaperConfig {
        &self.paper
    }

    /// Tokens used by every collaborator so far.
    #[must_use]
    pub fn usage(&self) -> TokenUsage {
        let mut usage = self.stages.usage();
        usage.add(self.reviewer.usage());
        usage.add(self.editor.usage());
        usage
    }

    /// Generates a paper on `topic` and exports it in `formats`.
    ///
    /// # Errors
    ///
    /// Returns the first fatal stage or storage error. The session is
    /// marked failed and saved before returning, and nothing is exported.
    #[allow(clippy::future_not_send)]
    pub async fn generate(
        &self,
        topic: &str,
        formats: &[ExportFormat],
        mut ctx: PipelineContext<'_>,
    ) -> Result<PaperReport, Error> {
        let start = Instant::now();
        let usage_before = self.usage();
        let mut session = Session::new(topic.trim(), self.paper.citation_style, self.paper.word_count);
        ctx.storage.save_session(&session)?;
        info!(
            session = %session.id,
            topic = %session.topic,
            style = %session.citation_style,
            words = session.target_word_count,
            "Starting paper generation"
        );

        let output = match self.run_stages(&mut session, formats, &mut ctx).await {
            Ok(output) => output,
            Err(e) => {
                error!(session = %session.id, stage = %session.current_stage, error = %e, "Paper generation failed");
                session.mark_failed(e.to_string());
                if let Err(save_err) = ctx.storage.save_session(&session) {
                    warn!(session = %session.id, error = %save_err, "Could not record failed session");
                }
                return Err(e);
            }
        };

        session.mark_completed();
        ctx.storage.save_session(&session)?;

        let mut tokens = self.usage();
        tokens.prompt_tokens = tokens.prompt_tokens.saturating_sub(usage_before.prompt_tokens);
        tokens.completion_tokens = tokens
            .completion_tokens
            .saturating_sub(usage_before.completion_tokens);
        tokens.total_tokens = tokens.total_tokens.saturating_sub(usage_before.total_tokens);

        let elapsed = start.elapsed();
        info!(
            session = %session.id,
            words = output.draft.word_count(),
            loop_state = %output.loop_state,
            exports = output.exports.files.len(),
            failures = output.exports.failures.len(),
            total_tokens = tokens.total_tokens,
            elapsed_ms = elapsed.as_millis(),
            "Paper generation complete"
        );

        Ok(PaperReport {
            session,
            draft: output.draft,
            feedback: output.feedback,
            format_review: output.format_review,
            loop_state: output.loop_state,
            cycles: output.cycles,
            exports: output.exports.files,
            failures: output.exports.failures,
            sources: output.sources,
            tokens,
            elapsed,
        })
    }

    #[allow(clippy::future_not_send)]
    async fn run_stages(
        &self,
        session: &mut Session,
        formats: &[ExportFormat],
        ctx: &mut PipelineContext<'_>,
    ) -> Result<PipelineOutput, Error> {
        // Topic refinement and title.
        advance(ctx.storage, session, WorkflowStage::TopicRefinement, 5.0)?;
        let analysis = self.stages.analyze_topic(&session.topic).await?;
        if analysis.needs_clarification && !analysis.questions.is_empty() {
            match ctx.clarifier.answer(&analysis.questions).await {
                Some(answers) if !answers.trim().is_empty() => {
                    session.topic = self.stages.refine_topic(&session.topic, &answers).await?;
                    info!(topic = %session.topic, "Topic refined");
                }
                _ => debug!("No clarification given, keeping topic as stated"),
            }
        }
        session.title = self.stages.formulate_title(&session.topic).await?;
        advance(ctx.storage, session, WorkflowStage::TopicRefinement, 10.0)?;

        // Discovery.
        advance(ctx.storage, session, WorkflowStage::SourceDiscovery, 15.0)?;
        let queries = self.stages.search_queries(&session.topic).await?;
        let mut sources = self.discover_sources(ctx.backends, &queries, session).await?;
        ctx.storage.save_sources(session.id, &sources)?;
        advance(ctx.storage, session, WorkflowStage::SourceDiscovery, 25.0)?;

        // Summarization.
        self.stages.summarize_all(&mut sources, &session.topic).await?;
        ctx.storage.save_sources(session.id, &sources)?;
        advance(ctx.storage, session, WorkflowStage::SourceSummarization, 35.0)?;

        // Planning.
        let outline = self
            .stages
            .plan_outline(&sources, &session.topic, &session.title, session.target_word_count)
            .await?;
        if let Some(artifacts) = ctx.artifacts {
            artifacts.save(session.id, "outline", &outline)?;
        }
        advance(ctx.storage, session, WorkflowStage::ResearchPlanning, 40.0)?;

        // Writing.
        let mut draft = Draft::new(session.id);
        let mut citations = CitationContext::new(session.citation_style);
        self.stages
            .write_body(&mut draft, &outline, &sources, &mut citations)
            .await?;
        advance(ctx.storage, session, WorkflowStage::BodyWriting, 60.0)?;
        self.stages
            .write_framing(&mut draft, &session.title, &session.topic, &citations)
            .await?;

        let references = citations.bibliography(&sources);
        if references.is_empty() {
            warn!("No sources to cite, leaving references empty");
        } else {
            draft.set_section(SectionKind::References, references);
        }
        if !draft.has_content() {
            return Err(AgentError::EmptyDraft.into());
        }
        ctx.storage.save_draft(&draft)?;
        advance(ctx.storage, session, WorkflowStage::IntroConclusion, 70.0)?;

        // Review–edit loop.
        advance(ctx.storage, session, WorkflowStage::Review, 70.0)?;
        let outcome = self
            .review_loop
            .run(&self.reviewer, &self.editor, &mut draft)
            .await?;
        let mut feedback = outcome.feedback;
        ctx.storage.save_feedback(&feedback)?;
        ctx.storage.save_draft(&draft)?;
        advance(ctx.storage, session, WorkflowStage::Review, 90.0)?;

        advance(ctx.storage, session, WorkflowStage::FinalReview, 90.0)?;
        if outcome.state == LoopState::Exhausted {
            let check = ReviewerAgent::check_resolved_issues(&mut feedback, &draft);
            info!(
                total = check.total,
                resolved = check.resolved,
                remaining = check.remaining,
                "Checked last feedback against edited draft"
            );
            ctx.storage.save_feedback(&feedback)?;

            feedback = self
                .reviewer
                .final_review(&mut draft, outcome.cycles + 1)
                .await?;
            info!(approved = feedback.approved, "Final review complete");
            ctx.storage.save_feedback(&feedback)?;
            ctx.storage.save_draft(&draft)?;
        }
        let format_review = self
            .stages
            .format_review(&draft, session.citation_style)
            .await?;
        if let Some(artifacts) = ctx.artifacts {
            artifacts.save(session.id, "final_feedback", &feedback)?;
            artifacts.save(session.id, "format_review", &format_review)?;
        }
        advance(ctx.storage, session, WorkflowStage::FinalReview, 95.0)?;

        // Export.
        advance(ctx.storage, session, WorkflowStage::Export, 95.0)?;
        let metadata = PaperMetadata::for_draft(session, &draft);
        let exports = export_all(&draft, &metadata, formats, &self.paper.output_dir);

        Ok(PipelineOutput {
            draft,
            feedback,
            format_review,
            loop_state: outcome.state,
            cycles: outcome.cycles,
            sources: sources.len(),
            exports,
        })
    }

    /// Searches, widening the search once with alternative queries when
    /// fewer than `min_sources` turn up.
    async fn discover_sources(
        &self,
        backends: &[Box<dyn SourceSearch>],
        queries: &[String],
        session: &Session,
    ) -> Result<Vec<Source>, Error> {
        if backends.is_empty() {
            warn!("No search backends configured");
        }
        let per_query = self.paper.results_per_query;
        let mut sources = discover(backends, queries, per_query, &session.topic).await;
        if sources.len() < self.paper.min_sources && !backends.is_empty() {
            info!(
                found = sources.len(),
                wanted = self.paper.min_sources,
                "Too few sources, expanding search"
            );
            let extra_queries = self
                .stages
                .expansion_queries(&session.topic, &sources, queries)
                .await?;
            if !extra_queries.is_empty() {
                let extra = discover(backends, &extra_queries, per_query, &session.topic).await;
                let added = merge_new_sources(&mut sources, extra);
                info!(queries = extra_queries.len(), added, "Expanded search finished");
            }
        }
        sources.truncate(self.paper.max_sources);
        if sources.len() < self.paper.min_sources {
            warn!(
                found = sources.len(),
                wanted = self.paper.min_sources,
                "Fewer sources than requested, continuing"
            );
        }
        for source in &mut sources {
            source.session_id = Some(session.id);
        }
        Ok(sources)
    }
}

/// Records stage progress and saves the session.
fn advance(
    storage: &mut dyn Storage,
    session: &mut Session,
    stage: WorkflowStage,
    progress: f32,
) -> Result<(), Error> {
    session.update_progress(stage, progress);
    storage.save_session(session)?;
    info!(stage = %stage, progress, "Stage progress");
    Ok(())
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("stages", &self.stages)
            .field("reviewer", &self.reviewer)
            .field("editor", &self.editor)
            .field("min_cycles", &self.review_loop.min_cycles())
            .field("max_cycles", &self.review_loop.max_cycles())
            .finish_non_exhaustive()
    }
}

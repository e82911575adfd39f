//! Pipeline stages around the review loop.
//!
//! Each [`StageKind`] pairs a system prompt, model and token budget with one
//! or more async functions on [`Stages`]. Structured stages request JSON and
//! degrade to an empty result when the model output does not parse.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::config::AgentConfig;
use super::message::{ResponseSchema, TokenUsage, UsageMeter};
use super::prompt::{PromptSet, format_sources, truncate_chars};
use super::provider::LlmProvider;
use super::structured::parse_structured;
use super::traits::{Agent, send};
use crate::citation::CitationContext;
use crate::core::{CitationStyle, Draft, SectionKind, Source};
use crate::error::AgentError;
use crate::search::PageFetcher;

/// Maximum search queries produced by the query stage.
pub const MAX_SEARCH_QUERIES: usize = 5;
/// Alternative queries asked for when discovery comes up short.
pub const MAX_EXPANSION_QUERIES: usize = 3;
/// Source titles shown to the model when asking for alternative queries.
const EXPANSION_TITLE_LIMIT: usize = 10;
/// Characters of the paper given to the format review.
const FORMAT_REVIEW_CONTENT_LIMIT: usize = 5000;
/// Characters of the references given to the format review.
const FORMAT_REVIEW_REFERENCES_LIMIT: usize = 2000;
/// Sources listed in a section-writing prompt.
const SOURCES_PER_SECTION: usize = 15;
/// Characters of summaries given to the planner.
const PLANNER_CONTEXT_LIMIT: usize = 8000;
/// Characters of source text given to the summarizer.
const SUMMARY_CONTENT_LIMIT: usize = 8000;
/// Word count the fixed section targets are calibrated for.
const NOMINAL_WORD_COUNT: usize = 18_000;
/// Abstract length, independent of paper length.
const ABSTRACT_TARGET_WORDS: usize = 300;

/// Closed set of pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Clarity check and refinement of the user's topic.
    TopicAnalysis,
    /// Academic title formulation.
    Title,
    /// Search query generation.
    SearchQueries,
    /// Per-source summary.
    Summary,
    /// Themes, gaps and section plan.
    Outline,
    /// Body, introduction and conclusion writing.
    Section,
    /// Abstract writing.
    Abstract,
    /// Citation-format and structure check of the finished paper.
    FormatReview,
}

impl StageKind {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TopicAnalysis => "topic_analysis",
            Self::Title => "title",
            Self::SearchQueries => "search_queries",
            Self::Summary => "summary",
            Self::Outline => "outline",
            Self::Section => "section",
            Self::Abstract => "abstract",
            Self::FormatReview => "format_review",
        }
    }

    /// Whether the stage asks for JSON output.
    #[must_use]
    pub const fn is_structured(&self) -> bool {
        matches!(
            self,
            Self::TopicAnalysis
                | Self::Title
                | Self::SearchQueries
                | Self::Outline
                | Self::FormatReview
        )
    }

    fn system_prompt<'a>(&self, prompts: &'a PromptSet) -> &'a str {
        match self {
            Self::TopicAnalysis | Self::Title | Self::SearchQueries => &prompts.researcher,
            Self::Summary => &prompts.summarizer,
            Self::Outline => &prompts.planner,
            Self::Section | Self::Abstract => &prompts.writer,
            Self::FormatReview => &prompts.reviewer,
        }
    }

    fn model<'a>(&self, config: &'a AgentConfig) -> &'a str {
        match self {
            Self::TopicAnalysis | Self::Title | Self::SearchQueries | Self::Outline => {
                &config.planner_model
            }
            Self::Summary | Self::Section | Self::Abstract => &config.writer_model,
            Self::FormatReview => &config.reviewer_model,
        }
    }

    fn max_tokens(&self, config: &AgentConfig) -> u32 {
        match self {
            Self::TopicAnalysis | Self::Title | Self::SearchQueries => config.planner_max_tokens,
            Self::Summary | Self::Outline => 1500,
            Self::Section => config.writer_max_tokens,
            Self::Abstract => 500,
            Self::FormatReview => 2000,
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Agent configured for one stage.
#[derive(Debug, Clone)]
pub struct StageAgent {
    kind: StageKind,
    model: String,
    system_prompt: String,
    max_tokens: u32,
}

impl StageAgent {
    /// Builds the agent for `kind`.
    #[must_use]
    pub fn new(kind: StageKind, config: &AgentConfig, prompts: &PromptSet) -> Self {
        Self {
            kind,
            model: kind.model(config).to_string(),
            system_prompt: kind.system_prompt(prompts).to_string(),
            max_tokens: kind.max_tokens(config),
        }
    }
}

impl Agent for StageAgent {
    fn name(&self) -> &'static str {
        self.kind.as_str()
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn json_mode(&self) -> bool {
        self.kind.is_structured()
    }

    fn temperature(&self) -> f32 {
        if self.kind.is_structured() { 0.5 } else { 0.7 }
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

/// Answers clarification questions about a topic.
#[async_trait]
pub trait Clarifier: Send + Sync {
    /// Returns the user's answers, or `None` to skip clarification.
    async fn answer(&self, questions: &[String]) -> Option<String>;
}

/// Clarifier that never answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoClarifier;

#[async_trait]
impl Clarifier for NoClarifier {
    async fn answer(&self, _questions: &[String]) -> Option<String> {
        None
    }
}

/// Result of the topic clarity check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TopicAnalysis {
    /// Whether the topic is too vague to research as stated.
    #[serde(default)]
    pub needs_clarification: bool,
    /// Short assessment of the topic.
    #[serde(default)]
    pub assessment: String,
    /// Questions for the user, 3 to 5 when clarification is needed.
    #[serde(default)]
    pub questions: Vec<String>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
struct TitleReport {
    #[serde(default)]
    titles: Vec<String>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
struct QueryReport {
    #[serde(default)]
    queries: Vec<String>,
}

/// Result of the citation-format and structure check.
///
/// Advisory: notes are recorded with the run, never applied to the draft.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FormatReview {
    /// Whether the paper passes as formatted.
    #[serde(default)]
    pub approved: bool,
    /// One-line verdict.
    #[serde(default)]
    pub summary: String,
    /// Formatting problems.
    #[serde(default)]
    pub format_issues: Vec<String>,
    /// Missing, misplaced or misnamed sections.
    #[serde(default)]
    pub structure_issues: Vec<String>,
    /// In-text markers or reference entries that break the citation style.
    #[serde(default)]
    pub citation_issues: Vec<String>,
    /// Concrete fixes.
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl FormatReview {
    /// Number of issues and recommendations.
    #[must_use]
    pub fn notes(&self) -> usize {
        self.format_issues.len()
            + self.structure_issues.len()
            + self.citation_issues.len()
            + self.recommendations.len()
    }
}

/// A theme across the literature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Theme {
    /// Theme name.
    #[serde(default)]
    pub name: String,
    /// What the theme covers.
    #[serde(default)]
    pub description: String,
    /// Titles of sources addressing it.
    #[serde(default)]
    pub sources: Vec<String>,
    /// Why it matters.
    #[serde(default)]
    pub significance: String,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
struct ThemeReport {
    #[serde(default)]
    themes: Vec<Theme>,
}

/// A gap in the existing research.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ResearchGap {
    /// Gap title.
    #[serde(default)]
    pub name: String,
    /// What existing work covers.
    #[serde(default)]
    pub current_state: String,
    /// What it leaves out.
    #[serde(default)]
    pub missing: String,
    /// How new work could fill it.
    #[serde(default)]
    pub opportunity: String,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
struct GapReport {
    #[serde(default)]
    gaps: Vec<ResearchGap>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
struct SectionPlan {
    #[serde(default)]
    section: String,
    #[serde(default)]
    key_points: Vec<String>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
struct OutlinePlan {
    #[serde(default)]
    sections: Vec<SectionPlan>,
}

/// One planned section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineSection {
    /// Section kind.
    pub kind: SectionKind,
    /// Target length in words; zero for references.
    pub target_words: usize,
    /// Points the section should cover.
    #[serde(default)]
    pub key_points: Vec<String>,
}

/// Paper plan produced by the outline stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outline {
    /// Themes across the literature.
    pub themes: Vec<Theme>,
    /// Research gaps.
    pub gaps: Vec<ResearchGap>,
    /// Sections in canonical order.
    pub sections: Vec<OutlineSection>,
}

impl Outline {
    /// The planned entry for `kind`, if any.
    #[must_use]
    pub fn section(&self, kind: SectionKind) -> Option<&OutlineSection> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    fn theme_names(&self) -> String {
        join_or(self.themes.iter().map(|t| t.name.as_str()), "Not specified")
    }

    fn gap_names(&self) -> String {
        join_or(self.gaps.iter().map(|g| g.name.as_str()), "Not specified")
    }
}

fn join_or<'a>(items: impl Iterator<Item = &'a str>, fallback: &str) -> String {
    let joined: Vec<&str> = items.filter(|s| !s.is_empty()).collect();
    if joined.is_empty() {
        fallback.to_string()
    } else {
        joined.join(", ")
    }
}

/// Section word targets for a paper of `word_count` words.
///
/// Targets are calibrated for an 18,000 word paper and scaled linearly;
/// the abstract stays at 300 words and references carry no target.
#[must_use]
pub fn section_targets(word_count: usize) -> BTreeMap<SectionKind, usize> {
    const BASE: [(SectionKind, usize); 7] = [
        (SectionKind::Introduction, 1750),
        (SectionKind::LiteratureReview, 4500),
        (SectionKind::TheoreticalFramework, 2250),
        (SectionKind::Methodology, 2250),
        (SectionKind::Analysis, 4500),
        (SectionKind::Discussion, 2250),
        (SectionKind::Conclusion, 1250),
    ];
    let mut targets = BTreeMap::new();
    targets.insert(SectionKind::Abstract, ABSTRACT_TARGET_WORDS);
    for (kind, base) in BASE {
        let scaled = (base * word_count + NOMINAL_WORD_COUNT / 2) / NOMINAL_WORD_COUNT;
        targets.insert(kind, scaled.max(1));
    }
    targets.insert(SectionKind::References, 0);
    targets
}

/// Metadata-only summary for a source with no readable text.
#[must_use]
pub fn metadata_summary(source: &Source) -> String {
    let year = source.year.map_or_else(|| "n.d.".to_string(), |y| y.to_string());
    format!(
        "[Source inaccessible - only metadata available]\n\nTitle: {}\nAuthors: {}\nYear: {year}",
        source.title,
        if source.authors.is_empty() {
            "Unknown".to_string()
        } else {
            source.authors.join(", ")
        },
    )
}

/// Summary of one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSummary {
    /// Model summary, or the metadata-only placeholder.
    pub text: String,
    /// Whether any source text was available.
    pub accessible: bool,
}

/// Runs the pipeline stages against one provider.
pub struct Stages {
    provider: Arc<dyn LlmProvider>,
    config: AgentConfig,
    prompts: PromptSet,
    fetcher: Option<PageFetcher>,
    usage: UsageMeter,
}

impl Stages {
    /// Creates a stage runner.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, config: AgentConfig, prompts: PromptSet) -> Self {
        Self {
            provider,
            config,
            prompts,
            fetcher: None,
            usage: UsageMeter::default(),
        }
    }

    /// Fetches the page of any source without an abstract before
    /// summarizing it.
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: PageFetcher) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Tokens used by all stage calls so far.
    #[must_use]
    pub fn usage(&self) -> TokenUsage {
        self.usage.snapshot()
    }

    async fn call(
        &self,
        kind: StageKind,
        user_msg: &str,
        max_tokens: Option<u32>,
        schema: Option<ResponseSchema>,
    ) -> Result<String, AgentError> {
        let agent = StageAgent::new(kind, &self.config, &self.prompts);
        let mut request = agent.request(user_msg);
        if max_tokens.is_some() {
            request.max_tokens = max_tokens;
        }
        request.response_schema = schema;
        let response = send(&*self.provider, &request).await?;
        self.usage.record(response.usage);
        if response.truncated() {
            warn!(stage = kind.as_str(), "Stage output hit the token budget");
        }
        Ok(response.content)
    }

    async fn call_structured<S, T>(
        &self,
        kind: StageKind,
        user_msg: &str,
        wrapper_key: &str,
    ) -> Result<T, AgentError>
    where
        S: JsonSchema,
        T: DeserializeOwned + Default,
    {
        let schema = ResponseSchema::for_type::<S>(wrapper_key);
        let content = self.call(kind, user_msg, None, Some(schema)).await?;
        Ok(parse_structured::<T>(&content, Some(wrapper_key)).unwrap_or_else(|e| {
            warn!(stage = kind.as_str(), error = %e, "Unreadable stage output, using empty result");
            T::default()
        }))
    }

    /// Checks whether a topic is specific enough to research.
    ///
    /// # Errors
    ///
    /// Returns provider errors that survived retries.
    pub async fn analyze_topic(&self, topic: &str) -> Result<TopicAnalysis, AgentError> {
        let prompt = format!(
            "Analyze this research topic and decide whether it needs clarification.\n\n\
             Topic: \"{topic}\"\n\n\
             Evaluate it for:\n\
             1. Specificity (is it focused enough?)\n\
             2. Clarity (are the key concepts clear?)\n\
             3. Scope (is it achievable for a research paper?)\n\
             4. Research potential (can it be researched empirically?)\n\n\
             If the topic is vague, ask 3-5 specific questions about scope, population, \
             geographic or temporal focus, methodology or variables. Avoid generic questions.\n\n\
             Respond with JSON: {{\"needs_clarification\": bool, \"assessment\": \"...\", \
             \"questions\": [\"...\"]}}"
        );
        let schema = ResponseSchema::for_type::<TopicAnalysis>("topic_analysis");
        let content = self
            .call(StageKind::TopicAnalysis, &prompt, None, Some(schema))
            .await?;
        let mut analysis = parse_structured::<TopicAnalysis>(&content, None).unwrap_or_else(|e| {
            warn!(error = %e, "Unreadable topic analysis, treating topic as clear");
            TopicAnalysis::default()
        });
        analysis.questions.retain(|q| !q.trim().is_empty());
        if analysis.questions.is_empty() {
            analysis.needs_clarification = false;
        }
        info!(
            needs_clarification = analysis.needs_clarification,
            questions = analysis.questions.len(),
            "Topic analyzed"
        );
        Ok(analysis)
    }

    /// Rewrites a topic to incorporate the user's answers.
    ///
    /// Returns the original topic if the model produces nothing.
    ///
    /// # Errors
    ///
    /// Returns provider errors that survived retries.
    pub async fn refine_topic(&self, topic: &str, answers: &str) -> Result<String, AgentError> {
        let prompt = format!(
            "Based on the original topic and the user's clarifications, create a refined \
             research topic.\n\n\
             Original Topic: \"{topic}\"\n\n\
             User's Clarifications:\n{answers}\n\n\
             The refined topic should be specific, focused, researchable and academically \
             rigorous. Respond with just the refined topic as plain text, nothing else."
        );
        let agent = StageAgent::new(StageKind::TopicAnalysis, &self.config, &self.prompts);
        let mut request = agent.request(&prompt);
        request.json_mode = false;
        let response = send(&*self.provider, &request).await?;
        self.usage.record(response.usage);

        let refined = response.content.trim().trim_matches('"').trim();
        if refined.is_empty() {
            warn!("Empty topic refinement, keeping original topic");
            return Ok(topic.to_string());
        }
        Ok(refined.to_string())
    }

    /// Formulates academic titles; returns the first, or the topic if none.
    ///
    /// # Errors
    ///
    /// Returns provider errors that survived retries.
    pub async fn formulate_title(&self, topic: &str) -> Result<String, AgentError> {
        let prompt = format!(
            "Generate 3 formal academic titles for this research topic.\n\n\
             Topic: \"{topic}\"\n\n\
             Each title should follow academic conventions, be specific and descriptive, \
             include the key concepts, consider a subtitle with methodology or scope \
             (\"Main Title: Subtitle\"), and be 10-20 words long.\n\n\
             Respond with JSON: {{\"titles\": [\"...\", \"...\", \"...\"]}}"
        );
        let titles: Vec<String> = self
            .call_structured::<TitleReport, _>(StageKind::Title, &prompt, "titles")
            .await?;
        let title = titles
            .into_iter()
            .map(|t| t.trim().to_string())
            .find(|t| !t.is_empty())
            .unwrap_or_else(|| topic.to_string());
        info!(title = %title, "Title formulated");
        Ok(title)
    }

    /// Generates search queries; the topic itself is always the first.
    ///
    /// # Errors
    ///
    /// Returns provider errors that survived retries.
    pub async fn search_queries(&self, topic: &str) -> Result<Vec<String>, AgentError> {
        let prompt = format!(
            "Generate {MAX_SEARCH_QUERIES} different search queries for finding academic \
             sources on this topic.\n\n\
             Topic: \"{topic}\"\n\n\
             Use different phrasings and synonyms, target different aspects of the topic, \
             and include academic keywords that work for both academic databases and web \
             search.\n\n\
             Respond with JSON: {{\"queries\": [\"...\"]}}"
        );
        let generated: Vec<String> = self
            .call_structured::<QueryReport, _>(StageKind::SearchQueries, &prompt, "queries")
            .await?;

        let mut queries = vec![topic.trim().to_string()];
        for q in generated {
            let q = q.trim().to_string();
            if !q.is_empty() && !queries.contains(&q) {
                queries.push(q);
            }
        }
        queries.truncate(MAX_SEARCH_QUERIES);
        debug!(queries = ?queries, "Search queries generated");
        Ok(queries)
    }

    /// Asks for alternative queries when discovery found too few sources.
    ///
    /// Returns at most three queries, none repeating one already run.
    ///
    /// # Errors
    ///
    /// Returns provider errors that survived retries.
    pub async fn expansion_queries(
        &self,
        topic: &str,
        existing: &[Source],
        already_run: &[String],
    ) -> Result<Vec<String>, AgentError> {
        let titles: String = existing
            .iter()
            .take(EXPANSION_TITLE_LIMIT)
            .map(|s| format!("- {}\n", s.title))
            .collect();
        let prompt = format!(
            "Based on this research topic and the sources found so far, suggest \
             {MAX_EXPANSION_QUERIES} alternative search queries to find more sources.\n\n\
             Topic: \"{topic}\"\n\n\
             Existing source titles:\n{titles}\n\
             Suggest queries that explore related but different angles, use different \
             terminology, and target gaps in the current sources.\n\n\
             Respond with JSON: {{\"queries\": [\"...\"]}}",
            titles = if titles.is_empty() { "- none\n".to_string() } else { titles },
        );
        let generated: Vec<String> = self
            .call_structured::<QueryReport, _>(StageKind::SearchQueries, &prompt, "queries")
            .await?;

        let mut queries: Vec<String> = Vec::new();
        for q in generated {
            let q = q.trim().to_string();
            if !q.is_empty() && !already_run.contains(&q) && !queries.contains(&q) {
                queries.push(q);
            }
        }
        queries.truncate(MAX_EXPANSION_QUERIES);
        debug!(queries = ?queries, "Expansion queries generated");
        Ok(queries)
    }

    /// Text a source can be summarized from: its abstract, or else its
    /// fetched page when a fetcher is configured.
    pub async fn source_text(&self, source: &Source) -> Option<String> {
        let abstract_text = source.abstract_text.trim();
        if !abstract_text.is_empty() {
            return Some(abstract_text.to_string());
        }
        let fetcher = self.fetcher.as_ref()?;
        if source.url.trim().is_empty() {
            return None;
        }
        match fetcher.fetch_text(&source.url).await {
            Ok(text) if !text.is_empty() => Some(text),
            Ok(_) => {
                debug!(url = %source.url, "Fetched page has no text");
                None
            }
            Err(e) => {
                debug!(url = %source.url, error = %e, "Could not fetch source page");
                None
            }
        }
    }

    /// Summarizes one source in the context of the topic.
    ///
    /// Sources with neither an abstract nor a readable page are marked
    /// inaccessible and get a metadata-only summary without a model call.
    ///
    /// # Errors
    ///
    /// Returns provider errors that survived retries.
    pub async fn summarize_source(&self, source: &Source, topic: &str) -> Result<SourceSummary, AgentError> {
        let Some(content) = self.source_text(source).await else {
            return Ok(SourceSummary {
                text: metadata_summary(source),
                accessible: false,
            });
        };
        let prompt = format!(
            "Summarize this academic source.\n\n\
             Research Topic Context: {topic}\n\
             Source Title: {title}\n\
             Authors: {authors}\n\
             Year: {year}\n\n\
             Content:\n{content}\n\n\
             Cover the main thesis or research question, methodology, key findings, \
             supporting evidence, acknowledged limitations, and relevance to the research \
             topic. Write in objective academic prose.",
            title = source.title,
            authors = if source.authors.is_empty() {
                "Unknown".to_string()
            } else {
                source.authors.join(", ")
            },
            year = source.year.map_or_else(|| "Unknown".to_string(), |y| y.to_string()),
            content = truncate_chars(&content, SUMMARY_CONTENT_LIMIT),
        );
        let summary = self.call(StageKind::Summary, &prompt, None, None).await?;
        Ok(SourceSummary {
            text: summary.trim().to_string(),
            accessible: true,
        })
    }

    /// Summarizes every source, up to `review_concurrency` at a time.
    ///
    /// Returns the number of sources summarized from their text.
    ///
    /// # Errors
    ///
    /// Returns the first provider error that survived retries.
    pub async fn summarize_all(&self, sources: &mut [Source], topic: &str) -> Result<usize, AgentError> {
        let results: Vec<Result<SourceSummary, AgentError>> = stream::iter(
            sources
                .iter()
                .map(|source| async move { self.summarize_source(source, topic).await }),
        )
        .buffered(self.config.review_concurrency.max(1))
        .collect()
        .await;

        let mut accessible = 0;
        for (source, result) in sources.iter_mut().zip(results) {
            let summary = result?;
            source.summary = summary.text;
            source.accessible = summary.accessible;
            if source.accessible {
                accessible += 1;
            }
        }
        info!(
            total = sources.len(),
            accessible,
            inaccessible = sources.len() - accessible,
            "Sources summarized"
        );
        Ok(accessible)
    }

    /// Plans the paper: themes, gaps, and per-section targets and key points.
    ///
    /// # Errors
    ///
    /// Returns provider errors that survived retries.
    pub async fn plan_outline(
        &self,
        sources: &[Source],
        topic: &str,
        title: &str,
        word_count: usize,
    ) -> Result<Outline, AgentError> {
        let mut digest = String::new();
        for s in sources.iter().filter(|s| !s.summary.is_empty()) {
            let year = s.year.map_or_else(|| "n.d.".to_string(), |y| y.to_string());
            let _ = write!(
                digest,
                "**{}** ({year})\n{}...\n\n",
                s.title,
                truncate_chars(&s.summary, 500)
            );
        }
        let digest = truncate_chars(&digest, PLANNER_CONTEXT_LIMIT);

        let themes: Vec<Theme> = self
            .call_structured::<ThemeReport, _>(
                StageKind::Outline,
                &format!(
                    "Analyze these source summaries and identify 5-7 major themes that emerge \
                     across the literature.\n\n{digest}\n\n\
                     For each theme give a name, a brief description, 2-3 source titles that \
                     address it, and why it is significant.\n\n\
                     Respond with JSON: {{\"themes\": [{{\"name\": \"...\", \"description\": \
                     \"...\", \"sources\": [\"...\"], \"significance\": \"...\"}}]}}"
                ),
                "themes",
            )
            .await?;

        let gaps: Vec<ResearchGap> = self
            .call_structured::<GapReport, _>(
                StageKind::Outline,
                &format!(
                    "Analyze these sources on \"{topic}\" and identify 3-5 significant \
                     research gaps.\n\n{digest}\n\n\
                     For each gap give a short name, what existing research covers, what is \
                     not adequately addressed, and how new research could fill it. Focus on \
                     genuine opportunities for contribution.\n\n\
                     Respond with JSON: {{\"gaps\": [{{\"name\": \"...\", \"current_state\": \
                     \"...\", \"missing\": \"...\", \"opportunity\": \"...\"}}]}}"
                ),
                "gaps",
            )
            .await?;

        let targets = section_targets(word_count);
        let mut outline = Outline {
            themes,
            gaps,
            sections: targets
                .iter()
                .map(|(&kind, &target_words)| OutlineSection {
                    kind,
                    target_words,
                    key_points: Vec::new(),
                })
                .collect(),
        };

        let mut plan_prompt = format!(
            "Create a detailed paper outline for this research.\n\n\
             Title: {title}\nTopic: {topic}\nTarget Words: {word_count}\n\n\
             Identified Themes: {themes}\nIdentified Gaps: {gaps}\n\n\
             List the key points to cover in each section:\n",
            themes = outline.theme_names(),
            gaps = outline.gap_names(),
        );
        for section in outline.sections.iter().filter(|s| s.target_words > 0) {
            let _ = writeln!(
                plan_prompt,
                "- {} ({}, about {} words)",
                section.kind.title(),
                section.kind.as_str(),
                section.target_words
            );
        }
        plan_prompt.push_str(
            "\nRespond with JSON: {\"sections\": [{\"section\": \"<section id>\", \
             \"key_points\": [\"...\"]}]}",
        );

        let plans: Vec<SectionPlan> = self
            .call_structured::<OutlinePlan, _>(StageKind::Outline, &plan_prompt, "sections")
            .await?;
        for plan in plans {
            let Some(kind) = SectionKind::parse(&plan.section) else {
                debug!(section = %plan.section, "Ignoring plan for unknown section");
                continue;
            };
            if let Some(entry) = outline.sections.iter_mut().find(|s| s.kind == kind) {
                entry.key_points = plan.key_points;
            }
        }

        info!(
            themes = outline.themes.len(),
            gaps = outline.gaps.len(),
            "Outline planned"
        );
        Ok(outline)
    }

    /// Writes one body section from the outline and sources, citing them
    /// with the markers `citations` assigns.
    ///
    /// # Errors
    ///
    /// Returns provider errors that survived retries.
    pub async fn write_body_section(
        &self,
        kind: SectionKind,
        outline: &Outline,
        sources: &[Source],
        citations: &mut CitationContext,
    ) -> Result<String, AgentError> {
        let target = outline
            .section(kind)
            .map_or_else(|| section_targets(NOMINAL_WORD_COUNT).get(&kind).copied().unwrap_or(0), |s| s.target_words);
        let key_points = outline
            .section(kind)
            .map(|s| s.key_points.join("\n- "))
            .filter(|s| !s.is_empty())
            .map_or_else(String::new, |s| format!("Key Points:\n- {s}\n\n"));

        let prompt = format!(
            "Write the {title} section of an academic research paper.\n\n\
             Target Length: {target} words\n\
             Research Themes: {themes}\n\
             Research Gaps: {gaps}\n\n\
             {key_points}\
             Available Sources:\n{sources}\n\
             Requirements:\n{brief}\n\
             {cite} Write in active voice.",
            title = kind.title(),
            themes = outline.theme_names(),
            gaps = outline.gap_names(),
            sources = format_sources(sources, SOURCES_PER_SECTION, citations),
            brief = section_brief(kind),
            cite = citations.instruction(),
        );
        let budget = u32::try_from(target.saturating_mul(2))
            .unwrap_or(u32::MAX)
            .min(self.config.writer_max_tokens);
        let content = self
            .call(StageKind::Section, &prompt, Some(budget.max(256)), None)
            .await?;
        Ok(content.trim().to_string())
    }

    /// Writes every body section into a new draft.
    ///
    /// # Errors
    ///
    /// Returns provider errors that survived retries.
    pub async fn write_body(
        &self,
        draft: &mut Draft,
        outline: &Outline,
        sources: &[Source],
        citations: &mut CitationContext,
    ) -> Result<(), AgentError> {
        for kind in SectionKind::BODY {
            let content = self.write_body_section(kind, outline, sources, citations).await?;
            if content.is_empty() {
                warn!(section = kind.as_str(), "Writer returned empty section");
                continue;
            }
            draft.set_section(kind, content);
            info!(
                section = kind.as_str(),
                words = draft.section_word_count(kind),
                "Section written"
            );
        }
        info!(words = draft.word_count(), "Body written");
        Ok(())
    }

    /// Writes the introduction, then the conclusion, then the abstract.
    ///
    /// # Errors
    ///
    /// Returns provider errors that survived retries.
    pub async fn write_framing(
        &self,
        draft: &mut Draft,
        title: &str,
        topic: &str,
        citations: &CitationContext,
    ) -> Result<(), AgentError> {
        let introduction = self.write_introduction(draft, title, topic, citations).await?;
        set_if_present(draft, SectionKind::Introduction, introduction);
        let conclusion = self.write_conclusion(draft).await?;
        set_if_present(draft, SectionKind::Conclusion, conclusion);
        let abstract_text = self.write_abstract(draft, title).await?;
        set_if_present(draft, SectionKind::Abstract, abstract_text);
        info!(words = draft.word_count(), "Introduction, conclusion and abstract written");
        Ok(())
    }

    /// Writes an introduction from a preview of the body.
    ///
    /// # Errors
    ///
    /// Returns provider errors that survived retries.
    pub async fn write_introduction(
        &self,
        draft: &Draft,
        title: &str,
        topic: &str,
        citations: &CitationContext,
    ) -> Result<String, AgentError> {
        let mut preview = String::new();
        for kind in SectionKind::BODY {
            if let Some(text) = draft.section(kind).filter(|t| !t.is_empty()) {
                let _ = write!(preview, "{}:\n{}...\n\n", kind.title(), truncate_chars(text, 500));
            }
        }
        let prompt = format!(
            "Write a compelling Introduction for this research paper.\n\n\
             Title: {title}\nTopic: {topic}\n\n\
             Paper Body Preview:\n{preview}\n\
             Target Length: 1500-2000 words\n\n\
             Open with context, narrow to the research problem, state the gap this paper \
             addresses, present the research questions, briefly describe the methodology, \
             and outline the paper's structure. Use active voice. {cite}",
            cite = citations.instruction(),
        );
        let content = self.call(StageKind::Section, &prompt, Some(3000), None).await?;
        Ok(content.trim().to_string())
    }

    /// Writes a conclusion from the introduction, analysis and discussion.
    ///
    /// # Errors
    ///
    /// Returns provider errors that survived retries.
    pub async fn write_conclusion(&self, draft: &Draft) -> Result<String, AgentError> {
        let excerpt = |kind, limit| truncate_chars(draft.section(kind).unwrap_or_default(), limit);
        let prompt = format!(
            "Write a comprehensive Conclusion for this research paper.\n\n\
             Introduction Preview:\n{intro}\n\n\
             Analysis Summary:\n{analysis}\n\n\
             Discussion Summary:\n{discussion}\n\n\
             Target Length: 1000-1500 words\n\n\
             Summarize the key findings without introducing new information, answer the \
             research questions posed in the introduction, discuss theoretical contributions \
             and practical implications, acknowledge limitations, suggest future research, \
             and close with a strong statement.",
            intro = excerpt(SectionKind::Introduction, 1000),
            analysis = excerpt(SectionKind::Analysis, 2000),
            discussion = excerpt(SectionKind::Discussion, 2000),
        );
        let content = self.call(StageKind::Section, &prompt, Some(2500), None).await?;
        Ok(content.trim().to_string())
    }

    /// Writes the abstract from every other section.
    ///
    /// # Errors
    ///
    /// Returns provider errors that survived retries.
    pub async fn write_abstract(&self, draft: &Draft, title: &str) -> Result<String, AgentError> {
        let excerpt = |kind| truncate_chars(draft.section(kind).unwrap_or_default(), 500);
        let prompt = format!(
            "Write an Abstract for this research paper.\n\n\
             Title: {title}\n\n\
             Introduction Summary:\n{intro}\n\n\
             Methodology Summary:\n{method}\n\n\
             Findings Summary:\n{analysis}\n\n\
             Conclusion Summary:\n{conclusion}\n\n\
             Target Length: 250-300 words. Cover context, purpose, methodology, key findings \
             and implications. Do not include citations or use the first person. End with a \
             line \"Keywords: \" followed by 4-6 keywords.",
            intro = excerpt(SectionKind::Introduction),
            method = excerpt(SectionKind::Methodology),
            analysis = excerpt(SectionKind::Analysis),
            conclusion = excerpt(SectionKind::Conclusion),
        );
        let content = self.call(StageKind::Abstract, &prompt, None, None).await?;
        Ok(content.trim().to_string())
    }

    /// Checks section structure and citation format against `style`.
    ///
    /// An unreadable answer yields an unapproved review with no notes.
    ///
    /// # Errors
    ///
    /// Returns provider errors that survived retries.
    pub async fn format_review(&self, draft: &Draft, style: CitationStyle) -> Result<FormatReview, AgentError> {
        let expected: Vec<&str> = SectionKind::ALL.iter().map(SectionKind::title).collect();
        let prompt = format!(
            "Check the formatting and structure of this research paper.\n\n\
             Citation Style Required: {style}\n\
             Expected Sections: {expected}\n\n\
             Paper Content (first {content_limit} characters):\n{content}\n\n\
             References (first {references_limit} characters):\n{references}\n\n\
             Check for:\n\
             1. Proper section structure and order\n\
             2. Citation format consistency, in-text and in the references\n\
             3. Academic writing conventions\n\
             4. Formatting consistency\n\n\
             Respond with JSON: {{\"approved\": bool, \"summary\": \"...\", \
             \"format_issues\": [\"...\"], \"structure_issues\": [\"...\"], \
             \"citation_issues\": [\"...\"], \"recommendations\": [\"...\"]}}\n\
             Set approved to true only if the paper passes as it stands.",
            expected = expected.join(", "),
            content_limit = FORMAT_REVIEW_CONTENT_LIMIT,
            content = truncate_chars(&draft.full_text(), FORMAT_REVIEW_CONTENT_LIMIT),
            references_limit = FORMAT_REVIEW_REFERENCES_LIMIT,
            references = truncate_chars(
                draft.section(SectionKind::References).unwrap_or("(none)"),
                FORMAT_REVIEW_REFERENCES_LIMIT
            ),
        );
        let schema = ResponseSchema::for_type::<FormatReview>("format_review");
        let content = self
            .call(StageKind::FormatReview, &prompt, None, Some(schema))
            .await?;
        let mut review = parse_structured::<FormatReview>(&content, None).unwrap_or_else(|e| {
            warn!(error = %e, "Unreadable format review, recording it as not approved");
            FormatReview::default()
        });
        for notes in [
            &mut review.format_issues,
            &mut review.structure_issues,
            &mut review.citation_issues,
            &mut review.recommendations,
        ] {
            notes.retain(|n| !n.trim().is_empty());
        }
        info!(
            approved = review.approved,
            notes = review.notes(),
            style = %style,
            "Format review complete"
        );
        Ok(review)
    }
}

impl std::fmt::Debug for Stages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stages")
            .field("provider", &self.provider.name())
            .field("config", &self.config)
            .field("fetch_pages", &self.fetcher.is_some())
            .finish_non_exhaustive()
    }
}

fn set_if_present(draft: &mut Draft, kind: SectionKind, content: String) {
    if content.is_empty() {
        warn!(section = kind.as_str(), "Writer returned empty section");
    } else {
        draft.set_section(kind, content);
    }
}

fn section_brief(kind: SectionKind) -> &'static str {
    match kind {
        SectionKind::LiteratureReview => {
            "1. Organize the review thematically, not chronologically\n\
             2. Synthesize sources rather than summarizing each separately\n\
             3. Identify patterns, agreements and disagreements\n\
             4. Build toward the research gaps that justify this study\n\
             5. End with a transition to the theoretical framework"
        }
        SectionKind::TheoreticalFramework => {
            "1. Identify and explain the main theories guiding this research\n\
             2. Show how the theories relate to the research questions\n\
             3. Justify the theoretical choices with citations\n\
             4. Present a conceptual model if appropriate\n\
             5. Connect theory to methodology"
        }
        SectionKind::Methodology => {
            "1. Describe the research design and approach\n\
             2. Justify the methodological choices with citations\n\
             3. Explain data sources, collection and analysis procedures\n\
             4. Address validity, reliability and ethical considerations\n\
             5. Acknowledge methodological limitations"
        }
        SectionKind::Analysis => {
            "1. Present the findings systematically, organized by theme or research question\n\
             2. Support each finding with evidence from the sources\n\
             3. Compare findings with prior literature\n\
             4. Use clear subsections\n\
             5. Avoid interpretation beyond what the evidence supports"
        }
        SectionKind::Discussion => {
            "1. Interpret the findings in light of the research questions\n\
             2. Relate them to the theoretical framework and literature\n\
             3. Discuss theoretical and practical implications\n\
             4. Address limitations honestly\n\
             5. Suggest directions for future research"
        }
        _ => "Write clear, well-structured academic prose with a logical flow of arguments.",
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::mock::{ScriptedProvider, user_text};
    use uuid::Uuid;

    fn stages(provider: Arc<ScriptedProvider>) -> Stages {
        let config = AgentConfig::builder()
            .api_key("test")
            .build()
            .unwrap_or_else(|_| unreachable!());
        Stages::new(provider, config, PromptSet::defaults())
    }

    #[test]
    fn test_section_targets_nominal_and_scaled() {
        let nominal = section_targets(18_000);
        assert_eq!(nominal[&SectionKind::Introduction], 1750);
        assert_eq!(nominal[&SectionKind::Analysis], 4500);
        assert_eq!(nominal[&SectionKind::Abstract], 300);
        assert_eq!(nominal[&SectionKind::References], 0);
        assert_eq!(nominal.len(), SectionKind::ALL.len());

        let half = section_targets(9_000);
        assert_eq!(half[&SectionKind::LiteratureReview], 2250);
        assert_eq!(half[&SectionKind::Abstract], 300);
    }

    #[test]
    fn test_metadata_summary() {
        let mut source = Source::new("Quiet Paper", "https://example.org/q");
        source.authors = vec!["Ada".to_string(), "Alan".to_string()];
        let summary = metadata_summary(&source);
        assert!(summary.starts_with("[Source inaccessible"));
        assert!(summary.contains("Authors: Ada, Alan"));
        assert!(summary.contains("Year: n.d."));
    }

    #[tokio::test]
    async fn test_topic_analysis_parses_questions() {
        let provider = Arc::new(ScriptedProvider::constant(
            r#"{"needs_clarification": true, "assessment": "too broad", "questions": ["Which population?", " ", "Which period?"]}"#,
        ));
        let analysis = stages(provider)
            .analyze_topic("AI in healthcare")
            .await
            .unwrap_or_else(|_| unreachable!());
        assert!(analysis.needs_clarification);
        assert_eq!(analysis.questions.len(), 2);
    }

    #[tokio::test]
    async fn test_topic_analysis_fails_closed() {
        let provider = Arc::new(ScriptedProvider::constant("NEEDS_CLARIFICATION\nQ1: what?"));
        let analysis = stages(provider)
            .analyze_topic("AI")
            .await
            .unwrap_or_else(|_| unreachable!());
        assert!(!analysis.needs_clarification);
    }

    #[tokio::test]
    async fn test_title_falls_back_to_topic() {
        let provider = Arc::new(ScriptedProvider::constant(r#"{"titles": []}"#));
        let title = stages(provider)
            .formulate_title("Soil carbon")
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(title, "Soil carbon");

        let provider = Arc::new(ScriptedProvider::constant(
            r#"{"titles": ["Soil Carbon Dynamics: A Review", "Other"]}"#,
        ));
        let title = stages(provider)
            .formulate_title("Soil carbon")
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(title, "Soil Carbon Dynamics: A Review");
    }

    #[tokio::test]
    async fn test_queries_start_with_topic_and_cap() {
        let provider = Arc::new(ScriptedProvider::constant(
            r#"{"queries": ["a", "soil carbon", "b", "c", "d", "e"]}"#,
        ));
        let queries = stages(provider)
            .search_queries("soil carbon")
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(queries, vec!["soil carbon", "a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_expansion_queries_skip_known_and_cap() {
        let provider = Arc::new(ScriptedProvider::constant(
            r#"{"queries": ["soil carbon", "carbon farming", " ", "carbon farming", "no-till", "biochar", "extra"]}"#,
        ));
        let stages = stages(Arc::clone(&provider));
        let existing = vec![Source::new("Soil Carbon Dynamics", "https://a.org")];
        let queries = stages
            .expansion_queries("soil carbon", &existing, &["soil carbon".to_string()])
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(queries, vec!["carbon farming", "no-till", "biochar"]);
        assert!(provider.prompts()[0].contains("- Soil Carbon Dynamics"));
    }

    #[tokio::test]
    async fn test_format_review_parses_notes() {
        let provider = Arc::new(ScriptedProvider::constant(
            r#"{"approved": false, "summary": "Mixed markers", "citation_issues": ["(Smith, 2020) used with IEEE", " "], "recommendations": ["Use [n] markers"]}"#,
        ));
        let runner = stages(Arc::clone(&provider));
        let mut draft = Draft::new(Uuid::new_v4());
        draft.set_section(SectionKind::Introduction, "As shown (Smith, 2020).");
        draft.set_section(SectionKind::References, "[1] J. Smith, *Soil*, 2020.");

        let review = runner
            .format_review(&draft, CitationStyle::Ieee)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert!(!review.approved);
        assert_eq!(review.citation_issues, vec!["(Smith, 2020) used with IEEE"]);
        assert_eq!(review.notes(), 2);
        let prompt = &provider.prompts()[0];
        assert!(prompt.contains("Citation Style Required: IEEE"));
        assert!(prompt.contains("[1] J. Smith"));

        let provider = Arc::new(ScriptedProvider::constant("APPROVED: looks fine"));
        let review = stages(provider)
            .format_review(&draft, CitationStyle::Apa)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(review, FormatReview::default());
    }

    #[tokio::test]
    async fn test_summarize_all_skips_inaccessible() {
        let provider = Arc::new(ScriptedProvider::constant("A careful summary."));
        let stages = stages(Arc::clone(&provider));
        let mut readable = Source::new("Readable", "https://a.org");
        readable.abstract_text = "We study things.".to_string();
        let hidden = Source::new("Hidden", "https://b.org");
        let mut sources = vec![readable, hidden];

        let accessible = stages
            .summarize_all(&mut sources, "things")
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(accessible, 1);
        assert_eq!(provider.calls(), 1);
        assert_eq!(sources[0].summary, "A careful summary.");
        assert!(!sources[1].accessible);
        assert!(sources[1].summary.contains("only metadata"));
    }

    #[tokio::test]
    async fn test_summarize_fetches_page_without_abstract() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/report"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><script>track()</script><body><p>Tillage lowers soil carbon.</p></body></html>",
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let provider = Arc::new(ScriptedProvider::constant("Page summary."));
        let stages = stages(Arc::clone(&provider)).with_fetcher(PageFetcher::new());
        let mut sources = vec![
            Source::new("Field Report", format!("{}/report", server.uri())),
            Source::new("Dead Link", format!("{}/gone", server.uri())),
        ];

        let accessible = stages
            .summarize_all(&mut sources, "soil carbon")
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(accessible, 1);
        assert_eq!(provider.calls(), 1);
        assert_eq!(sources[0].summary, "Page summary.");
        assert!(sources[0].accessible);
        let prompts = provider.prompts();
        assert!(prompts[0].contains("Content:\nTillage lowers soil carbon."));
        assert!(!prompts[0].contains("track()"));
        assert!(!sources[1].accessible);
        assert!(sources[1].summary.starts_with("[Source inaccessible"));
    }

    #[tokio::test]
    async fn test_outline_merges_key_points() {
        let provider = Arc::new(ScriptedProvider::new(|req| {
            let text = user_text(req);
            if text.contains("major themes") {
                Ok(r#"{"themes": [{"name": "Measurement", "description": "d", "sources": [], "significance": "s"}]}"#.to_string())
            } else if text.contains("research gaps") {
                Ok(r#"{"gaps": [{"name": "Long-term data", "missing": "m"}]}"#.to_string())
            } else {
                Ok(r#"{"sections": [{"section": "methodology", "key_points": ["sampling"]}, {"section": "nonsense", "key_points": ["x"]}]}"#.to_string())
            }
        }));
        let outline = stages(provider)
            .plan_outline(&[], "soil", "Soil", 18_000)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(outline.themes[0].name, "Measurement");
        assert_eq!(outline.gaps[0].name, "Long-term data");
        let method = outline
            .section(SectionKind::Methodology)
            .unwrap_or_else(|| unreachable!());
        assert_eq!(method.key_points, vec!["sampling"]);
        assert_eq!(method.target_words, 2250);
    }

    #[tokio::test]
    async fn test_body_and_framing_fill_draft() {
        let provider = Arc::new(ScriptedProvider::new(|req| {
            let text = user_text(req);
            if text.starts_with("Write an Abstract") {
                Ok("Short abstract.".to_string())
            } else {
                Ok("Some written prose here.".to_string())
            }
        }));
        let stages = stages(Arc::clone(&provider));
        let outline = Outline {
            sections: section_targets(6000)
                .into_iter()
                .map(|(kind, target_words)| OutlineSection {
                    kind,
                    target_words,
                    key_points: Vec::new(),
                })
                .collect(),
            ..Outline::default()
        };
        let mut draft = Draft::new(Uuid::new_v4());
        let mut citations = CitationContext::new(CitationStyle::Apa);
        stages
            .write_body(&mut draft, &outline, &[], &mut citations)
            .await
            .unwrap_or_else(|_| unreachable!());
        stages
            .write_framing(&mut draft, "Title", "topic", &citations)
            .await
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(provider.calls(), 8);
        assert_eq!(draft.section(SectionKind::Abstract), Some("Short abstract."));
        assert_eq!(draft.populated_sections().count(), 8);
        assert_eq!(draft.word_count(), 7 * 4 + 2);
        assert!(stages.usage().total_tokens > 0);
    }

    #[tokio::test]
    async fn test_body_prompts_use_numbered_markers_for_ieee() {
        let provider = Arc::new(ScriptedProvider::constant("Prose citing [1]."));
        let stages = stages(Arc::clone(&provider));
        let mut smith = Source::new("Soil Carbon Dynamics", "https://a.org");
        smith.authors = vec!["Jane Smith".to_string()];
        smith.year = Some(2022);
        let mut draft = Draft::new(Uuid::new_v4());
        let mut citations = CitationContext::new(CitationStyle::Ieee);

        stages
            .write_body(&mut draft, &Outline::default(), std::slice::from_ref(&smith), &mut citations)
            .await
            .unwrap_or_else(|_| unreachable!());

        let prompts = provider.prompts();
        assert_eq!(prompts.len(), SectionKind::BODY.len());
        for prompt in &prompts {
            assert!(prompt.contains("Cite as: [1]"));
            assert!(prompt.contains("IEEE style"));
            assert!(!prompt.contains("(Author, Year)"));
        }
        assert!(citations.bibliography(&[smith]).starts_with("[1] J. Smith"));
    }
}

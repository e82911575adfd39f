//! Editor agent.
//!
//! Applies review feedback by rewriting whole sections. Unresolved issues
//! are grouped by section (first-seen order) and sorted critical, major,
//! minor within each group; each group becomes one combined rewrite.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, info, warn};

use super::config::AgentConfig;
use super::message::{TokenUsage, UsageMeter};
use super::prompt::build_section_edit_prompt;
use super::provider::LlmProvider;
use super::review_loop::EditStage;
use super::traits::{Agent, send};
use crate::core::{Draft, Feedback, Issue, SectionKind, SectionRef, count_words};
use crate::error::AgentError;

/// Smallest token budget given to a rewrite.
pub const MIN_EDIT_TOKENS: u32 = 1024;

/// Why a section was left as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The issue points outside the known section kinds.
    UnknownSection,
    /// The draft has no text for the section.
    EmptySection,
    /// The model returned nothing usable.
    EmptyRewrite,
}

impl SkipReason {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownSection => "unknown_section",
            Self::EmptySection => "empty_section",
            Self::EmptyRewrite => "empty_rewrite",
        }
    }
}

/// Result of one section rewrite attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EditOutcome {
    /// The section text was replaced.
    Rewritten {
        /// Section rewritten.
        section: SectionKind,
        /// Issues addressed by the rewrite.
        issues: usize,
        /// Word count of the new text.
        words: usize,
    },
    /// Nothing was changed.
    Skipped {
        /// Section the issues pointed at.
        section: SectionRef,
        /// Why.
        reason: SkipReason,
    },
}

impl EditOutcome {
    /// Whether the section text changed.
    #[must_use]
    pub const fn is_rewritten(&self) -> bool {
        matches!(self, Self::Rewritten { .. })
    }
}

/// Summary of one [`EditorAgent::apply_all_fixes`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EditReport {
    /// One entry per section group, in first-seen order.
    pub outcomes: Vec<EditOutcome>,
    /// Issues marked resolved by this pass.
    pub issues_fixed: usize,
    /// Draft version after the pass.
    pub version: u32,
}

impl EditReport {
    /// Sections whose text changed.
    #[must_use]
    pub fn sections_edited(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_rewritten()).count()
    }
}

/// Groups unresolved issue indices by section, preserving first-seen
/// section order, each group sorted by severity (stable).
#[must_use]
pub fn group_unresolved(issues: &[Issue]) -> Vec<(SectionRef, Vec<usize>)> {
    let mut groups: Vec<(SectionRef, Vec<usize>)> = Vec::new();
    for (idx, issue) in issues.iter().enumerate().filter(|(_, i)| !i.resolved) {
        match groups.iter_mut().find(|(s, _)| *s == issue.location.section) {
            Some((_, members)) => members.push(idx),
            None => groups.push((issue.location.section.clone(), vec![idx])),
        }
    }
    for (_, members) in &mut groups {
        members.sort_by_key(|&i| issues[i].severity);
    }
    groups
}

/// Agent that rewrites sections to address review issues.
pub struct EditorAgent {
    provider: Arc<dyn LlmProvider>,
    model: String,
    max_tokens: u32,
    system_prompt: String,
    usage: UsageMeter,
}

impl EditorAgent {
    /// Creates an editor with the given configuration and system prompt.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            provider,
            model: config.editor_model.clone(),
            max_tokens: config.editor_max_tokens,
            system_prompt,
            usage: UsageMeter::default(),
        }
    }

    /// Tokens used by every call this editor has made.
    #[must_use]
    pub fn usage(&self) -> TokenUsage {
        self.usage.snapshot()
    }

    /// Token budget for rewriting a section of `words` words.
    #[must_use]
    pub fn rewrite_budget(&self, words: usize) -> u32 {
        let wanted = u32::try_from(words.saturating_mul(2)).unwrap_or(u32::MAX);
        wanted.max(MIN_EDIT_TOKENS).min(self.max_tokens)
    }

    /// Rewrites every section that has unresolved issues.
    ///
    /// Issues passed into a successful rewrite are marked resolved. Sections
    /// that cannot be edited are skipped without aborting the pass. The
    /// draft version is incremented exactly once per call.
    ///
    /// # Errors
    ///
    /// Returns provider errors that survived retries.
    pub async fn apply_all_fixes(
        &self,
        draft: &mut Draft,
        feedback: &mut Feedback,
    ) -> Result<EditReport, AgentError> {
        let groups = group_unresolved(&feedback.issues);
        info!(
            cycle = feedback.cycle,
            unresolved = groups.iter().map(|(_, m)| m.len()).sum::<usize>(),
            sections = groups.len(),
            "Applying fixes"
        );

        let mut report = EditReport::default();
        for (section, members) in groups {
            let outcome = match section.kind() {
                Some(kind) => {
                    let issues: Vec<&Issue> = members.iter().map(|&i| &feedback.issues[i]).collect();
                    self.rewrite_section(draft, kind, &issues).await?
                }
                None => {
                    error!(section = %section, issues = members.len(), "Unknown section, skipping");
                    EditOutcome::Skipped {
                        section,
                        reason: SkipReason::UnknownSection,
                    }
                }
            };
            if outcome.is_rewritten() {
                for &i in &members {
                    feedback.issues[i].resolved = true;
                }
                report.issues_fixed += members.len();
            }
            report.outcomes.push(outcome);
        }

        draft.bump_version();
        report.version = draft.version;
        info!(
            version = draft.version,
            sections_edited = report.sections_edited(),
            issues_fixed = report.issues_fixed,
            "Fixes applied"
        );
        Ok(report)
    }

    /// Rewrites one section to address the given issues.
    ///
    /// Issues are presented critical first; all are marked resolved when the
    /// rewrite lands. Does not change the draft version.
    ///
    /// # Errors
    ///
    /// Returns provider errors that survived retries.
    pub async fn edit_section(
        &self,
        draft: &mut Draft,
        kind: SectionKind,
        issues: &mut [Issue],
    ) -> Result<EditOutcome, AgentError> {
        let mut order: Vec<usize> = (0..issues.len()).filter(|&i| !issues[i].resolved).collect();
        order.sort_by_key(|&i| issues[i].severity);
        let refs: Vec<&Issue> = order.iter().map(|&i| &issues[i]).collect();

        let outcome = self.rewrite_section(draft, kind, &refs).await?;
        if outcome.is_rewritten() {
            for &i in &order {
                issues[i].resolved = true;
            }
        }
        Ok(outcome)
    }

    /// Rewrites the section an issue points at to address that issue alone.
    ///
    /// # Errors
    ///
    /// Returns provider errors that survived retries.
    pub async fn edit_issue(
        &self,
        draft: &mut Draft,
        issue: &mut Issue,
    ) -> Result<EditOutcome, AgentError> {
        let Some(kind) = issue.location.section.kind() else {
            warn!(section = %issue.location.section, "Issue has no editable section");
            return Ok(EditOutcome::Skipped {
                section: issue.location.section.clone(),
                reason: SkipReason::UnknownSection,
            });
        };
        let outcome = self.rewrite_section(draft, kind, &[&*issue]).await?;
        if outcome.is_rewritten() {
            issue.resolved = true;
        }
        Ok(outcome)
    }

    async fn rewrite_section(
        &self,
        draft: &mut Draft,
        kind: SectionKind,
        issues: &[&Issue],
    ) -> Result<EditOutcome, AgentError> {
        let skipped = |reason| EditOutcome::Skipped {
            section: SectionRef::Known(kind),
            reason,
        };

        let content = draft.section(kind).unwrap_or_default();
        if content.trim().is_empty() {
            warn!(section = kind.as_str(), "Section is empty, nothing to edit");
            return Ok(skipped(SkipReason::EmptySection));
        }

        let mut request = self.request(&build_section_edit_prompt(kind, content, issues));
        request.max_tokens = Some(self.rewrite_budget(count_words(content)));
        let response = send(&*self.provider, &request).await?;
        self.usage.record(response.usage);

        if response.truncated() {
            warn!(section = kind.as_str(), "Rewrite hit the token budget");
        }
        let rewritten = response.content.trim();
        if rewritten.is_empty() {
            warn!(section = kind.as_str(), "Empty rewrite, keeping current text");
            return Ok(skipped(SkipReason::EmptyRewrite));
        }

        draft.set_section(kind, rewritten);
        let words = draft.section_word_count(kind);
        info!(section = kind.as_str(), issues = issues.len(), words, "Section rewritten");
        Ok(EditOutcome::Rewritten {
            section: kind,
            issues: issues.len(),
            words,
        })
    }
}

impl std::fmt::Debug for EditorAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorAgent")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

impl Agent for EditorAgent {
    fn name(&self) -> &'static str {
        "editor"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn temperature(&self) -> f32 {
        0.5
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

#[async_trait]
impl EditStage for EditorAgent {
    async fn apply_all_fixes(
        &self,
        draft: &mut Draft,
        feedback: &mut Feedback,
    ) -> Result<EditReport, AgentError> {
        Self::apply_all_fixes(self, draft, feedback).await
    }

    fn usage(&self) -> TokenUsage {
        Self::usage(self)
    }
}

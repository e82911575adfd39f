//! Reviewer agent.
//!
//! Reviews every populated section of a draft against a fixed issue
//! taxonomy, checks the abstract, introduction and conclusion for
//! consistency, and decides approval under a cycle-gated policy:
//!
//! - cycle 1 is never approved, even with zero issues, and neither is any
//!   cycle below the configured minimum
//! - from then on, approval requires no unresolved critical or major issue
//! - the final review relaxes this to no unresolved critical issue
//!
//! Model output is requested as a JSON [`IssueReport`]. Anything that does
//! not parse counts as "no issues" for that pass.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::config::AgentConfig;
use super::message::{ResponseSchema, TokenUsage, UsageMeter};
use super::prompt::{build_consistency_prompt, build_section_review_prompt};
use super::provider::LlmProvider;
use super::review_loop::ReviewStage;
use super::structured::parse_structured;
use super::traits::{Agent, send};
use crate::core::{
    Draft, DraftStatus, Feedback, Issue, IssueKind, IssueLocation, SectionKind, SectionRef,
    Severity, SeverityCounts,
};
use crate::error::AgentError;

/// Earliest cycle at which any draft may be approved.
pub const MIN_APPROVAL_CYCLE: u32 = 2;

/// Token budget for the consistency pass.
const CONSISTENCY_MAX_TOKENS: u32 = 1000;

/// Suffix appended to the assessment when the final review approves.
const FINAL_APPROVAL_NOTE: &str = "\n\nFINAL REVIEW: Paper approved for finalization.";

/// One finding as reported by the model.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ReportedIssue {
    /// Taxonomy kind, e.g. `missing_citation`.
    #[serde(default, alias = "category", alias = "type")]
    pub kind: String,
    /// `critical`, `major` or `minor`.
    #[serde(default)]
    pub severity: String,
    /// Verbatim passage the issue refers to.
    #[serde(default, alias = "location")]
    pub excerpt: String,
    /// What is wrong.
    #[serde(default)]
    pub description: String,
    /// How to fix it.
    #[serde(default, alias = "suggestion")]
    pub suggested_fix: String,
}

impl ReportedIssue {
    fn into_issue(self, section: SectionKind) -> Issue {
        Issue::new(
            IssueKind::parse(&self.kind),
            Severity::parse(&self.severity),
            IssueLocation::new(section, self.excerpt.trim()),
            self.description.trim(),
            self.suggested_fix.trim(),
        )
    }
}

/// Response shape for a per-section review.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct IssueReport {
    /// Findings; empty when the section passes.
    #[serde(default)]
    pub issues: Vec<ReportedIssue>,
}

/// One cross-section finding.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ReportedInconsistency {
    /// What disagrees.
    #[serde(default)]
    pub description: String,
    /// Sections involved.
    #[serde(default)]
    pub sections: Vec<String>,
    /// How to reconcile them.
    #[serde(default, alias = "suggestion")]
    pub suggested_fix: String,
}

/// Response shape for the consistency pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ConsistencyReport {
    /// Findings; empty when the sections agree.
    #[serde(default)]
    pub inconsistencies: Vec<ReportedInconsistency>,
}

/// Result of [`ReviewerAgent::check_resolved_issues`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionCheck {
    /// Issues in the feedback.
    pub total: usize,
    /// Issues newly flagged resolved by this check.
    pub resolved: usize,
    /// Issues still unresolved afterwards.
    pub remaining: usize,
}

/// First cycle that may be approved when the loop requires `min_cycles`.
#[must_use]
pub const fn approval_floor(min_cycles: u32) -> u32 {
    if min_cycles > MIN_APPROVAL_CYCLE {
        min_cycles
    } else {
        MIN_APPROVAL_CYCLE
    }
}

/// Standard approval: at or past [`approval_floor`] with no unresolved
/// critical or major issue.
#[must_use]
pub fn standard_approval(feedback: &Feedback, min_cycles: u32) -> bool {
    feedback.cycle >= approval_floor(min_cycles) && !feedback.has_unresolved_blocking()
}

/// Final-review approval: at or past [`approval_floor`] with no unresolved
/// critical issue. Implied by [`standard_approval`].
#[must_use]
pub fn relaxed_approval(feedback: &Feedback, min_cycles: u32) -> bool {
    feedback.cycle >= approval_floor(min_cycles) && !feedback.has_unresolved_critical()
}

/// Builds the assessment text for one cycle.
#[must_use]
pub fn build_assessment(cycle: u32, counts: SeverityCounts) -> String {
    let verdict = if cycle <= 1 {
        "This is the first review cycle. The paper requires revisions before it can be approved."
    } else if counts.critical > 0 {
        "The paper has critical issues that must be addressed before approval."
    } else if counts.major > 0 {
        "The paper has major issues that should be addressed."
    } else {
        "The paper is nearing publication readiness with only minor issues remaining."
    };
    format!(
        "Review Cycle {cycle} Assessment:\n\n\
         Total Issues Found: {total}\n\
         - Critical: {critical}\n\
         - Major: {major}\n\
         - Minor: {minor}\n\n\
         {verdict}",
        total = counts.total(),
        critical = counts.critical,
        major = counts.major,
        minor = counts.minor,
    )
}

/// Agent that reviews drafts and produces [`Feedback`].
pub struct ReviewerAgent {
    provider: Arc<dyn LlmProvider>,
    model: String,
    max_tokens: u32,
    system_prompt: String,
    concurrency: usize,
    min_cycles: u32,
    usage: UsageMeter,
}

impl ReviewerAgent {
    /// Creates a reviewer with the given configuration and system prompt.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            provider,
            model: config.reviewer_model.clone(),
            max_tokens: config.reviewer_max_tokens,
            system_prompt,
            concurrency: config.review_concurrency.max(1),
            min_cycles: MIN_APPROVAL_CYCLE,
            usage: UsageMeter::default(),
        }
    }

    /// Withholds approval from every cycle below `min_cycles`.
    #[must_use]
    pub fn with_min_cycles(mut self, min_cycles: u32) -> Self {
        self.min_cycles = approval_floor(min_cycles);
        self
    }

    /// First cycle this reviewer may approve.
    #[must_use]
    pub const fn min_cycles(&self) -> u32 {
        self.min_cycles
    }

    /// Tokens used by every call this reviewer has made.
    #[must_use]
    pub fn usage(&self) -> TokenUsage {
        self.usage.snapshot()
    }

    /// Reviews the draft for the given 1-based cycle.
    ///
    /// Sets `draft.review_cycle` to `cycle` and moves the draft into review.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::EmptyDraft`] if no section has content, or any
    /// provider error that survived retries.
    pub async fn review(&self, draft: &mut Draft, cycle: u32) -> Result<Feedback, AgentError> {
        if !draft.has_content() {
            return Err(AgentError::EmptyDraft);
        }
        info!(cycle, version = draft.version, "Starting review");

        let sections: Vec<(SectionKind, String)> = draft
            .populated_sections()
            .map(|(kind, text)| (kind, text.to_string()))
            .collect();

        // Joined in canonical section order regardless of completion order.
        let results: Vec<Result<Vec<Issue>, AgentError>> = stream::iter(
            sections
                .into_iter()
                .map(|(kind, text)| async move { self.review_section(kind, &text, cycle).await }),
        )
        .buffered(self.concurrency)
        .collect()
        .await;

        let mut feedback = Feedback::new(draft.id, cycle);
        for result in results {
            feedback.issues.extend(result?);
        }
        feedback.issues.extend(self.check_consistency(draft).await?);

        let counts = feedback.severity_counts();
        feedback.assessment = build_assessment(cycle, counts);
        feedback.approved = standard_approval(&feedback, self.min_cycles);

        draft.review_cycle = cycle;
        draft.status = DraftStatus::InReview;

        info!(
            cycle,
            issues = counts.total(),
            critical = counts.critical,
            major = counts.major,
            minor = counts.minor,
            approved = feedback.approved,
            "Review complete"
        );
        Ok(feedback)
    }

    /// Re-runs the review with the relaxed approval bar.
    ///
    /// # Errors
    ///
    /// Same as [`ReviewerAgent::review`].
    pub async fn final_review(&self, draft: &mut Draft, cycle: u32) -> Result<Feedback, AgentError> {
        info!(cycle, "Performing final review");
        let mut feedback = self.review(draft, cycle).await?;
        if relaxed_approval(&feedback, self.min_cycles) {
            feedback.approved = true;
            feedback.assessment.push_str(FINAL_APPROVAL_NOTE);
        }
        Ok(feedback)
    }

    /// Flags issues resolved when their excerpt no longer appears verbatim
    /// in the section they point at.
    ///
    /// Issues with an empty excerpt or a location outside the known
    /// sections are left untouched.
    pub fn check_resolved_issues(feedback: &mut Feedback, draft: &Draft) -> ResolutionCheck {
        let mut resolved = 0;
        for issue in feedback.issues.iter_mut().filter(|i| !i.resolved) {
            let Some(kind) = issue.location.section.kind() else {
                continue;
            };
            let excerpt = issue.location.excerpt.as_str();
            if excerpt.is_empty() {
                continue;
            }
            if !draft.section(kind).unwrap_or_default().contains(excerpt) {
                issue.resolved = true;
                resolved += 1;
            }
        }
        let total = feedback.issues.len();
        ResolutionCheck {
            total,
            resolved,
            remaining: total - feedback.resolved_count(),
        }
    }

    async fn review_section(
        &self,
        kind: SectionKind,
        content: &str,
        cycle: u32,
    ) -> Result<Vec<Issue>, AgentError> {
        let user_msg = build_section_review_prompt(kind, content, cycle);
        let response = self.execute(&*self.provider, &user_msg).await?;
        self.usage.record(response.usage);

        let reported = match parse_structured::<Vec<ReportedIssue>>(&response.content, Some("issues")) {
            Ok(reported) => reported,
            Err(e) => {
                warn!(section = kind.as_str(), cycle, error = %e, "Unreadable review, treating section as passing");
                Vec::new()
            }
        };
        debug!(section = kind.as_str(), issues = reported.len(), "Section reviewed");

        Ok(reported
            .into_iter()
            .filter(|r| !r.description.trim().is_empty() || !r.excerpt.trim().is_empty())
            .map(|r| r.into_issue(kind))
            .collect())
    }

    /// Cross-checks abstract, introduction and conclusion.
    ///
    /// Runs only when at least two of them have text, so a draft with a
    /// single framing section gets no consistency issues at all.
    async fn check_consistency(&self, draft: &Draft) -> Result<Vec<Issue>, AgentError> {
        let abstract_text = draft.section(SectionKind::Abstract).unwrap_or_default();
        let introduction = draft.section(SectionKind::Introduction).unwrap_or_default();
        let conclusion = draft.section(SectionKind::Conclusion).unwrap_or_default();

        let present = [abstract_text, introduction, conclusion]
            .iter()
            .filter(|s| !s.trim().is_empty())
            .count();
        // One framing section has nothing to disagree with.
        if present < 2 {
            debug!("Fewer than two framing sections, skipping consistency check");
            return Ok(Vec::new());
        }

        let mut request = self.request(&build_consistency_prompt(abstract_text, introduction, conclusion));
        request.max_tokens = Some(CONSISTENCY_MAX_TOKENS);
        request.response_schema = Some(ResponseSchema::for_type::<ConsistencyReport>(
            "consistency_report",
        ));
        let response = send(&*self.provider, &request).await?;
        self.usage.record(response.usage);

        let reported = match parse_structured::<Vec<ReportedInconsistency>>(
            &response.content,
            Some("inconsistencies"),
        ) {
            Ok(reported) => reported,
            Err(e) => {
                warn!(error = %e, "Unreadable consistency check, treating sections as aligned");
                Vec::new()
            }
        };

        Ok(reported
            .into_iter()
            .filter(|r| !r.description.trim().is_empty())
            .map(|r| {
                let description = if r.sections.is_empty() {
                    r.description.trim().to_string()
                } else {
                    format!("{} (sections: {})", r.description.trim(), r.sections.join(", "))
                };
                Issue::new(
                    IssueKind::Inconsistency,
                    Severity::Major,
                    IssueLocation::new(SectionRef::CrossSection, ""),
                    description,
                    r.suggested_fix.trim(),
                )
            })
            .collect())
    }
}

impl std::fmt::Debug for ReviewerAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewerAgent")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("concurrency", &self.concurrency)
            .field("min_cycles", &self.min_cycles)
            .finish_non_exhaustive()
    }
}

impl Agent for ReviewerAgent {
    fn name(&self) -> &'static str {
        "reviewer"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn json_mode(&self) -> bool {
        true
    }

    fn response_schema(&self) -> Option<ResponseSchema> {
        Some(ResponseSchema::for_type::<IssueReport>("issue_report"))
    }

    fn temperature(&self) -> f32 {
        0.3
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

#[async_trait]
impl ReviewStage for ReviewerAgent {
    async fn review(&self, draft: &mut Draft, cycle: u32) -> Result<Feedback, AgentError> {
        Self::review(self, draft, cycle).await
    }

    fn usage(&self) -> TokenUsage {
        Self::usage(self)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::mock::{ScriptedProvider, user_text};
    use uuid::Uuid;

    fn config() -> AgentConfig {
        AgentConfig::builder()
            .api_key("test")
            .review_concurrency(2)
            .build()
            .unwrap_or_else(|_| unreachable!())
    }

    fn reviewer(provider: Arc<ScriptedProvider>) -> ReviewerAgent {
        ReviewerAgent::new(provider, &config(), "review".to_string())
    }

    fn draft() -> Draft {
        let mut draft = Draft::new(Uuid::new_v4());
        draft.set_section(SectionKind::Introduction, "X marks the spot");
        draft.set_section(SectionKind::Conclusion, "Y is the answer");
        draft
    }

    fn issue(section: SectionKind, severity: Severity, excerpt: &str) -> Issue {
        Issue::new(
            IssueKind::VagueClaim,
            severity,
            IssueLocation::new(section, excerpt),
            "vague",
            "be specific",
        )
    }

    const TWO_MAJOR: &str = r#"{"issues": [
        {"kind": "missing_citation", "severity": "major", "excerpt": "X marks", "description": "uncited", "suggested_fix": "cite"},
        {"kind": "logic_error", "severity": "MAJOR", "excerpt": "the spot", "description": "leap", "suggested_fix": "argue"}
    ]}"#;

    #[tokio::test]
    async fn test_first_cycle_never_approved() {
        let provider = Arc::new(ScriptedProvider::constant(r#"{"issues": []}"#));
        let reviewer = reviewer(provider);
        let mut draft = draft();

        let feedback = reviewer.review(&mut draft, 1).await.unwrap_or_else(|_| unreachable!());
        assert!(feedback.issues.is_empty());
        assert!(!feedback.approved);
        assert_eq!(draft.review_cycle, 1);
        assert_eq!(draft.status, DraftStatus::InReview);
        assert!(feedback.assessment.contains("first review cycle"));
    }

    #[tokio::test]
    async fn test_second_cycle_clean_is_approved() {
        let provider = Arc::new(ScriptedProvider::constant(r#"{"issues": []}"#));
        let reviewer = reviewer(provider);
        let mut draft = draft();

        let feedback = reviewer.review(&mut draft, 2).await.unwrap_or_else(|_| unreachable!());
        assert!(feedback.approved);
        assert!(feedback.assessment.contains("nearing publication readiness"));
    }

    #[tokio::test]
    async fn test_issues_parsed_per_section() {
        let provider = Arc::new(ScriptedProvider::new(|req| {
            let text = user_text(req);
            if text.contains("<section name=\"introduction\">") {
                Ok(TWO_MAJOR.to_string())
            } else {
                Ok(r#"{"issues": [], "inconsistencies": []}"#.to_string())
            }
        }));
        let reviewer = reviewer(Arc::clone(&provider));
        let mut draft = draft();

        let feedback = reviewer.review(&mut draft, 2).await.unwrap_or_else(|_| unreachable!());
        assert_eq!(feedback.issues.len(), 2);
        assert!(feedback.issues.iter().all(|i| i.severity == Severity::Major));
        assert_eq!(feedback.issues[0].kind, IssueKind::MissingCitation);
        assert_eq!(
            feedback.issues[1].location.section,
            SectionRef::Known(SectionKind::Introduction)
        );
        assert!(!feedback.approved);
        assert!(feedback.assessment.contains("- Major: 2"));
        // two sections plus the consistency pass
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_malformed_output_fails_closed() {
        let provider = Arc::new(ScriptedProvider::constant("ISSUE: everything is vague"));
        let reviewer = reviewer(provider);
        let mut draft = draft();

        let feedback = reviewer.review(&mut draft, 3).await.unwrap_or_else(|_| unreachable!());
        assert!(feedback.issues.is_empty());
        assert!(feedback.approved);
    }

    #[tokio::test]
    async fn test_consistency_findings_are_major_cross_section() {
        let provider = Arc::new(ScriptedProvider::new(|req| {
            if user_text(req).starts_with("Check for consistency") {
                Ok(r#"{"inconsistencies": [{"description": "abstract overclaims", "sections": ["abstract", "conclusion"], "suggested_fix": "tone down"}]}"#.to_string())
            } else {
                Ok(r#"{"issues": []}"#.to_string())
            }
        }));
        let reviewer = reviewer(provider);
        let mut draft = draft();
        draft.set_section(SectionKind::Abstract, "We prove everything.");

        let feedback = reviewer.review(&mut draft, 2).await.unwrap_or_else(|_| unreachable!());
        assert_eq!(feedback.issues.len(), 1);
        let issue = &feedback.issues[0];
        assert_eq!(issue.severity, Severity::Major);
        assert_eq!(issue.kind, IssueKind::Inconsistency);
        assert_eq!(issue.location.section, SectionRef::CrossSection);
        assert!(!feedback.approved);
    }

    #[tokio::test]
    async fn test_consistency_skipped_with_one_framing_section() {
        let provider = Arc::new(ScriptedProvider::new(|req| {
            if user_text(req).starts_with("Check for consistency") {
                Ok(r#"{"inconsistencies": [{"description": "clash", "sections": ["introduction"]}]}"#.to_string())
            } else {
                Ok(r#"{"issues": []}"#.to_string())
            }
        }));
        let reviewer = reviewer(Arc::clone(&provider));
        let mut draft = Draft::new(Uuid::new_v4());
        draft.set_section(SectionKind::Introduction, "X marks the spot");
        draft.set_section(SectionKind::Methodology, "We sampled plots");

        let feedback = reviewer.review(&mut draft, 2).await.unwrap_or_else(|_| unreachable!());
        assert!(feedback.issues.is_empty());
        assert!(
            !provider
                .prompts()
                .iter()
                .any(|p| p.starts_with("Check for consistency"))
        );
    }

    #[tokio::test]
    async fn test_empty_draft_rejected() {
        let provider = Arc::new(ScriptedProvider::constant("{}"));
        let reviewer = reviewer(Arc::clone(&provider));
        let mut draft = Draft::new(Uuid::new_v4());
        let result = reviewer.review(&mut draft, 1).await;
        assert!(matches!(result, Err(AgentError::EmptyDraft)));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let provider = Arc::new(ScriptedProvider::new(|_| {
            Err(AgentError::ApiRequest {
                message: "down".to_string(),
                status: Some(503),
            })
        }));
        let reviewer = reviewer(provider);
        let mut draft = draft();
        assert!(reviewer.review(&mut draft, 1).await.is_err());
    }

    #[tokio::test]
    async fn test_final_review_ignores_major() {
        let provider = Arc::new(ScriptedProvider::new(|req| {
            if user_text(req).contains("<section name=\"introduction\">") {
                Ok(TWO_MAJOR.to_string())
            } else {
                Ok(r#"{"issues": []}"#.to_string())
            }
        }));
        let reviewer = reviewer(provider);
        let mut draft = draft();

        let feedback = reviewer
            .final_review(&mut draft, 2)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert!(feedback.approved);
        assert!(feedback.assessment.ends_with(FINAL_APPROVAL_NOTE));

        let feedback = reviewer
            .final_review(&mut draft, 1)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert!(!feedback.approved);
    }

    #[test]
    fn test_relaxed_implied_by_standard() {
        let severities = [Severity::Critical, Severity::Major, Severity::Minor];
        for cycle in 1..5 {
            for mask in 0..8u8 {
                let mut feedback = Feedback::new(Uuid::new_v4(), cycle);
                for (bit, severity) in severities.iter().enumerate() {
                    if mask & (1 << bit) != 0 {
                        feedback.issues.push(issue(SectionKind::Analysis, *severity, "x"));
                    }
                }
                for min_cycles in 0..4 {
                    if standard_approval(&feedback, min_cycles) {
                        assert!(relaxed_approval(&feedback, min_cycles));
                    }
                    if cycle < approval_floor(min_cycles) {
                        assert!(!relaxed_approval(&feedback, min_cycles));
                    }
                }
            }
        }
    }

    #[tokio::test]
    async fn test_configured_minimum_withholds_approval() {
        let provider = Arc::new(ScriptedProvider::constant(r#"{"issues": []}"#));
        let reviewer = reviewer(provider).with_min_cycles(3);
        assert_eq!(reviewer.min_cycles(), 3);
        let mut draft = draft();

        let feedback = reviewer.review(&mut draft, 2).await.unwrap_or_else(|_| unreachable!());
        assert!(!feedback.approved);
        let feedback = reviewer
            .final_review(&mut draft, 2)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert!(!feedback.approved);
        let feedback = reviewer.review(&mut draft, 3).await.unwrap_or_else(|_| unreachable!());
        assert!(feedback.approved);
    }

    #[test]
    fn test_approval_floor_never_below_two() {
        assert_eq!(approval_floor(0), 2);
        assert_eq!(approval_floor(2), 2);
        assert_eq!(approval_floor(4), 4);
    }

    #[test]
    fn test_check_resolved_uses_excerpt_containment() {
        let mut draft = draft();
        let mut feedback = Feedback::new(draft.id, 1);
        feedback.issues.push(issue(SectionKind::Introduction, Severity::Major, "marks the"));
        feedback.issues.push(issue(SectionKind::Introduction, Severity::Minor, "gone text"));
        feedback.issues.push(issue(SectionKind::Conclusion, Severity::Minor, ""));
        feedback.issues.push(Issue::new(
            IssueKind::Inconsistency,
            Severity::Major,
            IssueLocation::new(SectionRef::CrossSection, "abc"),
            "d",
            "f",
        ));

        let check = ReviewerAgent::check_resolved_issues(&mut feedback, &draft);
        assert_eq!(check.total, 4);
        assert_eq!(check.resolved, 1);
        assert_eq!(check.remaining, 3);
        assert!(feedback.issues[1].resolved);
        assert!(!feedback.issues[0].resolved);

        draft.set_section(SectionKind::Introduction, "rewritten entirely");
        let check = ReviewerAgent::check_resolved_issues(&mut feedback, &draft);
        assert_eq!(check.resolved, 1);
        assert_eq!(check.remaining, 2);
    }

    #[test]
    fn test_assessment_bands() {
        let counts = SeverityCounts {
            critical: 1,
            major: 0,
            minor: 2,
        };
        let text = build_assessment(2, counts);
        assert!(text.starts_with("Review Cycle 2 Assessment:"));
        assert!(text.contains("Total Issues Found: 3"));
        assert!(text.contains("critical issues that must be addressed"));
        let text = build_assessment(3, SeverityCounts { critical: 0, major: 1, minor: 0 });
        assert!(text.contains("major issues that should be addressed"));
    }
}

//! Review–edit loop controller.
//!
//! A small state machine over `reviewing → editing → reviewing …` that
//! stops in `converged` once an approved review lands at or after
//! `min_cycles`, or in `exhausted` after `max_cycles` reviews. Exhaustion
//! is not an error: the caller continues with the latest draft.
//!
//! Cycles are strictly sequential and the draft has a single writer. Any
//! retrying happens inside the provider, so one review or edit here is one
//! logical call.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use super::editor::EditReport;
use super::message::TokenUsage;
use crate::core::{Draft, DraftStatus, Feedback};
use crate::error::AgentError;

/// Default minimum cycles before approval is possible.
pub const DEFAULT_MIN_CYCLES: u32 = 2;
/// Default hard cap on review cycles.
pub const DEFAULT_MAX_CYCLES: u32 = 5;

/// Produces feedback for a draft.
#[async_trait]
pub trait ReviewStage: Send + Sync {
    /// Reviews `draft` for the 1-based `cycle`.
    async fn review(&self, draft: &mut Draft, cycle: u32) -> Result<Feedback, AgentError>;

    /// Tokens used so far.
    fn usage(&self) -> TokenUsage {
        TokenUsage::default()
    }
}

/// Applies feedback to a draft.
#[async_trait]
pub trait EditStage: Send + Sync {
    /// Rewrites the draft to address the unresolved issues in `feedback`.
    async fn apply_all_fixes(
        &self,
        draft: &mut Draft,
        feedback: &mut Feedback,
    ) -> Result<EditReport, AgentError>;

    /// Tokens used so far.
    fn usage(&self) -> TokenUsage {
        TokenUsage::default()
    }
}

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    /// Waiting on a review.
    Reviewing,
    /// Waiting on an edit pass.
    Editing,
    /// An approved review landed at or after the minimum cycle.
    Converged,
    /// The cycle cap was reached without convergence.
    Exhausted,
}

impl LoopState {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Reviewing => "reviewing",
            Self::Editing => "editing",
            Self::Converged => "converged",
            Self::Exhausted => "exhausted",
        }
    }

    /// Whether the loop has stopped.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Converged | Self::Exhausted)
    }
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    /// Cycle during which the change happened.
    pub cycle: u32,
    /// State left.
    pub from: LoopState,
    /// State entered.
    pub to: LoopState,
}

/// Result of a loop run.
#[derive(Debug, Clone, Serialize)]
pub struct LoopOutcome {
    /// `Converged` or `Exhausted`.
    pub state: LoopState,
    /// Reviews performed.
    pub cycles: u32,
    /// Feedback from the last review.
    pub feedback: Feedback,
    /// Edit passes, one per non-final cycle.
    pub edits: Vec<EditReport>,
    /// Every state change, in order.
    pub transitions: Vec<Transition>,
    /// Tokens used by both stages during the run.
    pub usage: TokenUsage,
}

impl LoopOutcome {
    /// Whether the loop converged.
    #[must_use]
    pub fn converged(&self) -> bool {
        self.state == LoopState::Converged
    }
}

/// Review–edit loop with minimum and maximum cycle bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewLoop {
    min_cycles: u32,
    max_cycles: u32,
}

impl Default for ReviewLoop {
    fn default() -> Self {
        Self {
            min_cycles: DEFAULT_MIN_CYCLES,
            max_cycles: DEFAULT_MAX_CYCLES,
        }
    }
}

impl ReviewLoop {
    /// Creates a loop.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Config`] when `max_cycles` is zero or smaller
    /// than `min_cycles`.
    pub fn new(min_cycles: u32, max_cycles: u32) -> Result<Self, AgentError> {
        if max_cycles == 0 {
            return Err(AgentError::Config {
                message: "max review cycles must be at least 1".to_string(),
            });
        }
        if min_cycles > max_cycles {
            return Err(AgentError::Config {
                message: format!(
                    "min review cycles ({min_cycles}) exceeds max review cycles ({max_cycles})"
                ),
            });
        }
        Ok(Self {
            min_cycles,
            max_cycles,
        })
    }

    /// Minimum cycles before convergence.
    #[must_use]
    pub const fn min_cycles(&self) -> u32 {
        self.min_cycles
    }

    /// Hard cycle cap.
    #[must_use]
    pub const fn max_cycles(&self) -> u32 {
        self.max_cycles
    }

    /// Runs the loop to a terminal state.
    ///
    /// On `converged` the draft is marked approved and no further edit runs.
    /// On `exhausted` the draft carries the last edit pass and the outcome
    /// carries the last review's feedback.
    ///
    /// # Errors
    ///
    /// Propagates the first review or edit failure.
    pub async fn run(
        &self,
        reviewer: &dyn ReviewStage,
        editor: &dyn EditStage,
        draft: &mut Draft,
    ) -> Result<LoopOutcome, AgentError> {
        let usage_before = (reviewer.usage(), editor.usage());
        let mut transitions = Vec::new();
        let mut edits = Vec::new();
        let mut state = LoopState::Reviewing;
        let mut last: Option<Feedback> = None;
        let mut cycles = 0;

        for cycle in 1..=self.max_cycles {
            cycles = cycle;
            let mut feedback = reviewer.review(draft, cycle).await?;
            info!(
                cycle,
                issues = feedback.issues.len(),
                approved = feedback.approved,
                "Review cycle finished"
            );

            if feedback.approved && cycle >= self.min_cycles {
                transitions.push(Transition {
                    cycle,
                    from: state,
                    to: LoopState::Converged,
                });
                state = LoopState::Converged;
                draft.status = DraftStatus::Approved;
                last = Some(feedback);
                break;
            }

            transitions.push(Transition {
                cycle,
                from: state,
                to: LoopState::Editing,
            });
            let report = editor.apply_all_fixes(draft, &mut feedback).await?;
            info!(
                cycle,
                version = report.version,
                issues_fixed = report.issues_fixed,
                "Edit pass finished"
            );
            edits.push(report);

            let next = if cycle == self.max_cycles {
                LoopState::Exhausted
            } else {
                LoopState::Reviewing
            };
            transitions.push(Transition {
                cycle,
                from: LoopState::Editing,
                to: next,
            });
            state = next;
            last = Some(feedback);
        }

        let feedback = last.ok_or_else(|| AgentError::Orchestration {
            message: "review loop ran no cycles".to_string(),
        })?;

        if state == LoopState::Exhausted {
            warn!(
                cycles,
                unresolved = feedback.unresolved().count(),
                "Review cycles exhausted, continuing with current draft"
            );
        }

        let mut usage = reviewer.usage();
        usage.add(editor.usage());
        let mut baseline = usage_before.0;
        baseline.add(usage_before.1);

        Ok(LoopOutcome {
            state,
            cycles,
            feedback,
            edits,
            transitions,
            usage: TokenUsage {
                prompt_tokens: usage.prompt_tokens.saturating_sub(baseline.prompt_tokens),
                completion_tokens: usage
                    .completion_tokens
                    .saturating_sub(baseline.completion_tokens),
                total_tokens: usage.total_tokens.saturating_sub(baseline.total_tokens),
            },
        })
    }
}

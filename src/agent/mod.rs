//! Language-model collaborators for paper generation.
//!
//! Provides the reviewer, the editor, the review–edit loop controller and
//! the stage runner around them, behind a pluggable provider abstraction
//! backed by OpenAI-compatible APIs.
//!
//! # Architecture
//!
//! ```text
//! Topic → Orchestrator
//!   ├── Stages (topic, title, queries, summaries, outline, sections)
//!   ├── Search backends → ranked, deduplicated sources
//!   ├── ReviewLoop
//!   │   ├── ReviewerAgent → Feedback
//!   │   └── EditorAgent → rewritten sections
//!   ├── Final review (relaxed approval, only after exhaustion)
//!   └── Exporters → pdf / docx / latex / markdown
//! ```

pub mod client;
pub mod config;
pub mod editor;
pub mod message;
#[cfg(test)]
pub(crate) mod mock;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod retry;
pub mod review_loop;
pub mod reviewer;
pub mod stages;
pub mod structured;
pub mod traits;

// Re-export key types
pub use client::create_provider;
pub use config::AgentConfig;
pub use editor::{EditOutcome, EditReport, EditorAgent};
pub use message::{ChatMessage, ChatRequest, ChatResponse, ResponseSchema, Role, TokenUsage};
pub use orchestrator::{Orchestrator, PaperReport, PipelineContext};
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use review_loop::{LoopOutcome, LoopState, ReviewLoop};
pub use reviewer::{ResolutionCheck, ReviewerAgent};
pub use stages::{Clarifier, NoClarifier, Outline, Stages, TopicAnalysis};
pub use traits::Agent;

//! # academician
//!
//! LLM-driven academic paper generation with a bounded review–edit loop.
//!
//! A run refines a topic, discovers and ranks sources, drafts every section,
//! then alternates structured review and targeted editing until the reviewer
//! approves (after a minimum number of cycles) or the cycle budget runs out.
//! The result is exported as PDF, DOCX, LaTeX and Markdown.
//!
//! ## Modules
//!
//! - [`core`]: sessions, sources, drafts and review feedback
//! - [`agent`]: LLM providers, reviewer, editor, loop controller, stages
//! - [`search`]: source discovery, deduplication and ranking
//! - [`citation`]: APA, MLA, Chicago, IEEE and Harvard formatting
//! - [`export`]: document writers
//! - [`storage`]: `SQLite` persistence and JSON artifacts
//! - [`cli`]: command-line interface

pub mod agent;
pub mod citation;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod export;
pub mod search;
pub mod storage;

pub use config::PaperConfig;
pub use error::{Error, Result};

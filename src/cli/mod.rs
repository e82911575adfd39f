//! CLI layer for academician.
//!
//! Provides the command-line interface using clap, with commands for
//! generating papers, inspecting configuration and listing sessions.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::{StdinClarifier, execute};
pub use output::OutputFormat;
pub use parser::{Cli, Commands};

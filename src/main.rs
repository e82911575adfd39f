//! academician binary entry point.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use academician::cli::{Cli, execute};

fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        "academician=debug"
    } else {
        "academician=info"
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run(cli: &Cli) -> anyhow::Result<String> {
    execute(cli).with_context(|| format!("{} failed", command_name(cli)))
}

const fn command_name(cli: &Cli) -> &'static str {
    use academician::cli::Commands;
    match cli.command {
        Commands::Generate { .. } => "generate",
        Commands::Config => "config",
        Commands::Version => "version",
        Commands::Sessions { .. } => "sessions",
        Commands::InitPrompts { .. } => "init-prompts",
    }
}

#[allow(clippy::print_stdout, clippy::print_stderr)]
fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

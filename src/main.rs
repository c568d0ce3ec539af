//! Dud - make-like data pipeline tool
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use dud::cli::{Cli, Commands};
use dud::error::DudResult;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> DudResult<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => EnvFilter::new("dud=info"),
        1 => EnvFilter::new("dud=debug"),
        _ => EnvFilter::new("dud=trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    // Dispatch to command
    match cli.command {
        Commands::Init(args) => dud::cli::commands::init(args).await,
        Commands::Stage(args) => dud::cli::commands::stage(args).await,
        Commands::Run(args) => dud::cli::commands::run(args).await,
        Commands::ImportArtifacts(args) => dud::cli::commands::import_artifacts(args).await,
    }
}

//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Dud - make-like data pipeline tool
///
/// Runs declared stages only when their inputs, outputs, or definitions
/// changed, restoring unchanged results from a content-addressed cache.
#[derive(Parser, Debug)]
#[command(name = "dud")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a dud workspace in the current directory
    Init(InitArgs),

    /// Manage the stage index
    Stage(StageArgs),

    /// Run stages, re-executing only what is out of date
    Run(RunArgs),

    /// Import a stage's committed outputs from the cache
    ImportArtifacts(ImportArgs),
}

/// Arguments for the init command
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Reinitialize an existing workspace
    #[arg(short, long)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(short, long)]
    pub path: Option<PathBuf>,
}

/// Arguments for the stage command
#[derive(Parser, Debug)]
pub struct StageArgs {
    /// Subcommand for stage
    #[command(subcommand)]
    pub action: StageAction,
}

/// Stage subcommands
#[derive(Subcommand, Debug)]
pub enum StageAction {
    /// Add stage files to the index
    Add {
        /// Stage files to register
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Stages to run (defaults to every stage in the index)
    pub stages: Vec<String>,

    /// Run only the named stages, not their upstream dependencies
    #[arg(long)]
    pub single_stage: bool,
}

/// Arguments for the import-artifacts command
#[derive(Parser, Debug)]
pub struct ImportArgs {
    /// Stage file whose outputs should be imported
    pub stage_file: PathBuf,

    /// Directory to place imported files in (defaults to each output's
    /// declared workspace path)
    #[arg(short = 'O', long = "output-dir")]
    pub output_dir: Option<PathBuf>,
}

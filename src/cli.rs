//! CLI interface for review-core.

use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod analyzers;
pub mod review;

/// review-core: automated code review orchestration.
#[derive(Parser)]
#[command(name = "review-core")]
#[command(about = "Runs review analyzers over a repository scope", long_about = None)]
#[command(version)]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Reviews a pull request, the worktree, a diff, files or the whole repository.
    Review(review::ReviewCommand),
    /// Lists the built-in analyzers.
    Analyzers(analyzers::AnalyzersCommand),
}

impl Cli {
    /// Executes the CLI command and returns the process exit code.
    pub async fn execute(self) -> Result<i32> {
        match self.command {
            Commands::Review(cmd) => cmd.execute().await,
            Commands::Analyzers(cmd) => cmd.execute().map(|()| 0),
        }
    }
}

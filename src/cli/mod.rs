//! CLI interface for gitscribe.

use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod commit;
pub mod completions;
pub mod pr;
pub mod tag;

/// gitscribe: AI-assisted git commit messages, release tags, and pull
/// requests.
#[derive(Parser)]
#[command(name = "gitscribe")]
#[command(about = "AI-assisted git commit messages, release tags, and pull requests", long_about = None)]
#[command(version)]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Generates a commit message for the staged changes and commits them.
    Commit(commit::CommitCommand),
    /// Creates or replaces an annotated release tag with generated notes.
    Tag(tag::TagCommand),
    /// Creates a pull request with an AI-generated description.
    Pr(pr::PrCommand),
    /// Generates shell completion scripts.
    Completions(completions::CompletionsCommand),
}

impl Cli {
    /// Executes the CLI command.
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Commit(cmd) => cmd.execute().await,
            Commands::Tag(cmd) => cmd.execute().await,
            Commands::Pr(cmd) => cmd.execute().await,
            Commands::Completions(cmd) => cmd.execute(),
        }
    }
}

//! Commit command — AI-generated commit message for the staged changes.

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use crate::ai::{prompts, GenerationRequest, RequestAdapter};
use crate::config::Config;
use crate::git::{GitRepository, SHORT_HASH_LEN};
use crate::history;
use crate::message::normalize;
use crate::prompt::{TerminalPrompt, UserPrompt};

/// Commit command options.
#[derive(Parser)]
pub struct CommitCommand {
    /// Model to use (overrides configuration).
    #[arg(long)]
    pub model: Option<String>,

    /// Output language for the generated message.
    #[arg(long)]
    pub language: Option<String>,

    /// Prints the generated message without committing.
    #[arg(long)]
    pub dry_run: bool,

    /// Skips the confirmation prompt.
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Disables streaming progress output.
    #[arg(long)]
    pub quiet: bool,
}

impl CommitCommand {
    /// Executes the commit command.
    pub async fn execute(self) -> Result<()> {
        let config = Config::resolve(
            self.model.as_deref(),
            self.language.as_deref(),
            !self.quiet,
            self.quiet,
        )?;

        let repo = GitRepository::open()?;
        let diff = repo.staged_diff()?;
        if diff.trim().is_empty() {
            anyhow::bail!("No staged changes found. Stage changes with 'git add' first.");
        }
        debug!(diff_len = diff.len(), "collected staged diff");

        println!("🤖 Generating commit message (model: {})...", config.model);
        let adapter = RequestAdapter::from_config(&config);
        let request =
            GenerationRequest::from_config(&config, prompts::commit_messages(&diff, &config));
        let raw = adapter.send(request).await?;

        let message = normalize(&raw);
        if message.is_empty() {
            anyhow::bail!("The model returned no usable commit message");
        }

        println!("\n📝 Commit message:");
        println!("─────────────────────────────");
        println!("{message}");
        println!("─────────────────────────────");

        if self.dry_run {
            return Ok(());
        }

        if !self.yes {
            let mut prompt = TerminalPrompt;
            if !prompt.confirm("Commit the staged changes with this message?")? {
                println!("❌ Commit cancelled.");
                return Ok(());
            }
        }

        let oid = repo.commit_staged(&message)?;
        let hash = oid.to_string();
        println!("✅ Created commit {}", &hash[..SHORT_HASH_LEN]);

        let subject = message.lines().next().unwrap_or("");
        history::record("commit", subject);

        Ok(())
    }
}

//! Tag command — annotated release tags with generated notes.

use anyhow::Result;
use clap::Parser;

use crate::ai::RequestAdapter;
use crate::config::Config;
use crate::git::GitRepository;
use crate::history;
use crate::prompt::TerminalPrompt;
use crate::tag::{TagLifecycleController, TagOptions, TagOutcome};

/// Tag command options.
#[derive(Parser)]
pub struct TagCommand {
    /// Tag name; auto-increments the latest tag's patch when omitted.
    pub name: Option<String>,

    /// Uses this message verbatim instead of generating release notes.
    #[arg(long, short = 'm')]
    pub message: Option<String>,

    /// Base tag for collecting commit subjects (defaults to the latest tag).
    #[arg(long)]
    pub base: Option<String>,

    /// Model to use (overrides configuration).
    #[arg(long)]
    pub model: Option<String>,

    /// Output language for the generated notes.
    #[arg(long)]
    pub language: Option<String>,

    /// Disables streaming progress output.
    #[arg(long)]
    pub quiet: bool,
}

impl TagCommand {
    /// Executes the tag command.
    pub async fn execute(self) -> Result<()> {
        let config = Config::resolve(
            self.model.as_deref(),
            self.language.as_deref(),
            !self.quiet,
            self.quiet,
        )?;

        let repo = GitRepository::open()?;
        let adapter = RequestAdapter::from_config(&config);
        let mut prompt = TerminalPrompt;
        let mut controller = TagLifecycleController::new(&repo, &mut prompt, &adapter, &config);

        let outcome = controller
            .run(TagOptions {
                name: self.name,
                message: self.message,
                base: self.base,
            })
            .await?;

        match outcome {
            TagOutcome::Cancelled => {
                println!("❌ Tag operation cancelled.");
                Ok(())
            }
            TagOutcome::Completed { tag, pushed, failed } => {
                history::record("tag", &tag);
                if !failed.is_empty() {
                    anyhow::bail!(
                        "Tag '{tag}' created, but push failed for {} of {} selected remote(s)",
                        failed.len(),
                        failed.len() + pushed.len()
                    );
                }
                Ok(())
            }
        }
    }
}

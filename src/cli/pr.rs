//! PR command — AI-generated pull request title and description.

use std::process::Command;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use crate::ai::{prompts, GenerationRequest, RequestAdapter};
use crate::config::Config;
use crate::git::{GitRepository, RemoteInfo};
use crate::history;
use crate::message::normalize;
use crate::prompt::{TerminalPrompt, UserPrompt};

/// Create PR command options.
#[derive(Parser)]
pub struct PrCommand {
    /// Base branch for the PR (defaults to the remote's default branch).
    #[arg(long, value_name = "BRANCH")]
    pub base: Option<String>,

    /// Model to use (overrides configuration).
    #[arg(long)]
    pub model: Option<String>,

    /// Output language for the generated description.
    #[arg(long)]
    pub language: Option<String>,

    /// Creates the PR as a draft.
    #[arg(long)]
    pub draft: bool,

    /// Skips the confirmation prompt.
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Disables streaming progress output.
    #[arg(long)]
    pub quiet: bool,
}

impl PrCommand {
    /// Executes the PR command.
    pub async fn execute(self) -> Result<()> {
        let config = Config::resolve(
            self.model.as_deref(),
            self.language.as_deref(),
            !self.quiet,
            self.quiet,
        )?;

        let repo = GitRepository::open()?;
        let branch = repo.current_branch().context(
            "Failed to get current branch. Make sure you're not in detached HEAD state.",
        )?;

        let remotes = RemoteInfo::get_all_remotes(repo.repository())?;
        let primary = RemoteInfo::primary(&remotes)
            .context("No remotes found in repository")?
            .clone();

        let base_branch = self.resolve_base_branch(&primary)?;
        println!("📊 Branch analysis:");
        println!("   🌿 Current branch: {branch}");
        println!("   🎯 Base: {base_branch}");

        let subjects = repo.subjects_since(Some(&base_branch))?;
        if subjects.is_empty() {
            anyhow::bail!(
                "No commits found between '{base_branch}' and HEAD. Nothing to open a PR for."
            );
        }
        println!("   📝 Commits found: {}", subjects.len());

        let diff = repo.diff_against(&base_branch)?;
        debug!(diff_len = diff.len(), commits = subjects.len(), "collected branch changes");

        println!("🤖 Generating PR description (model: {})...", config.model);
        let adapter = RequestAdapter::from_config(&config);
        let request = GenerationRequest::from_config(
            &config,
            prompts::pr_messages(&branch, &base_branch, &subjects, &diff, &config),
        );
        let raw = adapter.send(request).await?;

        let (title, description) = split_title_body(&raw);
        let title = fallback_title(title, &subjects);

        println!("\n📝 Pull request:");
        println!("─────────────────────────────");
        println!("{title}");
        if !description.is_empty() {
            println!("\n{description}");
        }
        println!("─────────────────────────────");

        if !self.yes {
            let mut prompt = TerminalPrompt;
            if !prompt.confirm("Create the pull request?")? {
                println!("❌ PR creation cancelled.");
                return Ok(());
            }
        }

        if !repo.branch_exists_on_remote(&branch, &primary.name)? {
            println!("📤 Pushing branch to '{}'...", primary.name);
            repo.push_branch(&branch, &primary.name)?;
        }

        let url = self.create_github_pr(&branch, &base_branch, &primary, &title, &description)?;
        println!("🎉 Pull request created: {url}");

        history::record("pr", &title);
        Ok(())
    }

    /// Resolves the base branch, prefixing the primary remote when needed.
    fn resolve_base_branch(&self, primary: &RemoteInfo) -> Result<String> {
        match self.base.as_ref() {
            Some(base) if base.contains('/') => Ok(base.clone()),
            Some(base) => Ok(format!("{}/{base}", primary.name)),
            None => {
                if primary.main_branch == "unknown" {
                    anyhow::bail!(
                        "Could not determine the default branch for remote '{}'. \
                         Pass --base explicitly.",
                        primary.name
                    );
                }
                Ok(format!("{}/{}", primary.name, primary.main_branch))
            }
        }
    }

    /// Creates the PR via the GitHub CLI and returns its URL.
    fn create_github_pr(
        &self,
        branch: &str,
        base_branch: &str,
        primary: &RemoteInfo,
        title: &str,
        description: &str,
    ) -> Result<String> {
        // gh expects the base without the remote prefix.
        let base = base_branch
            .strip_prefix(&format!("{}/", primary.name))
            .unwrap_or(base_branch);

        let mut args = vec![
            "pr",
            "create",
            "--head",
            branch,
            "--base",
            base,
            "--title",
            title,
            "--body",
            description,
        ];
        if self.draft {
            args.push("--draft");
        }

        debug!(?args, "creating PR with gh CLI");
        let output = Command::new("gh")
            .args(&args)
            .output()
            .context("Failed to run the GitHub CLI (is 'gh' installed?)")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Failed to create pull request: {}", stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Splits model output into a title (first non-empty line) and description.
fn split_title_body(raw: &str) -> (String, String) {
    let mut lines = raw.trim().lines();
    let title = lines
        .find(|l| !l.trim().is_empty())
        .unwrap_or("")
        .trim()
        .trim_matches('#')
        .trim()
        .to_string();
    let description = lines.collect::<Vec<_>>().join("\n").trim().to_string();
    (title, description)
}

/// Falls back to a normalized first commit subject when the title is empty.
fn fallback_title(title: String, subjects: &[String]) -> String {
    if !title.is_empty() {
        return title;
    }
    let last = subjects.last().map(String::as_str).unwrap_or("");
    let normalized = normalize(last);
    if normalized.is_empty() {
        "Pull request".to_string()
    } else {
        normalized.lines().next().unwrap_or("Pull request").to_string()
    }
}

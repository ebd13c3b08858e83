//! Tag lifecycle controller.
//!
//! Replacing a release tag is the one genuinely dangerous operation in this
//! tool: the tag may exist locally, on a remote, or both, and the only safe
//! path through deletion, recreation, and publishing depends on what the
//! user allows at each step. The controller walks that path as a fixed
//! sequence of confirmed steps and never mutates anything the user has not
//! explicitly approved.
//!
//! Declining a confirmation cancels the run without further mutation.
//! Whether publishing needs a force-push is derived strictly from remote
//! tag presence: if the remote copy is known to still exist (the user
//! declined its deletion), a plain push cannot succeed and the controller
//! asks for force-push approval instead of failing halfway.

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::ai::{prompts, GenerationRequest, RequestAdapter};
use crate::config::Config;
use crate::git::{next_patch, TagStore};
use crate::prompt::UserPrompt;

/// Options for one tag run.
#[derive(Debug, Clone, Default)]
pub struct TagOptions {
    /// Tag name; auto-incremented from the latest semver tag when absent.
    pub name: Option<String>,
    /// Explicit tag message, used verbatim instead of generating one.
    pub message: Option<String>,
    /// Base tag for collecting commit subjects; defaults to the latest tag.
    pub base: Option<String>,
}

/// Terminal outcome of a tag run that did not fail.
#[derive(Debug)]
pub enum TagOutcome {
    /// The tag was created; publishing results are per remote.
    Completed {
        /// Name of the created tag.
        tag: String,
        /// Remotes pushed successfully, in selection order.
        pushed: Vec<String>,
        /// Remotes that failed, with the error text.
        failed: Vec<(String, String)>,
    },
    /// The user declined a confirmation; nothing further was mutated.
    Cancelled,
}

/// Orchestrates tag replacement, note generation, creation, and publishing.
pub struct TagLifecycleController<'a, S: TagStore, P: UserPrompt> {
    store: &'a S,
    prompt: &'a mut P,
    adapter: &'a RequestAdapter,
    config: &'a Config,
}

impl<'a, S: TagStore, P: UserPrompt> TagLifecycleController<'a, S, P> {
    /// Creates a controller over the given collaborators.
    pub fn new(
        store: &'a S,
        prompt: &'a mut P,
        adapter: &'a RequestAdapter,
        config: &'a Config,
    ) -> Self {
        Self {
            store,
            prompt,
            adapter,
            config,
        }
    }

    /// Runs the tag lifecycle to one of its terminal outcomes.
    pub async fn run(&mut self, options: TagOptions) -> Result<TagOutcome> {
        let name = self.resolve_name(options.name)?;
        debug!(tag = %name, "starting tag run");

        let exists_locally = self.store.tag_exists(&name)?;
        // The prior message must be read before any deletion.
        let prior_message = if exists_locally {
            self.store.tag_message(&name)?
        } else {
            None
        };

        // Tracks whether the remote copy is known to still exist; a plain
        // push cannot replace it, so this drives the force-push decision.
        let mut remote_tag_present = false;

        if exists_locally {
            let question = format!("Tag '{name}' already exists locally. Delete and recreate it?");
            if !self.prompt.confirm(&question)? {
                return Ok(TagOutcome::Cancelled);
            }

            if let Some(remote) = self.default_remote()? {
                if self.store.tag_exists_on_remote(&remote, &name)? {
                    let question =
                        format!("Tag '{name}' also exists on remote '{remote}'. Delete it there too?");
                    if self.prompt.confirm(&question)? {
                        self.store.delete_remote_tag(&remote, &name)?;
                        // Re-read rather than assume the deletion took.
                        remote_tag_present = self.store.tag_exists_on_remote(&remote, &name)?;
                    } else {
                        remote_tag_present = true;
                    }
                }
            }

            self.store.delete_tag(&name)?;
            if self.store.tag_exists(&name)? {
                anyhow::bail!("Local tag '{name}' still exists after deletion");
            }
        }

        let message = match options.message {
            Some(message) => message,
            None => {
                self.generate_message(&name, options.base.as_deref(), prior_message.as_deref())
                    .await?
            }
        };

        println!("\n📝 Tag message for '{name}':");
        println!("─────────────────────────────");
        println!("{message}");
        println!("─────────────────────────────");

        if !self.prompt.confirm("Create the tag with this message?")? {
            return Ok(TagOutcome::Cancelled);
        }

        self.store.create_tag(&name, &message)?;
        println!("🏷️  Created annotated tag '{name}'");

        let remotes = self.store.remotes()?;
        if remotes.is_empty() {
            println!("📡 No remotes configured; skipping push.");
            return Ok(TagOutcome::Completed {
                tag: name,
                pushed: Vec::new(),
                failed: Vec::new(),
            });
        }

        let selection = self.prompt.select_remotes(&remotes)?;
        if selection.is_empty() {
            println!("📡 No remotes selected; skipping push.");
            return Ok(TagOutcome::Completed {
                tag: name,
                pushed: Vec::new(),
                failed: Vec::new(),
            });
        }

        let force = remote_tag_present;
        if force {
            let question = format!(
                "Tag '{name}' still exists on the remote; publishing requires a force-push. Continue?"
            );
            if !self.prompt.confirm(&question)? {
                return Ok(TagOutcome::Cancelled);
            }
        }

        // Sequential pushes: a failure on one remote is reported and does
        // not abort the remaining pushes.
        let mut pushed = Vec::new();
        let mut failed = Vec::new();
        for remote in selection {
            match self.store.push_tag(&remote, &name, force) {
                Ok(()) => {
                    println!("✅ Pushed '{name}' to '{remote}'");
                    pushed.push(remote);
                }
                Err(error) => {
                    warn!(%remote, %error, "tag push failed");
                    println!("❌ Push to '{remote}' failed: {error:#}");
                    failed.push((remote, format!("{error:#}")));
                }
            }
        }

        Ok(TagOutcome::Completed {
            tag: name,
            pushed,
            failed,
        })
    }

    /// Resolves the tag name, auto-incrementing the latest semver tag's
    /// patch component when none is given.
    fn resolve_name(&self, name: Option<String>) -> Result<String> {
        if let Some(name) = name {
            return Ok(name);
        }

        let latest = self
            .store
            .latest_tag()?
            .context("No tag name given and no existing semver tag to increment")?;
        let next = next_patch(&latest)
            .with_context(|| format!("Latest tag '{latest}' has no parseable version"))?;
        println!("🔢 No tag name given; continuing from '{latest}' as '{next}'");
        Ok(next)
    }

    /// First configured remote, preferring `origin`.
    fn default_remote(&self) -> Result<Option<String>> {
        let remotes = self.store.remotes()?;
        Ok(remotes
            .iter()
            .find(|r| r.as_str() == "origin")
            .cloned()
            .or_else(|| remotes.into_iter().next()))
    }

    /// Generates the tag message from commit subjects and style references.
    async fn generate_message(
        &self,
        name: &str,
        base_override: Option<&str>,
        prior_message: Option<&str>,
    ) -> Result<String> {
        let base = match base_override {
            Some(base) => Some(base.to_string()),
            None => self.store.latest_tag()?,
        };
        // The tag being replaced is never its own base.
        let base = base.filter(|b| b != name);

        let subjects = self.store.subjects_since(base.as_deref())?;
        if subjects.is_empty() {
            match &base {
                Some(base) => anyhow::bail!("No commits found since tag '{base}'"),
                None => anyhow::bail!("No commits found to describe"),
            }
        }
        debug!(count = subjects.len(), base = ?base, "collected commit subjects");

        let base_message = match &base {
            Some(base) => self.store.tag_message(base)?,
            None => None,
        };

        let messages =
            prompts::tag_messages(name, &subjects, prior_message, base_message.as_deref(), self.config);
        let request = GenerationRequest::from_config(self.config, messages);
        let raw = self
            .adapter
            .send(request)
            .await
            .context("Failed to generate the tag message")?;

        Ok(raw.trim().to_string())
    }
}

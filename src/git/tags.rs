//! Tag operations behind an injectable store trait.

use anyhow::{Context, Result};
use semver::Version;
use tracing::debug;

use crate::git::repository::GitRepository;

/// Version-control tag operations consumed by the tag lifecycle controller.
///
/// The production implementation wraps git2 plus `git` shell-outs for
/// network operations; tests substitute a scripted store.
pub trait TagStore {
    /// Name of the latest semver tag, if any.
    fn latest_tag(&self) -> Result<Option<String>>;
    /// Whether a tag exists locally.
    fn tag_exists(&self, name: &str) -> Result<bool>;
    /// Whether a tag exists on a remote.
    fn tag_exists_on_remote(&self, remote: &str, name: &str) -> Result<bool>;
    /// Message of an annotated tag; `None` for lightweight or missing tags.
    fn tag_message(&self, name: &str) -> Result<Option<String>>;
    /// Deletes a local tag.
    fn delete_tag(&self, name: &str) -> Result<()>;
    /// Deletes a tag from a remote.
    fn delete_remote_tag(&self, remote: &str, name: &str) -> Result<()>;
    /// Creates an annotated tag at HEAD.
    fn create_tag(&self, name: &str, message: &str) -> Result<()>;
    /// Pushes a tag to a remote, optionally forced.
    fn push_tag(&self, remote: &str, name: &str, force: bool) -> Result<()>;
    /// Names of the configured remotes.
    fn remotes(&self) -> Result<Vec<String>>;
    /// Commit subjects since a base ref (exclusive), newest first.
    fn subjects_since(&self, base: Option<&str>) -> Result<Vec<String>>;
}

impl TagStore for GitRepository {
    fn latest_tag(&self) -> Result<Option<String>> {
        let mut best: Option<(Version, String)> = None;

        self.repository()
            .tag_foreach(|_oid, name_bytes| {
                if let Ok(name_str) = std::str::from_utf8(name_bytes) {
                    let name = name_str.strip_prefix("refs/tags/").unwrap_or(name_str);
                    if let Some(version) = parse_version(name) {
                        let replace = best
                            .as_ref()
                            .map_or(true, |(current, _)| version > *current);
                        if replace {
                            best = Some((version, name.to_string()));
                        }
                    }
                }
                true
            })
            .context("Failed to enumerate tags")?;

        Ok(best.map(|(_, name)| name))
    }

    fn tag_exists(&self, name: &str) -> Result<bool> {
        Ok(self
            .repository()
            .find_reference(&format!("refs/tags/{name}"))
            .is_ok())
    }

    fn tag_exists_on_remote(&self, remote: &str, name: &str) -> Result<bool> {
        let output = self
            .git_command()?
            .args(["ls-remote", "--tags", remote, &format!("refs/tags/{name}")])
            .output()
            .context("Failed to run git ls-remote")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "git ls-remote failed for remote '{remote}': {}",
                stderr.trim()
            );
        }

        Ok(!String::from_utf8_lossy(&output.stdout).trim().is_empty())
    }

    fn tag_message(&self, name: &str) -> Result<Option<String>> {
        let reference = match self
            .repository()
            .find_reference(&format!("refs/tags/{name}"))
        {
            Ok(reference) => reference,
            Err(_) => return Ok(None),
        };

        match reference.peel_to_tag() {
            Ok(tag) => Ok(tag.message().map(|m| m.trim_end().to_string())),
            // Lightweight tags carry no message.
            Err(_) => Ok(None),
        }
    }

    fn delete_tag(&self, name: &str) -> Result<()> {
        self.repository()
            .tag_delete(name)
            .with_context(|| format!("Failed to delete local tag '{name}'"))?;
        debug!(tag = name, "deleted local tag");
        Ok(())
    }

    fn delete_remote_tag(&self, remote: &str, name: &str) -> Result<()> {
        let output = self
            .git_command()?
            .args(["push", remote, "--delete", &format!("refs/tags/{name}")])
            .output()
            .context("Failed to run git push --delete")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "Failed to delete tag '{name}' from remote '{remote}': {}",
                stderr.trim()
            );
        }
        debug!(tag = name, remote, "deleted remote tag");
        Ok(())
    }

    fn create_tag(&self, name: &str, message: &str) -> Result<()> {
        let repo = self.repository();
        let signature = repo
            .signature()
            .context("Failed to get tag signature (configure user.name and user.email)")?;
        let head = repo
            .head()
            .context("Failed to get HEAD")?
            .peel(git2::ObjectType::Commit)
            .context("Failed to peel HEAD to commit")?;

        repo.tag(name, &head, &signature, message, false)
            .with_context(|| format!("Failed to create tag '{name}'"))?;
        debug!(tag = name, "created annotated tag");
        Ok(())
    }

    fn push_tag(&self, remote: &str, name: &str, force: bool) -> Result<()> {
        let refspec = format!("refs/tags/{name}");
        let mut args = vec!["push"];
        if force {
            args.push("--force");
        }
        args.push(remote);
        args.push(&refspec);

        let output = self
            .git_command()?
            .args(&args)
            .output()
            .context("Failed to run git push")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "Failed to push tag '{name}' to remote '{remote}': {}",
                stderr.trim()
            );
        }
        debug!(tag = name, remote, force, "pushed tag");
        Ok(())
    }

    fn remotes(&self) -> Result<Vec<String>> {
        let remotes = self
            .repository()
            .remotes()
            .context("Failed to list remotes")?;
        Ok(remotes.iter().flatten().map(String::from).collect())
    }

    fn subjects_since(&self, base: Option<&str>) -> Result<Vec<String>> {
        GitRepository::subjects_since(self, base)
    }
}

/// Extracts a semver version from a tag name, accepting a leading `v`.
pub fn parse_version(tag_name: &str) -> Option<Version> {
    let version_str = tag_name.strip_prefix('v').unwrap_or(tag_name);
    Version::parse(version_str).ok()
}

/// Returns the tag name with its patch component incremented, preserving a
/// leading `v`.
pub fn next_patch(tag_name: &str) -> Option<String> {
    let version = parse_version(tag_name)?;
    let bumped = Version::new(version.major, version.minor, version.patch + 1);
    if tag_name.starts_with('v') {
        Some(format!("v{bumped}"))
    } else {
        Some(bumped.to_string())
    }
}

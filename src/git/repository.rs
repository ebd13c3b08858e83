//! Git repository operations.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use git2::{DiffFormat, DiffOptions, Repository};
use tracing::debug;

/// Git repository wrapper.
pub struct GitRepository {
    repo: Repository,
}

impl GitRepository {
    /// Opens the repository at the current directory.
    pub fn open() -> Result<Self> {
        let repo = Repository::discover(".").context("Not in a git repository")?;
        Ok(Self { repo })
    }

    /// Opens the repository at a specific path.
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Repository::open(path).context("Failed to open git repository")?;
        Ok(Self { repo })
    }

    /// Access to the underlying git2 repository.
    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// Working directory of the repository.
    pub fn workdir(&self) -> Result<PathBuf> {
        self.repo
            .workdir()
            .map(Path::to_path_buf)
            .context("Repository has no working directory")
    }

    /// Current branch name; fails in detached HEAD state.
    pub fn current_branch(&self) -> Result<String> {
        let head = self.repo.head().context("Failed to get HEAD reference")?;

        if let Some(name) = head.shorthand() {
            if name != "HEAD" {
                return Ok(name.to_string());
            }
        }

        anyhow::bail!("Repository is in detached HEAD state")
    }

    /// Returns the staged diff (index against HEAD) as patch text.
    ///
    /// An empty string means nothing is staged.
    pub fn staged_diff(&self) -> Result<String> {
        let head_tree = match self.repo.head() {
            Ok(head) => Some(
                head.peel_to_tree()
                    .context("Failed to peel HEAD to tree")?,
            ),
            // Unborn branch: diff the index against nothing.
            Err(_) => None,
        };

        let mut options = DiffOptions::new();
        let diff = self
            .repo
            .diff_tree_to_index(head_tree.as_ref(), None, Some(&mut options))
            .context("Failed to diff index against HEAD")?;

        render_patch(&diff)
    }

    /// Returns the diff of HEAD against the merge base with `base_ref`.
    pub fn diff_against(&self, base_ref: &str) -> Result<String> {
        let head = self
            .repo
            .head()
            .context("Failed to get HEAD")?
            .peel_to_commit()
            .context("Failed to peel HEAD to commit")?;

        let base = self
            .repo
            .revparse_single(base_ref)
            .with_context(|| format!("Failed to resolve base ref '{base_ref}'"))?
            .peel_to_commit()
            .context("Failed to peel base to commit")?;

        let merge_base = self
            .repo
            .merge_base(head.id(), base.id())
            .context("Failed to find merge base")?;
        let merge_base_tree = self
            .repo
            .find_commit(merge_base)?
            .tree()
            .context("Failed to get merge-base tree")?;

        let diff = self
            .repo
            .diff_tree_to_tree(Some(&merge_base_tree), Some(&head.tree()?), None)
            .context("Failed to diff against base")?;

        render_patch(&diff)
    }

    /// Creates a commit from the current index with the given message.
    pub fn commit_staged(&self, message: &str) -> Result<git2::Oid> {
        let signature = self
            .repo
            .signature()
            .context("Failed to get commit signature (configure user.name and user.email)")?;

        let mut index = self.repo.index().context("Failed to open index")?;
        let tree_id = index.write_tree().context("Failed to write index tree")?;
        let tree = self.repo.find_tree(tree_id)?;

        let parent = match self.repo.head() {
            Ok(head) => Some(
                head.peel_to_commit()
                    .context("Failed to peel HEAD to commit")?,
            ),
            Err(_) => None,
        };
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        let oid = self
            .repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .context("Failed to create commit")?;

        debug!(commit = %oid, "created commit");
        Ok(oid)
    }

    /// Returns commit subjects reachable from HEAD, newest first, optionally
    /// stopping at `base_ref` (exclusive). Merge commits are skipped.
    pub fn subjects_since(&self, base_ref: Option<&str>) -> Result<Vec<String>> {
        let head = match self.repo.head() {
            Ok(head) => head.peel_to_commit().context("Failed to peel HEAD")?,
            Err(_) => return Ok(Vec::new()),
        };

        let mut walker = self.repo.revwalk().context("Failed to create revwalk")?;
        walker.push(head.id()).context("Failed to push HEAD")?;

        if let Some(base) = base_ref {
            let base_commit = self
                .repo
                .revparse_single(base)
                .with_context(|| format!("Failed to resolve base ref '{base}'"))?
                .peel_to_commit()
                .with_context(|| format!("Failed to peel '{base}' to a commit"))?;
            walker
                .hide(base_commit.id())
                .context("Failed to hide base commit")?;
        }

        let mut subjects = Vec::new();
        for oid in walker {
            let oid = oid.context("Failed to walk commits")?;
            let commit = self.repo.find_commit(oid)?;
            if commit.parent_count() > 1 {
                continue;
            }
            subjects.push(commit.summary().unwrap_or("").to_string());
        }

        Ok(subjects)
    }

    /// Checks whether a branch exists on a remote, via `git ls-remote`.
    pub fn branch_exists_on_remote(&self, branch: &str, remote: &str) -> Result<bool> {
        let output = self
            .git_command()?
            .args(["ls-remote", "--heads", remote, &format!("refs/heads/{branch}")])
            .output()
            .context("Failed to run git ls-remote")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("git ls-remote failed for remote '{remote}': {}", stderr.trim());
        }

        Ok(!String::from_utf8_lossy(&output.stdout).trim().is_empty())
    }

    /// Pushes a branch to a remote, setting the upstream.
    pub fn push_branch(&self, branch: &str, remote: &str) -> Result<()> {
        let output = self
            .git_command()?
            .args(["push", "--set-upstream", remote, branch])
            .output()
            .context("Failed to run git push")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "Failed to push branch '{branch}' to '{remote}': {}",
                stderr.trim()
            );
        }

        Ok(())
    }

    /// Builds a `git` command rooted at the repository's working directory.
    ///
    /// Network operations (ls-remote, push) go through the git binary so the
    /// user's normal credential helpers and SSH configuration apply.
    pub(crate) fn git_command(&self) -> Result<Command> {
        let mut command = Command::new("git");
        command.current_dir(self.workdir()?);
        Ok(command)
    }
}

/// Renders a git2 diff as unified patch text.
fn render_patch(diff: &git2::Diff<'_>) -> Result<String> {
    let mut text = String::new();
    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        match line.origin() {
            '+' | '-' | ' ' => text.push(line.origin()),
            _ => {}
        }
        text.push_str(&String::from_utf8_lossy(line.content()));
        true
    })
    .context("Failed to render diff")?;
    Ok(text)
}

//! Git remote enumeration and default-branch detection.

use anyhow::{Context, Result};
use git2::Repository;

/// Remote repository information.
#[derive(Debug, Clone)]
pub struct RemoteInfo {
    /// Name of the remote (e.g., "origin", "upstream").
    pub name: String,
    /// URI of the remote repository.
    pub uri: String,
    /// Detected default branch name for this remote.
    pub main_branch: String,
}

impl RemoteInfo {
    /// Gets all remotes for a repository.
    pub fn get_all_remotes(repo: &Repository) -> Result<Vec<Self>> {
        let mut remotes = Vec::new();
        let remote_names = repo.remotes().context("Failed to get remote names")?;

        for name in remote_names.iter().flatten() {
            if let Ok(remote) = repo.find_remote(name) {
                let uri = remote.url().unwrap_or("").to_string();
                let main_branch = Self::detect_main_branch(repo, name);

                remotes.push(RemoteInfo {
                    name: name.to_string(),
                    uri,
                    main_branch,
                });
            }
        }

        Ok(remotes)
    }

    /// Returns the primary remote: `origin` when present, else the first.
    pub fn primary(remotes: &[RemoteInfo]) -> Option<&RemoteInfo> {
        remotes
            .iter()
            .find(|r| r.name == "origin")
            .or_else(|| remotes.first())
    }

    /// Detects the default branch for a remote.
    fn detect_main_branch(repo: &Repository, remote_name: &str) -> String {
        // The remote HEAD symbolic ref is authoritative when fetched.
        let head_ref_name = format!("refs/remotes/{remote_name}/HEAD");
        if let Ok(head_ref) = repo.find_reference(&head_ref_name) {
            if let Some(target) = head_ref.symbolic_target() {
                if let Some(branch_name) =
                    target.strip_prefix(&format!("refs/remotes/{remote_name}/"))
                {
                    return branch_name.to_string();
                }
            }
        }

        // Fall back to common branch names.
        for branch_name in ["main", "master", "develop"] {
            let reference_name = format!("refs/remotes/{remote_name}/{branch_name}");
            if repo.find_reference(&reference_name).is_ok() {
                return branch_name.to_string();
            }
        }

        "unknown".to_string()
    }
}

//! Saving and restoring the caller's checkout around a task
//!
//! The tasks move HEAD around freely. Whatever happens, the repository is put
//! back on the original branch (or detached commit) when the task ends.

use crate::error::Result;
use crate::git::Git;
use tracing::{debug, info, warn};

/// Branch and commit to return to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutState {
    /// Branch name, or `HEAD` when detached
    pub branch: String,
    /// Commit HEAD pointed at
    pub commit: String,
}

impl CheckoutState {
    /// Record the current checkout
    pub async fn save(git: Git<'_>) -> Result<Self> {
        info!("Save current checkout state...");
        let branch = git.current_branch().await?;
        let commit = git.head_commit().await?;
        debug!(%branch, %commit, "saved checkout state");
        Ok(Self { branch, commit })
    }

    /// Whether the saved checkout was a detached HEAD
    pub fn is_detached(&self) -> bool {
        self.branch == "HEAD"
    }

    /// Put the branch back where it was, discarding any changes
    pub async fn restore(&self, git: Git<'_>) -> Result<()> {
        info!("Restore checkout state...");
        if self.is_detached() {
            git.checkout_detach(&self.commit).await?;
            git.reset_hard("HEAD").await
        } else {
            git.checkout_force(&self.branch).await?;
            git.reset_hard(&self.commit).await
        }
    }
}

/// Temporary remote pointing at the fork being merged into
///
/// Also makes the merge work in CI, where no `upstream` remote exists.
#[derive(Debug, Clone)]
pub struct MergeRemote {
    name: String,
}

impl MergeRemote {
    /// Remote called `name`; nothing is created until [`MergeRemote::setup`]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Remote name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Point the remote at `url` and fetch it
    pub async fn setup(&self, git: Git<'_>, url: &str) -> Result<()> {
        info!("Create remote to refer to destination fork...");
        if git.remote_url(&self.name).await?.is_some() {
            git.set_remote_url(&self.name, url).await?;
        } else {
            git.add_remote(&self.name, url).await?;
        }
        git.update_remote(&self.name).await
    }

    /// Remove the remote; failures are ignored
    pub async fn remove(&self, git: Git<'_>) {
        info!("Remove remote...");
        match git.remove_remote(&self.name).await {
            Ok(true) => {}
            Ok(false) => debug!(remote = %self.name, "remote was not removed"),
            Err(e) => debug!(remote = %self.name, error = %e, "failed to remove remote"),
        }
    }
}

/// Combine the outcome of a task with the outcome of its cleanup.
///
/// The task's error wins; a cleanup error after a failed task is only logged.
pub fn settle<T>(outcome: Result<T>, cleanup: Result<()>) -> Result<T> {
    match (outcome, cleanup) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) | (Err(e), Ok(())) => Err(e),
        (Err(e), Err(cleanup_err)) => {
            warn!(error = %cleanup_err, "cleanup failed after error");
            Err(e)
        }
    }
}

//! The merge-upstream task
//!
//! Merges the Conan Center Index branch into the fork's staging branch:
//!
//! ```text
//! START -> MERGE_ATTEMPT -> MERGED | UP_TO_DATE
//!                        -> CONFLICT -> RESOLVE_SOME -> MERGED | UP_TO_DATE
//!                                                    -> UNRESOLVED -> ABORT -> PULL_REQUEST
//! ```
//!
//! Conflicts are not errors; they come back as [`MergeAttempt::Conflicted`]
//! and turn into a pull request. Any other failure aborts the task.

use crate::config::{MergeUpstreamConfig, ProjectConfig};
use crate::error::{Error, Result};
use crate::gh::filter_merge_pull_requests;
use crate::git::Git;
use crate::merge::checkout::{CheckoutState, MergeRemote, settle};
use crate::merge::conflicts::{both_modified, deleted_by_us, merge_ours, with_merge_attributes};
use crate::merge::pr_body::{PR_TITLE, form_pr_body};
use crate::merge::status_file::{MERGE_UPSTREAM_STATUS, remove_status_file, write_status_file};
use crate::runner::{TaskContext, render_command};
use crate::types::{GitFileStatus, MergeStatus, NewPullRequest};
use std::io::Write;
use tracing::{info, warn};

/// Commit message for removing files deleted locally but changed upstream
pub const DELETED_BY_US_MESSAGE: &str = "Delete conflicting files that were deleted by DL";

/// Commit message for keeping the local side of `merge=ours` files
pub const MERGE_OURS_MESSAGE: &str = "Favor DL changes for files where merge=ours";

/// Result of trying to merge and push
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeAttempt {
    /// Merge finished (and was pushed if anything changed)
    Completed(MergeStatus),
    /// Conflicts remain; every conflict of a plain merge, with attributes
    Conflicted(Vec<GitFileStatus>),
}

/// Run merge-upstream and write `.merge-upstream-status`
pub async fn merge_upstream(ctx: &TaskContext, config: &MergeUpstreamConfig) -> Result<MergeStatus> {
    check_preconditions(ctx, config).await?;
    info!("merge-upstream configuration:\n{}", config.to_yaml()?);

    // from here on, a missing status file tells CI the run failed
    remove_status_file(&ctx.path(MERGE_UPSTREAM_STATUS))?;

    let git = ctx.git();
    let checkout = CheckoutState::save(git).await?;
    let remote = MergeRemote::new(config.upstream.remote_name.as_str());

    let outcome = match remote.setup(git, &config.upstream.url()).await {
        Ok(()) => merge_or_open_pull_request(ctx, config).await,
        Err(e) => Err(e),
    };

    remote.remove(git).await;
    let restored = checkout.restore(git).await;
    settle(outcome, restored)
}

/// Merge, or turn the conflicts into a pull request; writes the status file
async fn merge_or_open_pull_request(
    ctx: &TaskContext,
    config: &MergeUpstreamConfig,
) -> Result<MergeStatus> {
    let git = ctx.git();
    let status = match merge_and_push(git, config).await? {
        MergeAttempt::Completed(status) => status,
        MergeAttempt::Conflicted(conflicts) => {
            let body = form_pr_body(git, config, &conflicts).await;
            let aborted = git.merge_abort().await;
            let body = settle(body, aborted)?;
            create_pull_request(ctx, config, &body, &conflicts).await?;
            MergeStatus::PullRequest
        }
    };
    write_status_file(status, &ctx.path(MERGE_UPSTREAM_STATUS))?;
    Ok(status)
}

/// Platform, clean worktree and a logged-in `gh`
pub async fn check_preconditions(ctx: &TaskContext, config: &MergeUpstreamConfig) -> Result<()> {
    info!("Check preconditions...");
    if !matches!(std::env::consts::OS, "linux" | "macos") {
        return Err(Error::Precondition("Run this task on macOS or Linux".into()));
    }
    if !ctx.git().worktree_is_clean().await? {
        return Err(Error::Precondition(
            "The local worktree has uncommitted changes".into(),
        ));
    }
    let gh = ctx.gh();
    if !gh.is_installed().await? {
        return Err(Error::Precondition(
            "This task requires the GitHub CLI. See installation instructions at https://cli.github.com/"
                .into(),
        ));
    }
    let host = &config.upstream.host;
    if !gh.auth_status(host).await? {
        return Err(Error::Precondition(format!(
            "GitHub CLI must be logged in to {host}, or a token supplied in GH_TOKEN; \
             see https://cli.github.com/manual/gh_auth_login"
        )));
    }
    Ok(())
}

/// Merge Conan Center Index onto the fork branch, resolving what policy allows
pub async fn merge_and_push(git: Git<'_>, config: &MergeUpstreamConfig) -> Result<MergeAttempt> {
    let upstream = &config.upstream;
    info!("Check out local {} branch...", upstream.branch);
    git.checkout_detach(&upstream.remote_branch()).await?;

    info!("Merge upstream branch...");
    git.fetch(&config.cci.url, &config.cci.branch).await?;
    let merge = git.merge_with_attributes(&upstream.branch).await?;
    if merge.success() {
        return maybe_push(git, config).await.map(MergeAttempt::Completed);
    }

    info!("Check for merge conflicts...");
    let original = git.merge_conflicts().await?;
    if original.is_empty() {
        // the merge failed for some other reason
        return Err(Error::CommandFailed {
            command: render_command("git", &["merge", "FETCH_HEAD"]),
            code: merge.code,
            stderr: merge.stderr.trim().to_string(),
        });
    }

    remove_files_deleted_by_us(git, &original).await?;
    if !git.merge_conflicts().await?.is_empty() {
        return list_all_conflicts(git).await.map(MergeAttempt::Conflicted);
    }

    info!("Commit merge with resolved conflicts...");
    git.commit_no_edit().await?;
    maybe_push(git, config).await.map(MergeAttempt::Completed)
}

/// Push HEAD to the fork branch unless it is already there
pub async fn maybe_push(git: Git<'_>, config: &MergeUpstreamConfig) -> Result<MergeStatus> {
    let upstream = &config.upstream;
    if git
        .count_revs(&format!("{}..HEAD", upstream.remote_branch()))
        .await?
        == 0
    {
        info!("Repo is already up to date");
        return Ok(MergeStatus::UpToDate);
    }
    info!("Push to local repo...");
    git.push(
        &upstream.remote_name,
        &format!("HEAD:refs/heads/{}", upstream.branch),
        false,
    )
    .await?;
    Ok(MergeStatus::Merged)
}

/// `git rm` every path deleted by us; returns the removed paths
async fn remove_files_deleted_by_us<'c>(
    git: Git<'_>,
    conflicts: &'c [GitFileStatus],
) -> Result<Vec<&'c str>> {
    info!("Removing conflict files deleted by us...");
    let paths = deleted_by_us(conflicts);
    for path in &paths {
        git.rm(path).await?;
    }
    Ok(paths)
}

/// Redo the merge without the ours driver so every conflict is listed,
/// then attach the merge attributes
async fn list_all_conflicts(git: Git<'_>) -> Result<Vec<GitFileStatus>> {
    info!("Redoing merge to get complete conflict list");
    git.merge_abort().await?;
    git.merge_no_commit().await?;
    let conflicts = git.merge_conflicts().await?;
    let attrs = git.check_merge_attr(&both_modified(&conflicts)).await?;
    Ok(with_merge_attributes(conflicts, &attrs))
}

/// Push the resolvable part of the merge to the fork and open (or update)
/// the pull request
pub async fn create_pull_request(
    ctx: &TaskContext,
    config: &MergeUpstreamConfig,
    body: &str,
    conflicts: &[GitFileStatus],
) -> Result<()> {
    let git = ctx.git();
    let upstream = &config.upstream;
    let pull_request = &config.pull_request;

    info!("Create pull request from upstream branch...");
    git.fetch(&config.cci.url, &config.cci.branch).await?;
    git.checkout_detach("FETCH_HEAD").await?;

    if !remove_files_deleted_by_us(git, conflicts).await?.is_empty() {
        git.commit_message(DELETED_BY_US_MESSAGE).await?;
    }

    let ours = merge_ours(conflicts);
    if !ours.is_empty() {
        let local = upstream.remote_branch();
        for path in &ours {
            git.checkout_paths(&local, &[*path]).await?;
        }
        git.commit_message(MERGE_OURS_MESSAGE).await?;
    }

    // refs/heads/ creates the branch if it does not exist yet
    git.push(
        &pull_request.url(),
        &format!("HEAD:refs/heads/{}", pull_request.merge_branch_name),
        true,
    )
    .await?;

    let mut body_file = tempfile::Builder::new().prefix("pr-body").tempfile()?;
    body_file.write_all(body.as_bytes())?;
    body_file.flush()?;

    let gh = ctx.gh();
    let repo = upstream.gh_repo();
    info!("Check for existing pull requests...");
    let existing = filter_merge_pull_requests(
        gh.list_pull_requests(&repo).await?,
        &pull_request.merge_branch_name,
        &pull_request.fork,
    );

    match existing.as_slice() {
        [] => {
            info!("Create new pull request...");
            let request = NewPullRequest {
                base: upstream.branch.clone(),
                title: PR_TITLE.to_string(),
                head: format!("{}:{}", pull_request.fork, pull_request.merge_branch_name),
                labels: pull_request.labels.clone(),
                assignee: pull_request.assignee.clone(),
                reviewers: pull_request.reviewers.clone(),
            };
            gh.create_pull_request(&repo, &request, body_file.path())
                .await
        }
        [first, rest @ ..] => {
            if !rest.is_empty() {
                warn!(
                    count = existing.len(),
                    "several open pull requests from {}:{}; editing #{}",
                    pull_request.fork,
                    pull_request.merge_branch_name,
                    first.number
                );
            }
            info!("Edit existing pull request...");
            gh.edit_pull_request_body(&repo, &first.url, body_file.path())
                .await
        }
    }
}

//! GitHub CLI (`gh`) operations

use crate::error::{Error, Result};
use crate::runner::CommandRunner;
use crate::types::{NewPullRequest, PullRequest};
use std::path::Path;
use tracing::debug;

/// Fields requested from `gh pr list`
const PR_LIST_FIELDS: &str = "number,url,author,headRefName,headRepositoryOwner";

/// Thin facade over the `gh` CLI
#[derive(Clone, Copy)]
pub struct GhCli<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> GhCli<'a> {
    /// Wrap a runner
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    /// Whether `gh` can be spawned at all
    pub async fn is_installed(&self) -> Result<bool> {
        match self.runner.output("gh", &["--version"]).await {
            Ok(_) => Ok(true),
            Err(Error::ProgramNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Whether `gh` is logged in to `host` (or has `GH_TOKEN`)
    pub async fn auth_status(&self, host: &str) -> Result<bool> {
        Ok(self
            .runner
            .output("gh", &["auth", "status", "--hostname", host])
            .await?
            .success())
    }

    /// Open pull requests on `repo` (`host/owner/name`)
    pub async fn list_pull_requests(&self, repo: &str) -> Result<Vec<PullRequest>> {
        let output = self
            .runner
            .run("gh", &["pr", "list", "--repo", repo, "--json", PR_LIST_FIELDS])
            .await?;
        parse_pull_request_list(&output.stdout)
    }

    /// Replace the body of an existing pull request
    pub async fn edit_pull_request_body(&self, repo: &str, url: &str, body_file: &Path) -> Result<()> {
        let body_file = body_file.to_string_lossy();
        self.runner
            .run(
                "gh",
                &["pr", "edit", "--repo", repo, url, "--body-file", &*body_file],
            )
            .await
            .map(drop)
    }

    /// Open a new pull request
    pub async fn create_pull_request(
        &self,
        repo: &str,
        request: &NewPullRequest,
        body_file: &Path,
    ) -> Result<()> {
        let body_file = body_file.to_string_lossy();
        let labels = request.labels.join(",");
        let reviewers = request.reviewers.join(",");

        let mut args = vec![
            "pr",
            "create",
            "--repo",
            repo,
            "--base",
            request.base.as_str(),
            "--title",
            request.title.as_str(),
            "--body-file",
            &*body_file,
            "--head",
            request.head.as_str(),
        ];
        if !request.labels.is_empty() {
            args.extend_from_slice(&["--label", labels.as_str()]);
        }
        if let Some(assignee) = request.assignee.as_deref() {
            args.extend_from_slice(&["--assignee", assignee]);
        }
        if !request.reviewers.is_empty() {
            args.extend_from_slice(&["--reviewer", reviewers.as_str()]);
        }
        self.runner.run("gh", &args).await.map(drop)
    }
}

/// Parse `gh pr list --json` output; empty output means no pull requests
pub fn parse_pull_request_list(json: &str) -> Result<Vec<PullRequest>> {
    let json = json.trim();
    if json.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(json)?)
}

/// Pull requests whose head is `fork:branch_name`
pub fn filter_merge_pull_requests(
    prs: Vec<PullRequest>,
    branch_name: &str,
    fork: &str,
) -> Vec<PullRequest> {
    prs.into_iter()
        .filter(|pr| {
            let matches = pr.head_ref_name == branch_name
                && pr
                    .head_repository_owner
                    .as_ref()
                    .is_some_and(|owner| owner.login == fork);
            if !matches {
                debug!(number = pr.number, head = %pr.head_ref_name, "ignoring unrelated pull request");
            }
            matches
        })
        .collect()
}

//! Pull request body describing unresolvable merge conflicts

use crate::config::MergeUpstreamConfig;
use crate::error::Result;
use crate::git::Git;
use crate::merge::conflicts::unresolvable;
use crate::types::GitFileStatus;
use tracing::info;

/// Title of the pull request opened on conflicts
pub const PR_TITLE: &str = "Merge in changes from conan-io/master";

/// Everything that goes into the body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrBodyInput {
    /// Branch being merged into
    pub local_branch: String,
    /// Paths that could not be resolved
    pub conflict_files: Vec<String>,
    /// `git log` of upstream commits touching the files
    pub commits_on_upstream: String,
    /// Upstream changes since the merge base
    pub diff_on_upstream: String,
    /// `git log` of local commits touching the files
    pub commits_local: String,
    /// Local changes since the merge base
    pub diff_on_local: String,
}

/// Render the markdown body
pub fn render_pr_body(input: &PrBodyInput) -> String {
    let PrBodyInput {
        local_branch,
        conflict_files,
        commits_on_upstream,
        diff_on_upstream,
        commits_local,
        diff_on_local,
    } = input;
    let conflict_files = conflict_files.join("\n");

    format!(
        "Merge changes from conan-io/conan-center-index into {local_branch}.

This PR was automatically created due to merge conflicts in the automated merge.

## Conflict information

### List of conflict files

{conflict_files}

### Commits for conflict files on `conan-io`

{commits_on_upstream}

#### Differences on `conan-io`

<details><summary>Click to reveal...</summary>

```diff
{diff_on_upstream}
```

</details>

### Commits for conflict files, local

{commits_local}

#### Differences, local

<details><summary>Click to reveal...</summary>

```diff
{diff_on_local}
```

</details>
"
    )
}

/// Query git for the commits and diffs of the unresolvable conflicts.
///
/// Must run while the merge is still in progress, since the ranges use
/// `MERGE_HEAD`. With nothing unresolvable the queries are skipped.
pub async fn form_pr_body(
    git: Git<'_>,
    config: &MergeUpstreamConfig,
    conflicts: &[GitFileStatus],
) -> Result<String> {
    info!("Create body of pull request message...");
    let files: Vec<&str> = unresolvable(conflicts)
        .into_iter()
        .map(|c| c.path.as_str())
        .collect();

    let mut input = PrBodyInput {
        local_branch: config.upstream.branch.clone(),
        conflict_files: files.iter().map(|f| (*f).to_string()).collect(),
        ..PrBodyInput::default()
    };
    if !files.is_empty() {
        input.commits_on_upstream = git.log_merge_range("HEAD..MERGE_HEAD", &files).await?;
        input.diff_on_upstream = git.diff_three_dot("HEAD...MERGE_HEAD", &files).await?;
        input.commits_local = git.log_merge_range("MERGE_HEAD..HEAD", &files).await?;
        input.diff_on_local = git.diff_three_dot("MERGE_HEAD...HEAD", &files).await?;
    }
    Ok(render_pr_body(&input))
}

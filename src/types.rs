//! Core types for cci-tasks

use serde::{Deserialize, Serialize};

/// Outcome of a merge task
///
/// The name of the variant (see [`MergeStatus::name`]) is what gets written
/// into the status file consumed by CI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStatus {
    /// The branch was already up to date
    UpToDate,
    /// The branch was merged and pushed
    Merged,
    /// A pull request was necessary
    PullRequest,
}

impl MergeStatus {
    /// Name written to the status file
    pub const fn name(self) -> &'static str {
        match self {
            Self::UpToDate => "UP_TO_DATE",
            Self::Merged => "MERGED",
            Self::PullRequest => "PULL_REQUEST",
        }
    }
}

impl std::fmt::Display for MergeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Two-letter porcelain codes that denote an unmerged path.
///
/// See <https://git-scm.com/docs/git-status#_short_format>:
/// DD both deleted, AU added by us, UD deleted by them, UA added by them,
/// DU deleted by us, AA both added, UU both modified.
pub const CONFLICT_CODES: [&str; 7] = ["DD", "AU", "UD", "UA", "DU", "AA", "UU"];

/// Status code for a path deleted locally but modified upstream
pub const DELETED_BY_US: &str = "DU";

/// Status code for a path modified on both sides
pub const BOTH_MODIFIED: &str = "UU";

/// Value of the `merge` attribute for a path, as reported by `git check-attr`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MergeAttr {
    /// Attribute not mentioned for the path
    #[default]
    Unspecified,
    /// Attribute set (`merge`)
    Set,
    /// Attribute unset (`-merge`)
    Unset,
    /// Attribute set to a value (`merge=ours`)
    Value(String),
}

impl MergeAttr {
    /// Parse the info field of `git check-attr` output
    pub fn parse(info: &str) -> Self {
        match info {
            "unspecified" => Self::Unspecified,
            "set" => Self::Set,
            "unset" => Self::Unset,
            other => Self::Value(other.to_string()),
        }
    }

    /// Whether the path should keep the local side (`merge=ours`)
    pub fn is_ours(&self) -> bool {
        matches!(self, Self::Value(v) if v == "ours")
    }
}

impl std::fmt::Display for MergeAttr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unspecified => write!(f, "unspecified"),
            Self::Set => write!(f, "set"),
            Self::Unset => write!(f, "unset"),
            Self::Value(v) => write!(f, "{v}"),
        }
    }
}

/// One entry of `git status --porcelain=v1`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitFileStatus {
    /// Short status code (e.g. `UU`, `DU`, `M`)
    pub status: String,
    /// File path; for renames and copies this is `old -> new`
    pub path: String,
    /// The `merge` attribute from `.gitattributes-merge`
    pub merge_attr: MergeAttr,
}

impl GitFileStatus {
    /// Create a status entry with an unspecified merge attribute
    pub fn new(status: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            path: path.into(),
            merge_attr: MergeAttr::Unspecified,
        }
    }

    /// Whether this entry describes an unmerged path
    pub fn is_conflict(&self) -> bool {
        CONFLICT_CODES.contains(&self.status.as_str())
    }

    /// Deleted locally, modified upstream
    pub fn is_deleted_by_us(&self) -> bool {
        self.status == DELETED_BY_US
    }

    /// Modified on both sides and declared `merge=ours`
    pub fn is_merge_ours(&self) -> bool {
        self.status == BOTH_MODIFIED && self.merge_attr.is_ours()
    }
}

/// Owner of the head repository of a pull request (gh JSON)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryOwner {
    /// Owner login
    pub login: String,
}

/// Author of a pull request (gh JSON)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrAuthor {
    /// Author login
    pub login: String,
}

/// A pull request as listed by `gh pr list --json ...`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    /// PR number
    pub number: u64,
    /// Web URL for the PR
    pub url: String,
    /// PR author
    pub author: Option<PrAuthor>,
    /// Head branch name
    pub head_ref_name: String,
    /// Owner of the head repository (absent if the fork was deleted)
    pub head_repository_owner: Option<RepositoryOwner>,
}

/// Parameters for `gh pr create`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPullRequest {
    /// Base branch
    pub base: String,
    /// PR title
    pub title: String,
    /// Head in `owner:branch` form
    pub head: String,
    /// Labels to apply
    pub labels: Vec<String>,
    /// Assignee login
    pub assignee: Option<String>,
    /// Reviewer logins
    pub reviewers: Vec<String>,
}

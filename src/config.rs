//! Task configuration read from `dlproject.yaml`
//!
//! Each task owns one top-level key. Keys that are missing or empty mean
//! "all defaults"; unknown keys and mistyped values are errors.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Project configuration file name at the repository root
pub const DLPROJECT_FILE: &str = "dlproject.yaml";

/// Default host for the fork and the pull requests
const DEFAULT_HOST: &str = "octocat.dlogics.com";

/// Default organization owning the fork
const DEFAULT_ORGANIZATION: &str = "datalogics";

/// A configuration section stored under [`ProjectConfig::YAML_KEY`]
pub trait ProjectConfig: Serialize + DeserializeOwned + Default {
    /// Key for this configuration in `dlproject.yaml`
    const YAML_KEY: &'static str;

    /// Parse this section from the text of a `dlproject.yaml`
    fn from_yaml_str(text: &str) -> Result<Self> {
        let document: serde_yaml::Value = serde_yaml::from_str(text).map_err(|e| {
            Error::Config(format!(
                "Error reading {} from {DLPROJECT_FILE}: {e}",
                Self::YAML_KEY
            ))
        })?;
        let section = match document {
            serde_yaml::Value::Null => None,
            serde_yaml::Value::Mapping(mut map) => map.remove(Self::YAML_KEY),
            _ => {
                return Err(Error::Config(format!(
                    "Error reading {} from {DLPROJECT_FILE}: top level is not a mapping",
                    Self::YAML_KEY
                )));
            }
        };
        match section {
            None | Some(serde_yaml::Value::Null) => Ok(Self::default()),
            Some(value) => serde_yaml::from_value(value).map_err(|e| {
                Error::Config(format!(
                    "Error reading {} from {DLPROJECT_FILE}: {e}",
                    Self::YAML_KEY
                ))
            }),
        }
    }

    /// Load this section from `<root>/dlproject.yaml`
    fn load(root: &Path) -> Result<Self> {
        let path = root.join(DLPROJECT_FILE);
        debug!(path = %path.display(), key = Self::YAML_KEY, "loading configuration");
        let text = fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_yaml_str(&text)
    }

    /// YAML for this section, keyed by [`ProjectConfig::YAML_KEY`], in field order
    fn to_yaml(&self) -> Result<String> {
        let mut map = serde_yaml::Mapping::new();
        map.insert(
            serde_yaml::Value::String(Self::YAML_KEY.to_string()),
            serde_yaml::to_value(self)?,
        );
        Ok(serde_yaml::to_string(&map)?)
    }
}

/// URL of the `conan-center-index` repository owned by `owner` on `host`
fn cci_repo_url(host: &str, owner: &str) -> String {
    format!("git@{host}:{owner}/conan-center-index.git")
}

/// Name of the current user, used as the default fork owner
pub fn current_user() -> String {
    ["USER", "USERNAME", "LOGNAME"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Where Conan Center Index lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConanCenterIndexConfig {
    /// URL for the Conan Center Index
    pub url: String,
    /// Branch to fetch from
    pub branch: String,
}

impl Default for ConanCenterIndexConfig {
    fn default() -> Self {
        Self {
            url: "git@github.com:conan-io/conan-center-index.git".to_string(),
            branch: "master".to_string(),
        }
    }
}

/// The fork that Conan Center Index is merged into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpstreamConfig {
    /// Git host of the fork
    pub host: String,
    /// Organization owning the fork
    pub organization: String,
    /// Branch that Conan Center Index is merged to
    pub branch: String,
    /// Name of the temporary remote created for the merge
    pub remote_name: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            organization: DEFAULT_ORGANIZATION.to_string(),
            branch: "develop".to_string(),
            remote_name: "merge-upstream-remote".to_string(),
        }
    }
}

impl UpstreamConfig {
    /// URL for the fork's git repository
    pub fn url(&self) -> String {
        cci_repo_url(&self.host, &self.organization)
    }

    /// `host/org/conan-center-index`, as `gh --repo` expects
    pub fn gh_repo(&self) -> String {
        format!("{}/{}/conan-center-index", self.host, self.organization)
    }

    /// The fork branch as seen through the temporary remote
    pub fn remote_branch(&self) -> String {
        format!("{}/{}", self.remote_name, self.branch)
    }
}

/// Parameters of the pull request opened on conflicts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PullRequestConfig {
    /// Host for the pull request
    pub host: String,
    /// Owner of the fork the head branch is pushed to
    pub fork: String,
    /// Name of the head branch to create
    pub merge_branch_name: String,
    /// Users to request reviews from
    pub reviewers: Vec<String>,
    /// User to assign
    pub assignee: Option<String>,
    /// Labels to place on the pull request
    pub labels: Vec<String>,
}

impl Default for PullRequestConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            fork: current_user(),
            merge_branch_name: "merge-from-conan-io".to_string(),
            reviewers: Vec::new(),
            assignee: None,
            labels: vec!["from-conan-io".to_string()],
        }
    }
}

impl PullRequestConfig {
    /// URL to push the head branch to
    pub fn url(&self) -> String {
        cci_repo_url(&self.host, &self.fork)
    }
}

/// Configuration for the merge-upstream task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeUpstreamConfig {
    /// Conan Center Index
    pub cci: ConanCenterIndexConfig,
    /// The fork being merged into
    pub upstream: UpstreamConfig,
    /// The pull request opened on conflicts
    pub pull_request: PullRequestConfig,
}

impl ProjectConfig for MergeUpstreamConfig {
    const YAML_KEY: &'static str = "merge_upstream";
}

/// Configuration for the merge-staging-to-production task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeStagingToProductionConfig {
    /// Git host of the fork
    pub host: String,
    /// Organization owning the fork
    pub organization: String,
    /// Name of the staging branch
    pub staging_branch: String,
    /// Name of the production branch
    pub production_branch: String,
}

impl Default for MergeStagingToProductionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            organization: DEFAULT_ORGANIZATION.to_string(),
            staging_branch: "develop".to_string(),
            production_branch: "master".to_string(),
        }
    }
}

impl MergeStagingToProductionConfig {
    /// URL for the fork's git repository
    pub fn url(&self) -> String {
        cci_repo_url(&self.host, &self.organization)
    }
}

impl ProjectConfig for MergeStagingToProductionConfig {
    const YAML_KEY: &'static str = "merge_staging_to_production";
}

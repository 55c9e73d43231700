//! Recipe export and upload
//!
//! Two phases:
//! 1. Select - work out which recipes changed (git queries, pure helpers)
//! 2. Upload - export every version of each recipe and upload it, optionally
//!    in parallel with the first failure cancelling the uploads not yet started

use crate::error::{Error, Result};
use crate::runner::TaskContext;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

/// Directory holding one subdirectory per recipe
pub const RECIPES_DIR: &str = "recipes";

/// Remote uploaded to when none is given
pub const DEFAULT_REMOTE: &str = "conan-center-dl-staging";

/// How far back `since_merge_from_branch` looks by default
pub const DEFAULT_MERGES: usize = 2;

/// Which recipes to upload; the sources are combined
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSelection {
    /// Recipes named explicitly
    pub packages: Vec<String>,
    /// Every entry of `recipes/`
    pub all: bool,
    /// Recipes changed since this commit
    pub since_commit: Option<String>,
    /// Recipes changed since just before the most recent merge
    pub since_before_last_merge: bool,
    /// Recipes changed since a merge from this branch
    pub since_merge_from_branch: Option<String>,
    /// Which merge from the branch to count back to
    pub merges: usize,
}

impl Default for PackageSelection {
    fn default() -> Self {
        Self {
            packages: Vec::new(),
            all: false,
            since_commit: None,
            since_before_last_merge: false,
            since_merge_from_branch: None,
            merges: DEFAULT_MERGES,
        }
    }
}

/// Resolve a selection to a sorted, deduplicated set of recipe names
pub async fn select_packages(
    ctx: &TaskContext,
    selection: &PackageSelection,
) -> Result<BTreeSet<String>> {
    let mut packages: BTreeSet<String> = selection.packages.iter().cloned().collect();

    if selection.all {
        for entry in fs::read_dir(ctx.path(RECIPES_DIR))? {
            packages.insert(entry?.file_name().to_string_lossy().into_owned());
        }
    }

    if let Some(commit) = &selection.since_commit {
        packages.extend(changed_since(ctx, commit).await?);
    }

    if selection.since_before_last_merge {
        let merge = ctx.git().last_merge_commit().await?.ok_or_else(|| {
            Error::PackageSelection("no merge commit found in the history of HEAD".into())
        })?;
        // first parent of the merge
        packages.extend(changed_since(ctx, &format!("{merge}~1")).await?);
    }

    if let Some(branch) = &selection.since_merge_from_branch {
        let git = ctx.git();
        let branch_revs: HashSet<String> = git.rev_list(branch).await?.into_iter().collect();
        let merge_log = git.merge_log().await?;
        let merge = find_merge_from_branch(&merge_log, &branch_revs, selection.merges)
            .ok_or_else(|| {
                Error::PackageSelection(format!(
                    "could not find {} merge(s) from {branch}",
                    selection.merges
                ))
            })?;
        debug!(%branch, %merge, "found merge from branch");
        packages.extend(changed_since(ctx, &merge).await?);
    }

    Ok(packages)
}

async fn changed_since(ctx: &TaskContext, commit: &str) -> Result<BTreeSet<String>> {
    let lines = ctx.git().diff_name_only(commit, RECIPES_DIR).await?;
    Ok(packages_from_diff(&lines, |path| ctx.path(path).exists()))
}

/// Recipe names from `git diff --name-only` lines.
///
/// Only files that still exist count, so deleted recipes are not uploaded.
pub fn packages_from_diff(
    lines: &[String],
    exists: impl Fn(&str) -> bool,
) -> BTreeSet<String> {
    lines
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && exists(line))
        .filter_map(|line| line.split('/').nth(1))
        .map(String::from)
        .collect()
}

/// Find the `merges`-th merge (newest first) with a parent on the branch.
///
/// `merge_log` lines are `<merge> <parent>...` as printed by
/// `git log --min-parents=2 --pretty='%H %P'`.
pub fn find_merge_from_branch(
    merge_log: &[String],
    branch_revs: &HashSet<String>,
    merges: usize,
) -> Option<String> {
    let mut seen = 0;
    for line in merge_log {
        let mut refs = line.split_whitespace();
        let Some(merge) = refs.next() else {
            continue;
        };
        if refs.any(|parent| branch_revs.contains(parent)) {
            seen += 1;
        }
        if seen == merges {
            return Some(merge.to_string());
        }
    }
    None
}

/// One exportable version of a recipe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeVersion {
    /// Version string
    pub version: String,
    /// Recipe folder relative to the repository root
    pub folder: PathBuf,
}

#[derive(Debug, Deserialize)]
struct RecipeConfig {
    versions: BTreeMap<String, VersionEntry>,
}

#[derive(Debug, Deserialize)]
struct VersionEntry {
    folder: String,
}

/// Versions of a recipe and the folders they are built from.
///
/// Uses `config.yml` when present; otherwise every non-hidden subdirectory
/// is a version of the same name.
pub fn recipe_versions(root: &Path, package: &str) -> Result<Vec<RecipeVersion>> {
    let recipe_folder = Path::new(RECIPES_DIR).join(package);
    let config_yml = root.join(&recipe_folder).join("config.yml");

    if config_yml.exists() {
        let config: RecipeConfig = serde_yaml::from_str(&fs::read_to_string(&config_yml)?)?;
        return Ok(config
            .versions
            .into_iter()
            .map(|(version, entry)| RecipeVersion {
                version,
                folder: recipe_folder.join(entry.folder),
            })
            .collect());
    }

    let mut versions = Vec::new();
    for entry in fs::read_dir(root.join(&recipe_folder))? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || !entry.file_type()?.is_dir() {
            continue;
        }
        versions.push(RecipeVersion {
            folder: recipe_folder.join(&name),
            version: name,
        });
    }
    versions.sort_by(|a, b| a.version.cmp(&b.version));
    Ok(versions)
}

/// Export every version of one recipe, then upload it if asked
pub async fn upload_one_package(
    ctx: &TaskContext,
    package: &str,
    remote: &str,
    upload: bool,
) -> Result<()> {
    let conan = ctx.conan();
    conan.remove(package).await?;
    for version in recipe_versions(&ctx.root, package)? {
        let folder = version.folder.to_string_lossy();
        conan
            .export(&folder, &format!("{package}/{}@", version.version))
            .await?;
    }
    if upload {
        conan.upload(remote, package).await?;
    }
    Ok(())
}

/// Job count used when none is given: like a default thread pool
pub fn default_jobs() -> usize {
    let cpus = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
    (cpus + 4).min(32)
}

/// How to run the uploads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    /// Remote to upload to
    pub remote: String,
    /// Upload after exporting (otherwise only export)
    pub upload: bool,
    /// Run packages concurrently
    pub parallel: bool,
    /// Concurrent uploads in parallel mode
    pub jobs: usize,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            remote: DEFAULT_REMOTE.to_string(),
            upload: true,
            parallel: true,
            jobs: default_jobs(),
        }
    }
}

/// Notifications about individual packages
pub trait UploadProgress: Send + Sync {
    /// A package started exporting
    fn on_start(&self, _package: &str) {}
    /// A package finished, successfully or not
    fn on_finish(&self, _package: &str, _ok: bool) {}
    /// A package was skipped after an earlier failure
    fn on_skip(&self, _package: &str) {}
}

/// Progress sink that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl UploadProgress for NoProgress {}

/// Export (and upload) each package; the first failure is returned.
///
/// In parallel mode at most `jobs` packages run at once. After a failure,
/// packages that have not started are skipped; running ones are awaited.
pub async fn upload_packages(
    ctx: &TaskContext,
    packages: &[String],
    options: &UploadOptions,
    progress: Arc<dyn UploadProgress>,
) -> Result<()> {
    info!(count = packages.len(), remote = %options.remote, "uploading recipes");
    if !options.parallel {
        for package in packages {
            progress.on_start(package);
            let result = upload_one_package(ctx, package, &options.remote, options.upload).await;
            progress.on_finish(package, result.is_ok());
            result.map_err(|e| upload_error(package, e))?;
        }
        return Ok(());
    }

    let semaphore = Arc::new(Semaphore::new(options.jobs.max(1)));
    let cancelled = Arc::new(AtomicBool::new(false));
    let mut tasks = JoinSet::new();

    for package in packages {
        let ctx = ctx.clone();
        let package = package.clone();
        let options = options.clone();
        let semaphore = Arc::clone(&semaphore);
        let cancelled = Arc::clone(&cancelled);
        let progress = Arc::clone(&progress);

        tasks.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => return Err(Error::Internal(format!("upload semaphore closed: {e}"))),
            };
            if cancelled.load(Ordering::SeqCst) {
                progress.on_skip(&package);
                return Ok(());
            }
            progress.on_start(&package);
            let result = upload_one_package(&ctx, &package, &options.remote, options.upload).await;
            progress.on_finish(&package, result.is_ok());
            result.map_err(|e| {
                cancelled.store(true, Ordering::SeqCst);
                upload_error(&package, e)
            })
        });
    }

    let mut first_error = None;
    while let Some(joined) = tasks.join_next().await {
        let result = joined
            .map_err(|e| Error::Internal(format!("upload task failed: {e}")))
            .and_then(|r| r);
        if let Err(e) = result {
            cancelled.store(true, Ordering::SeqCst);
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

fn upload_error(package: &str, source: Error) -> Error {
    Error::Upload {
        package: package.to_string(),
        source: Box::new(source),
    }
}

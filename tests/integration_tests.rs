//! Integration tests for cci-tasks

#![allow(deprecated)] // cargo_bin is the standard way to test CLI binaries

mod common;

use assert_cmd::Command;
use cci_tasks::config::MergeStagingToProductionConfig;
use cci_tasks::error::Error;
use cci_tasks::merge::{
    DELETED_BY_US_MESSAGE, MERGE_OURS_MESSAGE, MERGE_STAGING_TO_PRODUCTION_STATUS,
    MERGE_UPSTREAM_STATUS, merge_staging_to_production, merge_upstream,
};
use cci_tasks::types::MergeStatus;
use cci_tasks::upload::{NoProgress, UploadOptions, UploadProgress, upload_packages};
use common::{MockRunner, TempRepo, script_merge_upstream_prelude, upstream_config};
use predicates::prelude::*;
use std::sync::{Arc, Mutex};

/// Merge with the ours driver enabled, as issued by merge-upstream
const ATTRIBUTE_MERGE: &str =
    "git -c core.attributesFile=.gitattributes-merge -c merge.ours.driver=true";

/// Rendered `git status` used to list conflicts
const STATUS: &str = "git status --porcelain=v1";

const FORK_COUNT: &str = "git rev-list merge-upstream-remote/develop..HEAD --count";

// =============================================================================
// CLI Tests
// =============================================================================

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("cci-tasks").unwrap();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Conan Center Index"))
        .stdout(predicate::str::contains("merge-upstream"))
        .stdout(predicate::str::contains("upload-recipes"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("cci-tasks").unwrap();
    cmd.arg("--version");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_upload_help() {
    let mut cmd = Command::cargo_bin("cci-tasks").unwrap();
    cmd.args(["upload-recipes", "--help"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--since-merge-from-branch"))
        .stdout(predicate::str::contains("--no-parallel"));
}

#[test]
fn test_triplet_parse() {
    let mut cmd = Command::cargo_bin("cci-tasks").unwrap();
    cmd.args(["triplet", "parse", "x86_64-pc-linux-gnu"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("x86_64-pc-linux-gnu"))
        .stdout(predicate::str::contains("vendor:  pc"))
        .stdout(predicate::str::contains("os:   Linux"));
}

#[test]
fn test_triplet_parse_invalid() {
    let mut cmd = Command::cargo_bin("cci-tasks").unwrap();
    cmd.args(["triplet", "parse", "x86_64"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("wrong number of GNU triplet components"));
}

#[test]
fn test_triplet_from_settings() {
    let mut cmd = Command::cargo_bin("cci-tasks").unwrap();
    cmd.args(["triplet", "from-settings", "--arch", "armv7", "--os", "baremetal"]);
    cmd.assert().success().stdout("arm-none-eabi\n");

    let mut cmd = Command::cargo_bin("cci-tasks").unwrap();
    cmd.args([
        "triplet",
        "from-settings",
        "--arch",
        "armv8",
        "--os",
        "Android",
        "--api-level",
        "24",
    ]);
    cmd.assert().success().stdout("aarch64-linux-android24\n");
}

#[test]
fn test_triplet_check() {
    let mut cmd = Command::cargo_bin("cci-tasks").unwrap();
    cmd.args(["triplet", "check", "--arch", "x86", "--os", "Linux", "i486-linux"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("is compatible"));

    let mut cmd = Command::cargo_bin("cci-tasks").unwrap();
    cmd.args(["triplet", "check", "--arch", "armv7hf", "--os", "Linux", "arm-linux-gnueabi"]);
    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("is not compatible"));
}

#[test]
fn test_invalid_path_fails() {
    let mut cmd = Command::cargo_bin("cci-tasks").unwrap();
    cmd.args(["--path", "/nonexistent/cci-tasks-repo", "merge-upstream"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_bad_config_fails() {
    let repo = TempRepo::new();
    repo.write("dlproject.yaml", "merge_staging_to_production:\n  unknown: 1\n");

    let mut cmd = Command::cargo_bin("cci-tasks").unwrap();
    cmd.arg("--path")
        .arg(repo.root())
        .arg("merge-staging-to-production");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains(
            "Error reading merge_staging_to_production from dlproject.yaml",
        ));
}

// =============================================================================
// merge-upstream
// =============================================================================

fn assert_checkout_restored(runner: &MockRunner) {
    assert!(runner.was_called("git remote remove merge-upstream-remote"));
    assert!(runner.was_called("git checkout --quiet --force develop"));
    assert!(runner.was_called("git reset --hard abc123"));
}

#[tokio::test]
async fn test_merge_upstream_merged() {
    let repo = TempRepo::new();
    script_merge_upstream_prelude(&repo.runner);
    repo.runner.on(FORK_COUNT, "3\n");

    let status = merge_upstream(&repo.ctx(), &upstream_config()).await.unwrap();

    assert_eq!(status, MergeStatus::Merged);
    assert_eq!(repo.read(MERGE_UPSTREAM_STATUS).as_deref(), Some("MERGED"));
    let runner = &repo.runner;
    assert!(runner.was_called(
        "git remote add merge-upstream-remote git@octocat.dlogics.com:datalogics/conan-center-index.git"
    ));
    assert!(runner.was_called("git remote update merge-upstream-remote"));
    assert!(runner.was_called("git checkout --quiet --detach merge-upstream-remote/develop"));
    assert!(runner.was_called(
        "git fetch git@github.com:conan-io/conan-center-index.git master"
    ));
    assert!(runner.was_called(ATTRIBUTE_MERGE));
    assert!(runner.was_called("git push merge-upstream-remote HEAD:refs/heads/develop"));
    assert!(!runner.was_called("gh pr"));
    assert_checkout_restored(runner);

    // cleanup comes after the push
    assert!(runner.position("git push").unwrap() < runner.position("git checkout --quiet --force").unwrap());
}

#[tokio::test]
async fn test_merge_upstream_up_to_date() {
    let repo = TempRepo::new();
    script_merge_upstream_prelude(&repo.runner);
    repo.runner.on(FORK_COUNT, "0\n");

    let status = merge_upstream(&repo.ctx(), &upstream_config()).await.unwrap();

    assert_eq!(status, MergeStatus::UpToDate);
    assert_eq!(repo.read(MERGE_UPSTREAM_STATUS).as_deref(), Some("UP_TO_DATE"));
    assert!(!repo.runner.was_called("git push"));
    assert_checkout_restored(&repo.runner);
}

#[tokio::test]
async fn test_merge_upstream_existing_remote_is_repointed() {
    let repo = TempRepo::new();
    repo.runner
        .on("git remote get-url merge-upstream-remote", "git@elsewhere:x/y.git\n")
        .on(FORK_COUNT, "0\n");
    script_merge_upstream_prelude(&repo.runner);

    merge_upstream(&repo.ctx(), &upstream_config()).await.unwrap();

    assert!(repo.runner.was_called("git remote set-url merge-upstream-remote"));
    assert!(!repo.runner.was_called("git remote add"));
}

#[tokio::test]
async fn test_merge_upstream_resolves_deleted_by_us() {
    let repo = TempRepo::new();
    script_merge_upstream_prelude(&repo.runner);
    repo.runner
        .fail(ATTRIBUTE_MERGE, 1, "CONFLICT (modify/delete)")
        .on(STATUS, "DU recipes/gone/all/conanfile.py\n")
        .on(STATUS, "")
        .on(FORK_COUNT, "1\n");

    let status = merge_upstream(&repo.ctx(), &upstream_config()).await.unwrap();

    assert_eq!(status, MergeStatus::Merged);
    let runner = &repo.runner;
    assert!(runner.was_called("git rm recipes/gone/all/conanfile.py"));
    assert!(runner.was_called("git commit --no-edit --no-verify"));
    assert!(runner.was_called("git push merge-upstream-remote HEAD:refs/heads/develop"));
    assert!(!runner.was_called("git merge --abort"));
    assert!(!runner.was_called("gh pr"));
    assert_checkout_restored(runner);
}

/// Script a merge whose conflicts need a pull request
fn script_unresolvable_conflicts(runner: &MockRunner) {
    script_merge_upstream_prelude(runner);
    runner
        .fail(ATTRIBUTE_MERGE, 1, "CONFLICT (content)")
        // attribute merge: the ours driver already settled the workflow file
        .on(STATUS, "UU recipes/zlib/all/conanfile.py\nDU recipes/gone/all/conanfile.py\n")
        .on(STATUS, "UU recipes/zlib/all/conanfile.py\n")
        // plain merge lists everything
        .on(
            STATUS,
            "UU recipes/zlib/all/conanfile.py\nUU .github/workflows/ci.yml\nDU recipes/gone/all/conanfile.py\n",
        )
        .on(
            "git -c core.attributesFile=.gitattributes-merge check-attr",
            "recipes/zlib/all/conanfile.py\0merge\0unspecified\0.github/workflows/ci.yml\0merge\0ours\0",
        );
}

#[tokio::test]
async fn test_merge_upstream_opens_pull_request() {
    let repo = TempRepo::new();
    script_unresolvable_conflicts(&repo.runner);
    repo.runner
        .on(
            "git log --no-color --no-merges --merge HEAD..MERGE_HEAD",
            "1234abc - Bump zlib (2 days ago) <Upstream Dev>",
        )
        .on("gh pr list", "[]");

    let status = merge_upstream(&repo.ctx(), &upstream_config()).await.unwrap();

    assert_eq!(status, MergeStatus::PullRequest);
    assert_eq!(repo.read(MERGE_UPSTREAM_STATUS).as_deref(), Some("PULL_REQUEST"));

    let runner = &repo.runner;
    assert!(runner.was_called("git -c rerere.enabled=false merge --no-commit --no-ff FETCH_HEAD"));
    assert!(runner.was_called(
        "git -c core.attributesFile=.gitattributes-merge check-attr merge -z -- recipes/zlib/all/conanfile.py .github/workflows/ci.yml"
    ));
    // body queries only look at the unresolvable file
    assert!(runner.was_called(
        "git diff --no-color -U HEAD...MERGE_HEAD -- recipes/zlib/all/conanfile.py"
    ));

    // the branch for the pull request starts at upstream after the merge is aborted
    let abort = runner.position("git merge --abort").unwrap();
    let detach = runner
        .position("git checkout --quiet --detach FETCH_HEAD")
        .unwrap();
    assert!(abort < detach);

    assert!(runner.was_called(&format!("git commit --no-verify -m {DELETED_BY_US_MESSAGE}")));
    assert!(runner.was_called(
        "git checkout merge-upstream-remote/develop -- .github/workflows/ci.yml"
    ));
    assert!(runner.was_called(&format!("git commit --no-verify -m {MERGE_OURS_MESSAGE}")));
    assert!(runner.was_called(
        "git push --force git@octocat.dlogics.com:jdoe/conan-center-index.git HEAD:refs/heads/merge-from-conan-io"
    ));
    assert!(!runner.was_called("git push merge-upstream-remote"));

    let create = runner.calls_matching("gh pr create");
    assert_eq!(create.len(), 1);
    let create = &create[0];
    assert!(create.contains("--repo octocat.dlogics.com/datalogics/conan-center-index"));
    assert!(create.contains("--base develop"));
    assert!(create.contains("--title Merge in changes from conan-io/master"));
    assert!(create.contains("--head jdoe:merge-from-conan-io"));
    assert!(create.contains("--label from-conan-io"));
    assert!(!create.contains("--reviewer"));
    assert!(!runner.was_called("gh pr edit"));

    assert_checkout_restored(runner);
}

#[tokio::test]
async fn test_merge_upstream_updates_existing_pull_request() {
    let repo = TempRepo::new();
    script_unresolvable_conflicts(&repo.runner);
    repo.runner.on(
        "gh pr list",
        r#"[
            {"number": 7, "url": "https://octocat.dlogics.com/datalogics/conan-center-index/pull/7",
             "author": {"login": "someone"}, "headRefName": "feature",
             "headRepositoryOwner": {"login": "someone"}},
            {"number": 9, "url": "https://octocat.dlogics.com/datalogics/conan-center-index/pull/9",
             "author": {"login": "jdoe"}, "headRefName": "merge-from-conan-io",
             "headRepositoryOwner": {"login": "jdoe"}}
        ]"#,
    );

    let status = merge_upstream(&repo.ctx(), &upstream_config()).await.unwrap();

    assert_eq!(status, MergeStatus::PullRequest);
    let edits = repo.runner.calls_matching("gh pr edit");
    assert_eq!(edits.len(), 1);
    assert!(edits[0].contains("conan-center-index/pull/9 --body-file"));
    assert!(!repo.runner.was_called("gh pr create"));
}

#[tokio::test]
async fn test_merge_upstream_updates_first_of_several_pull_requests() {
    let repo = TempRepo::new();
    script_unresolvable_conflicts(&repo.runner);
    repo.runner.on(
        "gh pr list",
        r#"[
            {"number": 9, "url": "https://octocat.dlogics.com/datalogics/conan-center-index/pull/9",
             "author": {"login": "jdoe"}, "headRefName": "merge-from-conan-io",
             "headRepositoryOwner": {"login": "jdoe"}},
            {"number": 11, "url": "https://octocat.dlogics.com/datalogics/conan-center-index/pull/11",
             "author": {"login": "jdoe"}, "headRefName": "merge-from-conan-io",
             "headRepositoryOwner": {"login": "jdoe"}}
        ]"#,
    );

    let status = merge_upstream(&repo.ctx(), &upstream_config()).await.unwrap();

    assert_eq!(status, MergeStatus::PullRequest);
    let edits = repo.runner.calls_matching("gh pr edit");
    assert_eq!(edits.len(), 1);
    assert!(edits[0].contains("conan-center-index/pull/9 --body-file"));
    assert!(!edits[0].contains("pull/11"));
    assert!(!repo.runner.was_called("gh pr create"));
}

#[tokio::test]
async fn test_merge_upstream_aborts_merge_when_pr_body_fails() {
    let repo = TempRepo::new();
    script_unresolvable_conflicts(&repo.runner);
    repo.runner.fail(
        "git log --no-color --no-merges --merge HEAD..MERGE_HEAD",
        128,
        "fatal: MERGE_HEAD unreadable",
    );

    let err = merge_upstream(&repo.ctx(), &upstream_config())
        .await
        .unwrap_err();

    assert!(
        matches!(err, Error::CommandFailed { ref command, .. } if command.starts_with("git log")),
        "got {err:?}"
    );
    let runner = &repo.runner;
    // once after listing conflicts, once after forming the body
    assert_eq!(runner.calls_matching("git merge --abort").len(), 2);
    assert!(!runner.was_called("git checkout --quiet --detach FETCH_HEAD"));
    assert!(!runner.was_called("gh pr"));
    assert!(repo.read(MERGE_UPSTREAM_STATUS).is_none());
    assert_checkout_restored(runner);
}

#[tokio::test]
async fn test_merge_upstream_other_merge_failure() {
    let repo = TempRepo::new();
    repo.write(MERGE_UPSTREAM_STATUS, "MERGED");
    script_merge_upstream_prelude(&repo.runner);
    repo.runner
        .fail(ATTRIBUTE_MERGE, 128, "fatal: refusing to merge unrelated histories")
        .on(STATUS, "");

    let err = merge_upstream(&repo.ctx(), &upstream_config())
        .await
        .unwrap_err();

    match err {
        Error::CommandFailed { code, stderr, .. } => {
            assert_eq!(code, Some(128));
            assert!(stderr.contains("unrelated histories"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(repo.read(MERGE_UPSTREAM_STATUS), None);
    assert!(!repo.runner.was_called("git push"));
    assert_checkout_restored(&repo.runner);
}

#[tokio::test]
async fn test_merge_upstream_push_failure_still_restores() {
    let repo = TempRepo::new();
    script_merge_upstream_prelude(&repo.runner);
    repo.runner
        .on(FORK_COUNT, "2\n")
        .fail("git push", 1, "rejected");

    let err = merge_upstream(&repo.ctx(), &upstream_config())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::CommandFailed { .. }));
    assert_eq!(repo.read(MERGE_UPSTREAM_STATUS), None);
    assert_checkout_restored(&repo.runner);
}

#[tokio::test]
async fn test_merge_upstream_detached_head_restore() {
    let repo = TempRepo::new();
    repo.runner
        .on("git rev-parse --abbrev-ref HEAD", "HEAD\n")
        .on(FORK_COUNT, "0\n");
    script_merge_upstream_prelude(&repo.runner);

    merge_upstream(&repo.ctx(), &upstream_config()).await.unwrap();

    assert!(repo.runner.was_called("git checkout --quiet --detach abc123"));
    assert!(repo.runner.was_called("git reset --hard HEAD"));
    assert!(!repo.runner.was_called("git checkout --quiet --force"));
}

#[tokio::test]
async fn test_merge_upstream_requires_clean_worktree() {
    let repo = TempRepo::new();
    repo.write(MERGE_UPSTREAM_STATUS, "MERGED");
    script_merge_upstream_prelude(&repo.runner);
    repo.runner.fail("git diff-index", 1, "");

    let err = merge_upstream(&repo.ctx(), &upstream_config())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Precondition(ref m) if m.contains("uncommitted changes")));
    // nothing was touched, not even the previous status
    assert_eq!(repo.read(MERGE_UPSTREAM_STATUS).as_deref(), Some("MERGED"));
    assert!(!repo.runner.was_called("git remote add"));
    assert!(!repo.runner.was_called("git rev-parse"));
}

#[tokio::test]
async fn test_merge_upstream_requires_gh() {
    let repo = TempRepo::new();
    repo.runner.not_found("gh --version");

    let err = merge_upstream(&repo.ctx(), &upstream_config())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Precondition(ref m) if m.contains("GitHub CLI")));
    assert!(!repo.runner.was_called("gh auth"));
}

#[tokio::test]
async fn test_merge_upstream_requires_gh_login() {
    let repo = TempRepo::new();
    repo.runner
        .on("gh --version", "gh version 2.40.0\n")
        .fail("gh auth status", 1, "You are not logged into any GitHub hosts");

    let err = merge_upstream(&repo.ctx(), &upstream_config())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Precondition(ref m) if m.contains("octocat.dlogics.com")));
}

// =============================================================================
// merge-staging-to-production
// =============================================================================

const STAGING_URL: &str = "git@octocat.dlogics.com:datalogics/conan-center-index.git";

fn script_checkout(runner: &MockRunner) {
    runner
        .on("git rev-parse --abbrev-ref HEAD", "develop\n")
        .on("git rev-parse HEAD", "abc123\n");
}

#[tokio::test]
async fn test_staging_up_to_date() {
    let repo = TempRepo::new();
    script_checkout(&repo.runner);
    repo.runner.on("git rev-list HEAD..FETCH_HEAD --count", "0\n");

    let status = merge_staging_to_production(&repo.ctx(), &MergeStagingToProductionConfig::default())
        .await
        .unwrap();

    assert_eq!(status, MergeStatus::UpToDate);
    assert_eq!(
        repo.read(MERGE_STAGING_TO_PRODUCTION_STATUS).as_deref(),
        Some("UP_TO_DATE")
    );
    let runner = &repo.runner;
    assert!(runner.was_called(&format!("git fetch {STAGING_URL} master")));
    assert!(runner.was_called(&format!("git fetch {STAGING_URL} develop")));
    assert!(!runner.was_called("git push"));
    assert!(!runner.was_called("git -c rerere.enabled=false merge"));
    assert!(runner.was_called("git checkout --quiet --force develop"));
}

#[tokio::test]
async fn test_staging_merged() {
    let repo = TempRepo::new();
    script_checkout(&repo.runner);
    repo.runner.on("git rev-list HEAD..FETCH_HEAD --count", "5\n");

    let status = merge_staging_to_production(&repo.ctx(), &MergeStagingToProductionConfig::default())
        .await
        .unwrap();

    assert_eq!(status, MergeStatus::Merged);
    assert_eq!(
        repo.read(MERGE_STAGING_TO_PRODUCTION_STATUS).as_deref(),
        Some("MERGED")
    );
    let runner = &repo.runner;
    // production is fetched and checked out before staging is fetched
    let production = runner.position(&format!("git fetch {STAGING_URL} master")).unwrap();
    let staging = runner.position(&format!("git fetch {STAGING_URL} develop")).unwrap();
    assert!(production < staging);
    assert!(runner.was_called(
        "git -c rerere.enabled=false merge --no-ff --no-edit --no-verify --into-name master FETCH_HEAD"
    ));
    assert!(runner.was_called(&format!("git push {STAGING_URL} HEAD:refs/heads/master")));
    assert!(runner.was_called("git reset --hard abc123"));
}

#[tokio::test]
async fn test_staging_merge_conflict_fails() {
    let repo = TempRepo::new();
    script_checkout(&repo.runner);
    repo.runner
        .on("git rev-list HEAD..FETCH_HEAD --count", "1\n")
        .fail("git -c rerere.enabled=false merge", 1, "CONFLICT (content)");

    let err = merge_staging_to_production(&repo.ctx(), &MergeStagingToProductionConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::CommandFailed { .. }));
    assert_eq!(repo.read(MERGE_STAGING_TO_PRODUCTION_STATUS), None);
    assert!(!repo.runner.was_called("git push"));
    assert!(repo.runner.was_called("git checkout --quiet --force develop"));
}

// =============================================================================
// upload-recipes
// =============================================================================

fn packages(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| (*s).to_string()).collect()
}

fn options(parallel: bool) -> UploadOptions {
    UploadOptions {
        remote: "test-remote".to_string(),
        upload: true,
        parallel,
        jobs: 2,
    }
}

#[tokio::test]
async fn test_upload_exports_every_version() {
    let repo = TempRepo::new();
    repo.add_recipe("zlib", &["1.2.13", "1.3"]);

    upload_packages(&repo.ctx(), &packages(&["zlib"]), &options(false), Arc::new(NoProgress))
        .await
        .unwrap();

    assert_eq!(
        repo.runner.calls(),
        vec![
            "conan remove zlib --force",
            "conan export recipes/zlib/all zlib/1.2.13@",
            "conan export recipes/zlib/all zlib/1.3@",
            "conan upload -r test-remote zlib --force --confirm",
        ]
    );
}

#[tokio::test]
async fn test_upload_export_only() {
    let repo = TempRepo::new();
    repo.add_recipe("zlib", &["1.3"]);
    let options = UploadOptions {
        upload: false,
        ..options(true)
    };

    upload_packages(&repo.ctx(), &packages(&["zlib"]), &options, Arc::new(NoProgress))
        .await
        .unwrap();

    assert!(repo.runner.was_called("conan export"));
    assert!(!repo.runner.was_called("conan upload"));
}

#[tokio::test]
async fn test_upload_sequential_stops_at_first_failure() {
    let repo = TempRepo::new();
    for name in ["a", "b", "c"] {
        repo.add_recipe(name, &["1.0"]);
    }
    repo.runner.fail("conan export recipes/b/all", 1, "ERROR: recipe b is broken");

    let err = upload_packages(
        &repo.ctx(),
        &packages(&["a", "b", "c"]),
        &options(false),
        Arc::new(NoProgress),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::Upload { ref package, .. } if package == "b"));
    assert!(err.to_string().contains("error exporting/uploading b"));
    assert!(repo.runner.was_called("conan upload -r test-remote a"));
    assert!(!repo.runner.was_called("conan upload -r test-remote b"));
    assert!(!repo.runner.was_called("conan remove c"));
}

#[tokio::test]
async fn test_upload_parallel_reports_failing_package() {
    let repo = TempRepo::new();
    for name in ["a", "b", "c", "d"] {
        repo.add_recipe(name, &["1.0"]);
    }
    repo.runner.fail("conan upload -r test-remote c", 1, "ERROR: 403 Forbidden");

    let err = upload_packages(
        &repo.ctx(),
        &packages(&["a", "b", "c", "d"]),
        &options(true),
        Arc::new(NoProgress),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::Upload { ref package, .. } if package == "c"));
}

/// Records which packages started and which were skipped
#[derive(Default)]
struct RecordingProgress {
    started: Mutex<Vec<String>>,
    skipped: Mutex<Vec<String>>,
}

impl UploadProgress for RecordingProgress {
    fn on_start(&self, package: &str) {
        self.started.lock().unwrap().push(package.to_string());
    }

    fn on_skip(&self, package: &str) {
        self.skipped.lock().unwrap().push(package.to_string());
    }
}

#[tokio::test]
async fn test_upload_parallel_skips_unstarted_after_failure() {
    let repo = TempRepo::new();
    for name in ["a", "b", "c", "d"] {
        repo.add_recipe(name, &["1.0"]);
    }
    // whichever package gets the single slot first fails
    repo.runner.fail("conan remove", 1, "ERROR: cache locked");
    let progress = Arc::new(RecordingProgress::default());
    let options = UploadOptions {
        jobs: 1,
        ..options(true)
    };

    let err = upload_packages(
        &repo.ctx(),
        &packages(&["a", "b", "c", "d"]),
        &options,
        progress.clone(),
    )
    .await
    .unwrap_err();

    let Error::Upload { package: failed, .. } = err else {
        panic!("expected an upload error, got {err:?}");
    };
    assert_eq!(repo.runner.calls_matching("conan remove").len(), 1);
    assert!(!repo.runner.was_called("conan export"));
    assert!(!repo.runner.was_called("conan upload"));

    assert_eq!(*progress.started.lock().unwrap(), vec![failed.clone()]);
    let mut skipped = progress.skipped.lock().unwrap().clone();
    skipped.sort();
    let mut expected: Vec<String> = packages(&["a", "b", "c", "d"])
        .into_iter()
        .filter(|p| *p != failed)
        .collect();
    expected.sort();
    assert_eq!(skipped, expected);
}

#[tokio::test]
async fn test_upload_parallel_success() {
    let repo = TempRepo::new();
    for name in ["a", "b", "c"] {
        repo.add_recipe(name, &["1.0"]);
    }

    upload_packages(
        &repo.ctx(),
        &packages(&["a", "b", "c"]),
        &options(true),
        Arc::new(NoProgress),
    )
    .await
    .unwrap();

    assert_eq!(repo.runner.calls_matching("conan upload").len(), 3);
}

// =============================================================================
// conan helpers
// =============================================================================

#[tokio::test]
async fn test_conan_helpers() {
    let repo = TempRepo::new();
    let ctx = repo.ctx();
    let conan = ctx.conan();

    conan
        .config_install("https://example.com/conan-config.git")
        .await
        .unwrap();
    conan.login("conan-center-dl").await.unwrap();
    conan.remove("*").await.unwrap();

    assert_eq!(
        repo.runner.calls(),
        vec![
            "conan config install https://example.com/conan-config.git",
            "conan user --remote conan-center-dl --password",
            "conan remove * --force",
        ]
    );
}

#[tokio::test]
async fn test_conan_login_failure() {
    let repo = TempRepo::new();
    repo.runner
        .fail("conan user", 1, "ERROR: Wrong user or password");

    let err = repo.ctx().conan().login("conan-center-dl").await.unwrap_err();

    match err {
        Error::CommandFailed { command, stderr, .. } => {
            assert_eq!(command, "conan user --remote conan-center-dl --password");
            assert_eq!(stderr, "ERROR: Wrong user or password");
        }
        other => panic!("unexpected error: {other}"),
    }
}

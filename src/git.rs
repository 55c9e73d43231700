//! Git operations over the command runner

use crate::error::{Error, Result};
use crate::merge::conflicts::conflicts;
use crate::runner::{CommandOutput, CommandRunner};
use crate::types::{GitFileStatus, MergeAttr};
use std::collections::HashMap;

/// Attributes file consulted for merge strategies
pub const MERGE_ATTRIBUTES_FILE: &str = ".gitattributes-merge";

/// `git -c` option that stops rerere from reusing recorded resolutions
const DISABLE_RERERE: [&str; 2] = ["-c", "rerere.enabled=false"];

/// Pretty format for the commit listings in pull request bodies
const CONFLICT_LOG_FORMAT: &str = "--pretty=format:%h - %s (%cr) <%an>";

/// Thin facade over the `git` CLI
#[derive(Clone, Copy)]
pub struct Git<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> Git<'a> {
    /// Wrap a runner
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    async fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        self.runner.run("git", args).await
    }

    async fn output(&self, args: &[&str]) -> Result<CommandOutput> {
        self.runner.output("git", args).await
    }

    async fn stdout(&self, args: &[&str]) -> Result<String> {
        Ok(self.run(args).await?.stdout)
    }

    /// Current branch name, or `HEAD` when detached
    pub async fn current_branch(&self) -> Result<String> {
        Ok(self
            .stdout(&["rev-parse", "--abbrev-ref", "HEAD"])
            .await?
            .trim()
            .to_string())
    }

    /// Commit id of HEAD
    pub async fn head_commit(&self) -> Result<String> {
        Ok(self.stdout(&["rev-parse", "HEAD"]).await?.trim().to_string())
    }

    /// Whether the worktree has no uncommitted changes
    pub async fn worktree_is_clean(&self) -> Result<bool> {
        Ok(self
            .output(&["diff-index", "--quiet", "HEAD", "--"])
            .await?
            .success())
    }

    /// URL of a remote, or None if the remote does not exist
    pub async fn remote_url(&self, name: &str) -> Result<Option<String>> {
        let output = self.output(&["remote", "get-url", name]).await?;
        let url = output.stdout.trim();
        if output.success() && !url.is_empty() {
            Ok(Some(url.to_string()))
        } else {
            Ok(None)
        }
    }

    /// Add a remote
    pub async fn add_remote(&self, name: &str, url: &str) -> Result<()> {
        self.run(&["remote", "add", name, url]).await.map(drop)
    }

    /// Change the URL of an existing remote
    pub async fn set_remote_url(&self, name: &str, url: &str) -> Result<()> {
        self.run(&["remote", "set-url", name, url]).await.map(drop)
    }

    /// Fetch a remote
    pub async fn update_remote(&self, name: &str) -> Result<()> {
        self.run(&["remote", "update", name]).await.map(drop)
    }

    /// Remove a remote; returns whether git succeeded
    pub async fn remove_remote(&self, name: &str) -> Result<bool> {
        Ok(self.output(&["remote", "remove", name]).await?.success())
    }

    /// Fetch a single branch from a URL into `FETCH_HEAD`
    pub async fn fetch(&self, url: &str, branch: &str) -> Result<()> {
        self.run(&["fetch", url, branch]).await.map(drop)
    }

    /// Detach HEAD at `rev`
    pub async fn checkout_detach(&self, rev: &str) -> Result<()> {
        self.run(&["checkout", "--quiet", "--detach", rev])
            .await
            .map(drop)
    }

    /// Check out a branch, discarding local changes
    pub async fn checkout_force(&self, branch: &str) -> Result<()> {
        self.run(&["checkout", "--quiet", "--force", branch])
            .await
            .map(drop)
    }

    /// Check out `paths` from `rev` into index and worktree
    pub async fn checkout_paths(&self, rev: &str, paths: &[&str]) -> Result<()> {
        let mut args = vec!["checkout", rev, "--"];
        args.extend_from_slice(paths);
        self.run(&args).await.map(drop)
    }

    /// Hard reset to `rev`
    pub async fn reset_hard(&self, rev: &str) -> Result<()> {
        self.run(&["reset", "--hard", rev]).await.map(drop)
    }

    /// Count the revisions in a commit expression such as `a..b`
    pub async fn count_revs(&self, range: &str) -> Result<u64> {
        let stdout = self.stdout(&["rev-list", range, "--count"]).await?;
        stdout.trim().parse().map_err(|e| {
            Error::Internal(format!(
                "unexpected output from git rev-list --count: {:?} ({e})",
                stdout.trim()
            ))
        })
    }

    /// Merge `FETCH_HEAD` using the `.gitattributes-merge` strategies.
    ///
    /// Paths with `merge=ours` are resolved by a driver that keeps HEAD's
    /// version. `--into-name` makes the message say "into <branch>" rather
    /// than "into HEAD". Returns the raw output; conflicts are not an error.
    pub async fn merge_with_attributes(&self, into_name: &str) -> Result<CommandOutput> {
        let attributes = format!("core.attributesFile={MERGE_ATTRIBUTES_FILE}");
        let mut args = vec!["-c", attributes.as_str(), "-c", "merge.ours.driver=true"];
        args.extend_from_slice(&DISABLE_RERERE);
        args.extend_from_slice(&[
            "merge",
            "--no-ff",
            "--no-edit",
            "--no-verify",
            "--into-name",
            into_name,
            "FETCH_HEAD",
        ]);
        self.output(&args).await
    }

    /// Merge `FETCH_HEAD` without the ours driver and without committing,
    /// so every conflict shows up in the status.
    pub async fn merge_no_commit(&self) -> Result<CommandOutput> {
        let mut args: Vec<&str> = DISABLE_RERERE.to_vec();
        args.extend_from_slice(&["merge", "--no-commit", "--no-ff", "FETCH_HEAD"]);
        self.output(&args).await
    }

    /// Merge `FETCH_HEAD` as `<into_name>`; fails on any conflict
    pub async fn merge_into(&self, into_name: &str) -> Result<()> {
        let mut args: Vec<&str> = DISABLE_RERERE.to_vec();
        args.extend_from_slice(&[
            "merge",
            "--no-ff",
            "--no-edit",
            "--no-verify",
            "--into-name",
            into_name,
            "FETCH_HEAD",
        ]);
        self.run(&args).await.map(drop)
    }

    /// Abort an in-progress merge
    pub async fn merge_abort(&self) -> Result<()> {
        self.run(&["merge", "--abort"]).await.map(drop)
    }

    /// Conclude a merge with the prepared message
    pub async fn commit_no_edit(&self) -> Result<()> {
        self.run(&["commit", "--no-edit", "--no-verify"])
            .await
            .map(drop)
    }

    /// Commit the index with a message
    pub async fn commit_message(&self, message: &str) -> Result<()> {
        self.run(&["commit", "--no-verify", "-m", message])
            .await
            .map(drop)
    }

    /// Remove a path from index and worktree
    pub async fn rm(&self, path: &str) -> Result<()> {
        self.run(&["rm", path]).await.map(drop)
    }

    /// Push `refspec` to a remote name or URL
    pub async fn push(&self, destination: &str, refspec: &str, force: bool) -> Result<()> {
        let mut args = vec!["push"];
        if force {
            args.push("--force");
        }
        args.extend_from_slice(&[destination, refspec]);
        self.run(&args).await.map(drop)
    }

    /// Parsed `git status --porcelain=v1`
    pub async fn status_porcelain(&self) -> Result<Vec<GitFileStatus>> {
        let stdout = self.stdout(&["status", "--porcelain=v1"]).await?;
        Ok(parse_porcelain_status(&stdout))
    }

    /// Unmerged paths in the current status
    pub async fn merge_conflicts(&self) -> Result<Vec<GitFileStatus>> {
        Ok(conflicts(self.status_porcelain().await?))
    }

    /// The `merge` attribute of each path per `.gitattributes-merge`
    pub async fn check_merge_attr(&self, paths: &[&str]) -> Result<HashMap<String, MergeAttr>> {
        if paths.is_empty() {
            return Ok(HashMap::new());
        }
        let attributes = format!("core.attributesFile={MERGE_ATTRIBUTES_FILE}");
        let mut args = vec!["-c", attributes.as_str(), "check-attr", "merge", "-z", "--"];
        args.extend_from_slice(paths);
        let stdout = self.stdout(&args).await?;
        Ok(parse_check_attr(&stdout))
    }

    /// One-line log of the commits in `range` touching `files`, limited to
    /// commits involved in the current merge
    pub async fn log_merge_range(&self, range: &str, files: &[&str]) -> Result<String> {
        let mut args = vec![
            "log",
            "--no-color",
            "--no-merges",
            "--merge",
            range,
            CONFLICT_LOG_FORMAT,
            "--",
        ];
        args.extend_from_slice(files);
        self.stdout(&args).await
    }

    /// Diff for a three-dot range such as `HEAD...MERGE_HEAD`, i.e. the changes on
    /// the right side since the merge base
    pub async fn diff_three_dot(&self, range: &str, files: &[&str]) -> Result<String> {
        let mut args = vec!["diff", "--no-color", "-U", range, "--"];
        args.extend_from_slice(files);
        self.stdout(&args).await
    }

    /// Names of files changed since `since` below `pathspec`
    pub async fn diff_name_only(&self, since: &str, pathspec: &str) -> Result<Vec<String>> {
        let stdout = self
            .stdout(&["diff", "--name-only", since, "--", pathspec])
            .await?;
        Ok(non_empty_lines(&stdout))
    }

    /// All revisions reachable from `rev`
    pub async fn rev_list(&self, rev: &str) -> Result<Vec<String>> {
        Ok(non_empty_lines(&self.stdout(&["rev-list", rev]).await?))
    }

    /// Most recent merge commit reachable from HEAD
    pub async fn last_merge_commit(&self) -> Result<Option<String>> {
        let stdout = self
            .stdout(&["rev-list", "--min-parents=2", "--max-count=1", "HEAD"])
            .await?;
        let commit = stdout.trim();
        Ok((!commit.is_empty()).then(|| commit.to_string()))
    }

    /// `<merge> <parent>...` lines for every merge commit, newest first
    pub async fn merge_log(&self) -> Result<Vec<String>> {
        Ok(non_empty_lines(
            &self
                .stdout(&["log", "--min-parents=2", "--pretty=%H %P"])
                .await?,
        ))
    }
}

fn non_empty_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

/// Parse `git status --porcelain=v1` output.
///
/// Each line is split at the first run of whitespace into status code and
/// path. Leading spaces of the code are dropped, so ` M file` yields `M`.
pub fn parse_porcelain_status(text: &str) -> Vec<GitFileStatus> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim_start();
            let (status, path) = line.split_once(char::is_whitespace)?;
            let path = path.trim_start();
            if path.is_empty() {
                return None;
            }
            Some(GitFileStatus::new(status, path))
        })
        .collect()
}

/// Parse `git check-attr -z` output: NUL-separated `path, attribute, info` triples
pub fn parse_check_attr(text: &str) -> HashMap<String, MergeAttr> {
    let fields: Vec<&str> = text.trim_matches('\0').split('\0').collect();
    fields
        .chunks_exact(3)
        .map(|triple| (triple[0].to_string(), MergeAttr::parse(triple[2])))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_porcelain_conflicts() {
        let text = "UU recipes/zlib/all/conanfile.py\nDU recipes/gone/all/conanfile.py\n M README.md\n?? new file.txt\n";
        let entries = parse_porcelain_status(text);
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].status, "UU");
        assert_eq!(entries[0].path, "recipes/zlib/all/conanfile.py");
        assert!(entries[0].is_conflict());
        assert!(entries[1].is_deleted_by_us());
        assert_eq!(entries[2].status, "M");
        assert!(!entries[2].is_conflict());
        // path keeps inner whitespace
        assert_eq!(entries[3].path, "new file.txt");
    }

    #[test]
    fn test_parse_porcelain_rename_keeps_arrow() {
        let entries = parse_porcelain_status("R  old.txt -> new.txt\n");
        assert_eq!(entries[0].status, "R");
        assert_eq!(entries[0].path, "old.txt -> new.txt");
    }

    #[test]
    fn test_parse_porcelain_empty() {
        assert!(parse_porcelain_status("").is_empty());
        assert!(parse_porcelain_status("\n\n").is_empty());
    }

    #[test]
    fn test_parse_check_attr() {
        let text = "a.txt\0merge\0ours\0b.txt\0merge\0unspecified\0c.txt\0merge\0set\0";
        let attrs = parse_check_attr(text);
        assert_eq!(attrs.len(), 3);
        assert!(attrs["a.txt"].is_ours());
        assert_eq!(attrs["b.txt"], MergeAttr::Unspecified);
        assert_eq!(attrs["c.txt"], MergeAttr::Set);
    }

    #[test]
    fn test_parse_check_attr_empty() {
        assert!(parse_check_attr("").is_empty());
    }
}

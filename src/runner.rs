//! External process execution
//!
//! Every git, gh and conan invocation goes through [`CommandRunner`], so the
//! task logic can be driven by a scripted runner in tests.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tracing::{debug, info};

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code (None if terminated by a signal)
    pub code: Option<i32>,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl CommandOutput {
    /// A successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed output with the given exit code and stderr
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Whether the process exited with status 0
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// Render a command line for logs and error messages
pub fn render_command(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs external commands
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command and capture its output.
    ///
    /// A non-zero exit status is NOT an error here; callers that tolerate
    /// failure inspect [`CommandOutput::success`]. Fails with
    /// [`Error::ProgramNotFound`] if the program does not exist.
    async fn output(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;

    /// Run a command, failing with [`Error::CommandFailed`] on non-zero exit.
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let output = self.output(program, args).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(Error::CommandFailed {
                command: render_command(program, args),
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            })
        }
    }
}

/// Runs commands as child processes in a fixed working directory
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    cwd: PathBuf,
}

impl ProcessRunner {
    /// Create a runner rooted at `cwd`
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn output(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let rendered = render_command(program, args);
        info!("{rendered}");

        // No stdin and piped output: git and gh must not see a terminal,
        // otherwise they add color escapes to output we parse.
        let output = tokio::process::Command::new(program)
            .args(args)
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| match e.kind() {
                // a missing working directory reports NotFound too
                std::io::ErrorKind::NotFound if self.cwd.is_dir() => {
                    Error::ProgramNotFound(program.to_string())
                }
                _ => Error::Io(e),
            })?;

        let result = CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(
            command = %rendered,
            code = ?result.code,
            stdout = %result.stdout.trim_end(),
            "command finished"
        );
        if !result.stderr.is_empty() {
            debug!(command = %rendered, stderr = %result.stderr.trim_end(), "command stderr");
        }
        Ok(result)
    }
}

/// Repository root plus the runner used to operate on it
///
/// Cheap to clone; the runner is shared.
#[derive(Clone)]
pub struct TaskContext {
    /// Root of the repository the tasks operate on
    pub root: PathBuf,
    /// Command runner shared by all facades
    pub runner: Arc<dyn CommandRunner>,
}

impl TaskContext {
    /// Create a context that spawns real processes in `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let runner = Arc::new(ProcessRunner::new(root.clone()));
        Self { root, runner }
    }

    /// Create a context with a custom runner
    pub fn with_runner(root: impl Into<PathBuf>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            root: root.into(),
            runner,
        }
    }

    /// Git facade
    pub fn git(&self) -> crate::git::Git<'_> {
        crate::git::Git::new(self.runner.as_ref())
    }

    /// GitHub CLI facade
    pub fn gh(&self) -> crate::gh::GhCli<'_> {
        crate::gh::GhCli::new(self.runner.as_ref())
    }

    /// Conan CLI facade
    pub fn conan(&self) -> crate::conan::ConanCli<'_> {
        crate::conan::ConanCli::new(self.runner.as_ref())
    }

    /// Resolve a path relative to the repository root
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }
}

impl std::fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskContext")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

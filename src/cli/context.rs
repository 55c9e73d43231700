//! Shared setup for CLI commands

use cci_tasks::config::ProjectConfig;
use cci_tasks::error::Result;
use cci_tasks::runner::TaskContext;
use std::path::{Path, PathBuf};

/// Repository root and the task context operating on it
pub struct CommandContext {
    /// Canonical repository root
    pub root: PathBuf,
    /// Context handed to the library tasks
    pub tasks: TaskContext,
}

impl CommandContext {
    /// Open the repository at `path`; the path must exist
    pub fn new(path: &Path) -> Result<Self> {
        let root = path.canonicalize()?;
        Ok(Self {
            tasks: TaskContext::new(root.clone()),
            root,
        })
    }

    /// Load a task's section of `dlproject.yaml`
    pub fn load_config<C: ProjectConfig>(&self) -> Result<C> {
        C::load(&self.root)
    }
}

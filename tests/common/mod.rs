//! Shared test utilities

#![allow(dead_code)]

pub mod mock_runner;

pub use mock_runner::MockRunner;

use cci_tasks::config::MergeUpstreamConfig;
use cci_tasks::runner::TaskContext;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// A temporary repository root driven by a [`MockRunner`]
pub struct TempRepo {
    pub dir: TempDir,
    pub runner: Arc<MockRunner>,
}

impl TempRepo {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            runner: Arc::new(MockRunner::new()),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn ctx(&self) -> TaskContext {
        TaskContext::with_runner(self.root(), self.runner.clone())
    }

    /// Write a file below the root, creating parent directories
    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.root().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    /// Create a recipe with one `all` folder and a config.yml listing `versions`
    pub fn add_recipe(&self, name: &str, versions: &[&str]) {
        let mut config = String::from("versions:\n");
        for version in versions {
            config.push_str(&format!("  \"{version}\":\n    folder: all\n"));
        }
        self.write(&format!("recipes/{name}/config.yml"), &config);
        self.write(&format!("recipes/{name}/all/conanfile.py"), "# recipe\n");
    }

    pub fn read(&self, relative: &str) -> Option<String> {
        fs::read_to_string(self.root().join(relative)).ok()
    }
}

/// Merge-upstream configuration with a fixed fork owner
pub fn upstream_config() -> MergeUpstreamConfig {
    let mut config = MergeUpstreamConfig::default();
    config.pull_request.fork = "jdoe".to_string();
    config
}

/// Script the commands every merge-upstream run issues before merging
pub fn script_merge_upstream_prelude(runner: &MockRunner) {
    runner
        .on("git rev-parse --abbrev-ref HEAD", "develop\n")
        .on("git rev-parse HEAD", "abc123\n")
        .fail("git remote get-url", 2, "error: No such remote")
        .on("gh --version", "gh version 2.40.0\n");
}

//! Conan CLI operations

use crate::error::Result;
use crate::runner::CommandRunner;

/// Thin facade over the `conan` CLI
#[derive(Clone, Copy)]
pub struct ConanCli<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> ConanCli<'a> {
    /// Wrap a runner
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    /// Remove all local revisions of a recipe from the cache
    pub async fn remove(&self, pattern: &str) -> Result<()> {
        self.runner
            .run("conan", &["remove", pattern, "--force"])
            .await
            .map(drop)
    }

    /// Export the recipe in `folder` as `reference`
    pub async fn export(&self, folder: &str, reference: &str) -> Result<()> {
        self.runner
            .run("conan", &["export", folder, reference])
            .await
            .map(drop)
    }

    /// Upload every exported revision of `package` to `remote`.
    ///
    /// `--force` makes the current recipe the newest revision by date even if
    /// the branch went back and forth.
    pub async fn upload(&self, remote: &str, package: &str) -> Result<()> {
        self.runner
            .run(
                "conan",
                &["upload", "-r", remote, package, "--force", "--confirm"],
            )
            .await
            .map(drop)
    }

    /// Install shared configuration from a URL, directory or archive
    pub async fn config_install(&self, source: &str) -> Result<()> {
        self.runner
            .run("conan", &["config", "install", source])
            .await
            .map(drop)
    }

    /// Authenticate against a remote; credentials come from the
    /// `CONAN_LOGIN_USERNAME` / `CONAN_PASSWORD` environment
    pub async fn login(&self, remote: &str) -> Result<()> {
        self.runner
            .run("conan", &["user", "--remote", remote, "--password"])
            .await
            .map(drop)
    }
}

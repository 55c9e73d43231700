//! conan sub-commands

use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, check};
use anstream::println;
use cci_tasks::error::Result;
use std::path::Path;

/// Install shared Conan configuration from `source`
pub async fn run_install_config(path: &Path, source: &str) -> Result<()> {
    let ctx = CommandContext::new(path)?;
    ctx.tasks.conan().config_install(source).await?;
    println!("{} Installed configuration from {}", check(), source.accent());
    Ok(())
}

/// Log in to a remote with the credentials from the environment
pub async fn run_login(path: &Path, remote: &str) -> Result<()> {
    let ctx = CommandContext::new(path)?;
    ctx.tasks.conan().login(remote).await?;
    println!("{} Logged in to {}", check(), remote.accent());
    Ok(())
}

/// Remove every recipe and package from the local cache
pub async fn run_purge(path: &Path) -> Result<()> {
    let ctx = CommandContext::new(path)?;
    ctx.tasks.conan().remove("*").await?;
    println!("{} Purged the local Conan cache", check());
    Ok(())
}

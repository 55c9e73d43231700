//! upload-recipes command

use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, bar_style, check, cross};
use anstream::println;
use cci_tasks::error::Result;
use cci_tasks::upload::{
    PackageSelection, UploadOptions, UploadProgress, select_packages, upload_packages,
};
use indicatif::ProgressBar;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Progress bar over the selected packages
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new(len: usize) -> Self {
        let bar = ProgressBar::new(len as u64);
        bar.set_style(bar_style());
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl UploadProgress for CliProgress {
    fn on_start(&self, package: &str) {
        self.bar.set_message(format!("Exporting {}...", package.accent()));
    }

    fn on_finish(&self, package: &str, ok: bool) {
        let mark = if ok { check() } else { cross() };
        self.bar.println(format!("{mark} {package}"));
        self.bar.inc(1);
    }

    fn on_skip(&self, package: &str) {
        self.bar.println(format!("{} {}", "-".muted(), package.muted()));
        self.bar.inc(1);
    }
}

/// Run the upload-recipes command
pub async fn run_upload_recipes(
    path: &Path,
    selection: &PackageSelection,
    options: &UploadOptions,
) -> Result<()> {
    let ctx = CommandContext::new(path)?;
    let packages: Vec<String> = select_packages(&ctx.tasks, selection)
        .await?
        .into_iter()
        .collect();

    println!("{}", "*** Uploading:".emphasis());
    for package in &packages {
        println!("    {package}");
    }
    if packages.is_empty() {
        println!("{}", "No recipes selected.".muted());
        return Ok(());
    }

    let progress = Arc::new(CliProgress::new(packages.len()));
    let result = upload_packages(&ctx.tasks, &packages, options, progress.clone()).await;
    progress.finish();
    result?;

    println!("{} {}", check(), summary(packages.len(), options));
    Ok(())
}

/// Closing line; only uploads name the remote
fn summary(count: usize, options: &UploadOptions) -> String {
    if options.upload {
        format!("Uploaded {count} recipe(s) to {}", options.remote.accent())
    } else {
        format!("Exported {count} recipe(s)")
    }
}

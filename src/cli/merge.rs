//! merge-upstream and merge-staging-to-production commands

use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, check};
use anstream::println;
use cci_tasks::config::{MergeStagingToProductionConfig, MergeUpstreamConfig};
use cci_tasks::error::Result;
use cci_tasks::merge::{merge_staging_to_production, merge_upstream};
use cci_tasks::types::MergeStatus;
use std::path::Path;

/// Run the merge-upstream command
pub async fn run_merge_upstream(path: &Path) -> Result<()> {
    let ctx = CommandContext::new(path)?;
    let config: MergeUpstreamConfig = ctx.load_config()?;
    let status = merge_upstream(&ctx.tasks, &config).await?;

    println!();
    match status {
        MergeStatus::UpToDate => println!(
            "{} {} is already up to date",
            check(),
            config.upstream.branch.accent()
        ),
        MergeStatus::Merged => println!(
            "{} Merged {} into {}",
            check(),
            config.cci.branch.accent(),
            config.upstream.branch.accent()
        ),
        MergeStatus::PullRequest => {
            println!(
                "{} Conflicts need review; pull request from {} is open",
                "!".warn(),
                format!(
                    "{}:{}",
                    config.pull_request.fork, config.pull_request.merge_branch_name
                )
                .accent()
            );
        }
    }
    println!("   Status: {}", status.name().emphasis());
    Ok(())
}

/// Run the merge-staging-to-production command
pub async fn run_merge_staging_to_production(path: &Path) -> Result<()> {
    let ctx = CommandContext::new(path)?;
    let config: MergeStagingToProductionConfig = ctx.load_config()?;
    let status = merge_staging_to_production(&ctx.tasks, &config).await?;

    println!();
    if status == MergeStatus::UpToDate {
        println!(
            "{} {} is already up to date",
            check(),
            config.production_branch.accent()
        );
    } else {
        println!(
            "{} Merged {} into {}",
            check(),
            config.staging_branch.accent(),
            config.production_branch.accent()
        );
    }
    println!("   Status: {}", status.name().emphasis());
    Ok(())
}

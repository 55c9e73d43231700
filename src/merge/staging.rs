//! The merge-staging-to-production task

use crate::config::{MergeStagingToProductionConfig, ProjectConfig};
use crate::error::Result;
use crate::merge::checkout::{CheckoutState, settle};
use crate::merge::status_file::{
    MERGE_STAGING_TO_PRODUCTION_STATUS, remove_status_file, write_status_file,
};
use crate::runner::TaskContext;
use crate::types::MergeStatus;
use tracing::info;

/// Merge the staging branch into the production branch and push it.
///
/// Writes `.merge-staging-to-production-status`.
pub async fn merge_staging_to_production(
    ctx: &TaskContext,
    config: &MergeStagingToProductionConfig,
) -> Result<MergeStatus> {
    info!(
        "merge-staging-to-production configuration:\n{}",
        config.to_yaml()?
    );
    let git = ctx.git();
    let checkout = CheckoutState::save(git).await?;
    let outcome = merge_staging(ctx, config).await;
    let restored = checkout.restore(git).await;
    settle(outcome, restored)
}

async fn merge_staging(
    ctx: &TaskContext,
    config: &MergeStagingToProductionConfig,
) -> Result<MergeStatus> {
    let git = ctx.git();
    let url = config.url();
    let status_path = ctx.path(MERGE_STAGING_TO_PRODUCTION_STATUS);
    remove_status_file(&status_path)?;

    info!("Check out production branch...");
    git.fetch(&url, &config.production_branch).await?;
    git.checkout_detach("FETCH_HEAD").await?;

    info!("Merge staging branch...");
    git.fetch(&url, &config.staging_branch).await?;
    let status = if git.count_revs("HEAD..FETCH_HEAD").await? == 0 {
        info!("{} is up to date.", config.production_branch);
        MergeStatus::UpToDate
    } else {
        git.merge_into(&config.production_branch).await?;
        info!("Push merged production branch...");
        git.push(
            &url,
            &format!("HEAD:refs/heads/{}", config.production_branch),
            false,
        )
        .await?;
        MergeStatus::Merged
    };
    write_status_file(status, &status_path)?;
    Ok(status)
}

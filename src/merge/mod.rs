//! Merge automation for the Conan Center Index fork
//!
//! - `upstream`: merge conan-io into the staging branch, or open a pull
//!   request when conflicts need a human
//! - `staging`: merge staging into production
//!
//! Conflict policy and the pull request body are pure and tested on their own.

pub mod checkout;
pub mod conflicts;
pub mod pr_body;
mod staging;
pub mod status_file;
mod upstream;

pub use checkout::{CheckoutState, MergeRemote};
pub use pr_body::{PR_TITLE, PrBodyInput, form_pr_body, render_pr_body};
pub use staging::merge_staging_to_production;
pub use status_file::{MERGE_STAGING_TO_PRODUCTION_STATUS, MERGE_UPSTREAM_STATUS};
pub use upstream::{
    DELETED_BY_US_MESSAGE, MERGE_OURS_MESSAGE, MergeAttempt, check_preconditions,
    create_pull_request, maybe_push, merge_and_push, merge_upstream,
};

//! Status files read by CI after a merge task
//!
//! A task removes its status file before doing anything and writes it once
//! on success, so a missing file means the run failed.

use crate::error::Result;
use crate::types::MergeStatus;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::info;

/// Status file of the merge-upstream task
pub const MERGE_UPSTREAM_STATUS: &str = ".merge-upstream-status";

/// Status file of the merge-staging-to-production task
pub const MERGE_STAGING_TO_PRODUCTION_STATUS: &str = ".merge-staging-to-production-status";

/// Remove a status file; a missing file is fine
pub fn remove_status_file(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

/// Write the status name, without a trailing newline
pub fn write_status_file(status: MergeStatus, path: &Path) -> Result<()> {
    info!("Write status {status} to file {}", path.display());
    fs::write(path, status.name())?;
    Ok(())
}

//! Conflict resolution policy
//!
//! Pure functions over the unmerged entries of a merge. Two kinds of
//! conflicts are resolved automatically: paths deleted locally but modified
//! upstream (`DU`), and paths modified on both sides that `.gitattributes-merge`
//! declares `merge=ours`. Everything else needs a human.

use crate::types::{GitFileStatus, MergeAttr};
use std::collections::HashMap;

/// Keep only the unmerged entries
pub fn conflicts(statuses: Vec<GitFileStatus>) -> Vec<GitFileStatus> {
    statuses
        .into_iter()
        .filter(GitFileStatus::is_conflict)
        .collect()
}

/// Paths deleted locally and modified upstream
pub fn deleted_by_us(conflicts: &[GitFileStatus]) -> Vec<&str> {
    conflicts
        .iter()
        .filter(|c| c.is_deleted_by_us())
        .map(|c| c.path.as_str())
        .collect()
}

/// Paths modified on both sides whose attribute is `merge=ours`
pub fn merge_ours(conflicts: &[GitFileStatus]) -> Vec<&str> {
    conflicts
        .iter()
        .filter(|c| c.is_merge_ours())
        .map(|c| c.path.as_str())
        .collect()
}

/// Paths modified on both sides; the only ones whose attribute matters
pub fn both_modified(conflicts: &[GitFileStatus]) -> Vec<&str> {
    conflicts
        .iter()
        .filter(|c| c.status == crate::types::BOTH_MODIFIED)
        .map(|c| c.path.as_str())
        .collect()
}

/// Conflicts that cannot be resolved by policy
pub fn unresolvable(conflicts: &[GitFileStatus]) -> Vec<&GitFileStatus> {
    conflicts
        .iter()
        .filter(|c| !c.is_deleted_by_us() && !c.is_merge_ours())
        .collect()
}

/// Attach `merge` attributes by path; paths not in `attrs` are unspecified
pub fn with_merge_attributes(
    conflicts: Vec<GitFileStatus>,
    attrs: &HashMap<String, MergeAttr>,
) -> Vec<GitFileStatus> {
    conflicts
        .into_iter()
        .map(|mut conflict| {
            conflict.merge_attr = attrs.get(&conflict.path).cloned().unwrap_or_default();
            conflict
        })
        .collect()
}

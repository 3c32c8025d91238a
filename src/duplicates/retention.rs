//! Keep-oldest retention policy for duplicate groups.
//!
//! Within a group, the file with the oldest modification time survives and
//! every file strictly newer than it is selected for deletion. When several
//! files share the oldest timestamp they are all kept.

use std::fs;
use std::path::{Path, PathBuf};

use crate::cache::entry::{modified_timestamp, Timestamp};

use super::DuplicateGroup;

/// What to do with each member of a duplicate group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionPlan {
    /// Files that survive.
    pub keep: Vec<PathBuf>,
    /// Files selected for deletion.
    pub delete: Vec<PathBuf>,
    /// Files whose modification time could not be read, with the reason.
    /// These are neither kept as the oldest nor deleted.
    pub skipped: Vec<(PathBuf, String)>,
}

/// Paths strictly newer than the oldest timestamp in `entries`.
///
/// Input order is preserved. Returns nothing for fewer than two entries.
#[must_use]
pub fn select_deletions(entries: &[(PathBuf, Timestamp)]) -> Vec<PathBuf> {
    if entries.len() < 2 {
        return Vec::new();
    }
    let Some(oldest) = entries.iter().map(|(_, ts)| *ts).min() else {
        return Vec::new();
    };

    entries
        .iter()
        .filter(|(_, ts)| *ts > oldest)
        .map(|(path, _)| path.clone())
        .collect()
}

/// Build a retention plan for `group` from the files' current
/// modification times.
#[must_use]
pub fn plan_retention(group: &DuplicateGroup) -> RetentionPlan {
    let mut plan = RetentionPlan::default();
    let mut dated = Vec::with_capacity(group.len());

    for path in &group.paths {
        match read_modified(path) {
            Ok(ts) => dated.push((path.clone(), ts)),
            Err(reason) => {
                log::warn!(
                    "Cannot read modification time of {}, leaving it alone: {}",
                    path.display(),
                    reason
                );
                plan.skipped.push((path.clone(), reason));
            }
        }
    }

    plan.delete = select_deletions(&dated);
    plan.keep = dated
        .into_iter()
        .map(|(path, _)| path)
        .filter(|path| !plan.delete.contains(path))
        .collect();

    log::debug!(
        "Retention for {}: keep {}, delete {}, skipped {}",
        group.digest.short_hex(),
        plan.keep.len(),
        plan.delete.len(),
        plan.skipped.len()
    );
    plan
}

fn read_modified(path: &Path) -> Result<Timestamp, String> {
    fs::metadata(path)
        .and_then(|m| modified_timestamp(&m))
        .map_err(|e| e.to_string())
}

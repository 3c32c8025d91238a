//! Grouping of scan results by content digest.
//!
//! # Overview
//!
//! Every readable scan result lands in exactly one [`DuplicateGroup`]; two
//! files share a group exactly when their digests are byte-for-byte equal.
//! Unreadable results are left out. Groups appear in the order their first
//! member was seen, and members keep scan order, so the same input always
//! yields the same output.
//!
//! # Example
//!
//! ```
//! use dupsweep::duplicates::group_by_digest;
//! use dupsweep::scanner::{Digest, DigestSource, ScanResult};
//! use std::path::PathBuf;
//!
//! let d1 = Digest::from_bytes([1; 32]);
//! let d2 = Digest::from_bytes([2; 32]);
//! let results = vec![
//!     ScanResult::hashed(PathBuf::from("/d/a.txt"), d1, DigestSource::Inserted),
//!     ScanResult::hashed(PathBuf::from("/d/b.txt"), d1, DigestSource::Inserted),
//!     ScanResult::hashed(PathBuf::from("/d/c.txt"), d2, DigestSource::Inserted),
//! ];
//!
//! let groups = group_by_digest(&results);
//! assert_eq!(groups.len(), 2);
//! assert!(groups[0].is_duplicate());
//! assert!(!groups[1].is_duplicate());
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use crate::scanner::{Digest, ScanResult};

/// Files sharing one digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    /// Digest shared by every file in the group
    pub digest: Digest,
    /// Member paths, in scan order
    pub paths: Vec<PathBuf>,
}

impl DuplicateGroup {
    /// Create a group with its first member.
    #[must_use]
    pub fn new(digest: Digest, first: PathBuf) -> Self {
        Self {
            digest,
            paths: vec![first],
        }
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Whether the group holds actual duplicates (2+ files).
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        self.paths.len() > 1
    }

    /// Comma-separated file names, for reports.
    #[must_use]
    pub fn file_names(&self) -> String {
        self.paths
            .iter()
            .map(|p| {
                p.file_name()
                    .map_or_else(|| p.display().to_string(), |n| n.to_string_lossy().to_string())
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Partition readable scan results by digest, in first-seen order.
#[must_use]
pub fn group_by_digest(results: &[ScanResult]) -> Vec<DuplicateGroup> {
    let mut index: HashMap<Digest, usize> = HashMap::new();
    let mut groups: Vec<DuplicateGroup> = Vec::new();

    for result in results {
        let Some(digest) = result.digest() else {
            continue;
        };
        match index.get(digest) {
            Some(&i) => groups[i].paths.push(result.path.clone()),
            None => {
                index.insert(*digest, groups.len());
                groups.push(DuplicateGroup::new(*digest, result.path.clone()));
            }
        }
    }

    groups
}

/// Only the groups holding two or more files.
#[must_use]
pub fn duplicate_groups(results: &[ScanResult]) -> Vec<DuplicateGroup> {
    group_by_digest(results)
        .into_iter()
        .filter(DuplicateGroup::is_duplicate)
        .collect()
}

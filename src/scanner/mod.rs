//! Scanner module for single-directory file discovery and hashing.
//!
//! This module provides functionality for:
//! - Listing the immediate files of one directory
//! - Content hashing with BLAKE3
//! - Reusing cached digests for files whose modification time is unchanged
//! - Collecting new and changed digests for cache reconciliation
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Non-recursive file discovery
//! - [`hasher`]: The [`Digest`] type and BLAKE3 hashing
//! - [`scan`]: The parallel [`FileScanner`]
//!
//! # Example
//!
//! ```no_run
//! use dupsweep::scanner::{FileScanner, ScannerConfig};
//! use std::collections::HashMap;
//! use std::path::Path;
//!
//! let scanner = FileScanner::new(ScannerConfig::default());
//! let report = scanner.scan(Path::new("."), &HashMap::new()).unwrap();
//! for result in &report.results {
//!     match result.digest() {
//!         Some(digest) => println!("{}: {}", result.path.display(), digest.short_hex()),
//!         None => eprintln!("Skipped: {}", result.path.display()),
//!     }
//! }
//! ```

pub mod hasher;
pub mod scan;
pub mod walker;

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use dashmap::DashMap;

use crate::cache::CacheEntry;

// Re-export main types
pub use hasher::{ContentHasher, Digest, Hasher, DIGEST_LEN};
pub use scan::{FileScanner, ScanReport, ScannerConfig};
pub use walker::list_files;

/// Where the digest of a scanned file came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestSource {
    /// Reused from the cache; the file was not read.
    Cached,
    /// Recomputed because the cached modification time no longer matches.
    Updated,
    /// Computed for a file the cache has never seen.
    Inserted,
    /// Computed without consulting the cache (no cache, or non-UTF-8 name).
    Uncached,
}

impl DigestSource {
    /// Whether the file content was read and hashed during this run.
    #[must_use]
    pub fn was_hashed(self) -> bool {
        !matches!(self, Self::Cached)
    }
}

/// Per-file result of a scan.
#[derive(Debug)]
pub enum ScanOutcome {
    /// The file has a valid digest.
    Hashed {
        /// Content digest
        digest: Digest,
        /// How the digest was obtained
        source: DigestSource,
    },
    /// The file could not be read and is excluded from grouping.
    Unreadable(HashError),
}

/// A scanned file: its full path paired with the scan outcome.
#[derive(Debug)]
pub struct ScanResult {
    /// Full path to the file
    pub path: PathBuf,
    /// Outcome of hashing the file
    pub outcome: ScanOutcome,
}

impl ScanResult {
    /// Result for a successfully hashed file.
    #[must_use]
    pub fn hashed(path: PathBuf, digest: Digest, source: DigestSource) -> Self {
        Self {
            path,
            outcome: ScanOutcome::Hashed { digest, source },
        }
    }

    /// Result for a file that could not be read.
    #[must_use]
    pub fn unreadable(path: PathBuf, error: HashError) -> Self {
        Self {
            path,
            outcome: ScanOutcome::Unreadable(error),
        }
    }

    /// The digest, or `None` when the file was unreadable.
    #[must_use]
    pub fn digest(&self) -> Option<&Digest> {
        match &self.outcome {
            ScanOutcome::Hashed { digest, .. } => Some(digest),
            ScanOutcome::Unreadable(_) => None,
        }
    }

    /// The digest source, or `None` when the file was unreadable.
    #[must_use]
    pub fn source(&self) -> Option<DigestSource> {
        match &self.outcome {
            ScanOutcome::Hashed { source, .. } => Some(*source),
            ScanOutcome::Unreadable(_) => None,
        }
    }

    /// Whether the file was excluded because it could not be read.
    #[must_use]
    pub fn is_unreadable(&self) -> bool {
        matches!(self.outcome, ScanOutcome::Unreadable(_))
    }
}

/// Cache changes collected by parallel scan workers.
///
/// Workers write disjoint file names concurrently. A name lands in
/// `to_update` when the cache already knows it and in `to_insert` when it
/// does not, never in both.
#[derive(Debug, Default)]
pub struct PendingCacheChanges {
    to_update: DashMap<String, CacheEntry>,
    to_insert: DashMap<String, CacheEntry>,
}

impl PendingCacheChanges {
    /// Create empty accumulators.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a changed digest for a file already in the cache.
    ///
    /// Returns `false` if the name was already recorded.
    pub fn record_update(&self, file_name: String, entry: CacheEntry) -> bool {
        debug_assert!(!self.to_insert.contains_key(&file_name));
        Self::record(&self.to_update, file_name, entry)
    }

    /// Record a digest for a file the cache has never seen.
    ///
    /// Returns `false` if the name was already recorded.
    pub fn record_insert(&self, file_name: String, entry: CacheEntry) -> bool {
        debug_assert!(!self.to_update.contains_key(&file_name));
        Self::record(&self.to_insert, file_name, entry)
    }

    fn record(map: &DashMap<String, CacheEntry>, file_name: String, entry: CacheEntry) -> bool {
        let mut inserted = false;
        map.entry(file_name).or_insert_with(|| {
            inserted = true;
            entry
        });
        inserted
    }

    /// Number of pending updates.
    #[must_use]
    pub fn update_count(&self) -> usize {
        self.to_update.len()
    }

    /// Number of pending inserts.
    #[must_use]
    pub fn insert_count(&self) -> usize {
        self.to_insert.len()
    }

    /// Check if there is nothing to reconcile.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_update.is_empty() && self.to_insert.is_empty()
    }

    /// Drain both accumulators into name-ordered batches `(updates, inserts)`.
    #[must_use]
    pub fn into_batches(self) -> (BTreeMap<String, CacheEntry>, BTreeMap<String, CacheEntry>) {
        (
            self.to_update.into_iter().collect(),
            self.to_insert.into_iter().collect(),
        )
    }
}

/// Errors that can occur while preparing a directory scan.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing the directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while listing the directory.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl ScanError {
    pub(crate) fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl HashError {
    /// Classify an I/O error raised while reading `path`.
    #[must_use]
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    /// Path of the file that failed.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p) | Self::PermissionDenied(p) | Self::Io { path: p, .. } => p,
        }
    }
}

//! Recoverable removal of duplicate files.
//!
//! # Overview
//!
//! Files are never deleted permanently. A [`Disposer`] moves a file somewhere
//! it can be recovered from:
//! - [`TrashDisposer`] sends it to the system trash
//! - [`DirectoryDisposer`] moves it into a holding directory
//!
//! Every disposer re-checks that the file still exists right before acting,
//! since an earlier step of the same run may already have removed it.
//!
//! # Example
//!
//! ```no_run
//! use dupsweep::actions::delete::{dispose_batch, TrashDisposer};
//! use std::path::PathBuf;
//!
//! let paths = vec![PathBuf::from("/path/to/duplicate.txt")];
//! let result = dispose_batch(&paths, &TrashDisposer);
//! println!("{}", result.summary());
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error type for removal operations.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// File was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when attempting to remove.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Trash operation failed.
    #[error("trash operation failed for {path}: {message}")]
    TrashFailed { path: PathBuf, message: String },

    /// Attempted to remove all copies (at least one must be preserved).
    #[error("cannot delete all copies - at least one file must be preserved")]
    AllCopiesWouldBeDeleted,

    /// File already lives in the holding directory it would be moved to.
    #[error("{0} is already in the holding directory")]
    AlreadyInHoldingDirectory(PathBuf),

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DeleteError {
    /// Get the path associated with this error (if any).
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::AlreadyInHoldingDirectory(p)
            | Self::TrashFailed { path: p, .. }
            | Self::Io { path: p, .. } => Some(p),
            Self::AllCopiesWouldBeDeleted => None,
        }
    }

    fn from_io(path: &Path, e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: e,
            },
        }
    }
}

/// Result of a successful removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteResult {
    /// Path that was removed.
    pub path: PathBuf,
    /// Size of the removed file in bytes.
    pub size: u64,
    /// Where the file went, when the disposer knows it.
    pub moved_to: Option<PathBuf>,
}

/// Results of a batch removal.
#[derive(Debug, Clone, Default)]
pub struct BatchDeleteResult {
    /// Successfully removed files.
    pub successes: Vec<DeleteResult>,
    /// Failed removals with their errors.
    pub failures: Vec<(PathBuf, String)>,
    /// Total bytes freed.
    pub bytes_freed: u64,
}

impl BatchDeleteResult {
    /// Number of successful removals.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    /// Number of failed removals.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Check if all removals succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Fold another batch into this one.
    pub fn merge(&mut self, other: BatchDeleteResult) {
        self.bytes_freed += other.bytes_freed;
        self.successes.extend(other.successes);
        self.failures.extend(other.failures);
    }

    /// Human-readable summary of the operation.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.all_succeeded() {
            format!(
                "Removed {} file(s), freed {} bytes",
                self.success_count(),
                self.bytes_freed
            )
        } else {
            format!(
                "Removed {} file(s), {} failed, freed {} bytes",
                self.success_count(),
                self.failure_count(),
                self.bytes_freed
            )
        }
    }
}

/// Moves a file to a recoverable location.
pub trait Disposer: Send + Sync {
    /// Remove `path`, verifying it still exists first.
    ///
    /// # Errors
    ///
    /// Returns [`DeleteError`] if the file is gone or cannot be moved.
    fn dispose(&self, path: &Path) -> Result<DeleteResult, DeleteError>;

    /// Directory files are moved into, for disposers that keep them on the
    /// local filesystem.
    fn holding_directory(&self) -> Option<&Path> {
        None
    }
}

/// Check the file is still there and return its size.
fn verify_present(path: &Path) -> Result<u64, DeleteError> {
    let metadata = fs::symlink_metadata(path).map_err(|e| DeleteError::from_io(path, e))?;
    if !metadata.is_file() {
        return Err(DeleteError::NotFound(path.to_path_buf()));
    }
    Ok(metadata.len())
}

/// Sends files to the platform trash / recycle bin.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrashDisposer;

impl Disposer for TrashDisposer {
    fn dispose(&self, path: &Path) -> Result<DeleteResult, DeleteError> {
        let size = verify_present(path)?;

        trash::delete(path).map_err(|e| {
            log::error!("Trash operation failed for {}: {}", path.display(), e);
            DeleteError::TrashFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })?;

        log::info!("Moved to trash: {} ({} bytes)", path.display(), size);
        Ok(DeleteResult {
            path: path.to_path_buf(),
            size,
            moved_to: None,
        })
    }
}

/// Moves files into a holding directory instead of the system trash.
///
/// Name collisions are resolved by appending ` (1)`, ` (2)`, ... before the
/// extension.
#[derive(Debug, Clone)]
pub struct DirectoryDisposer {
    target: PathBuf,
}

impl DirectoryDisposer {
    /// Create a disposer that moves files into `target`, creating it on first
    /// use.
    #[must_use]
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
        }
    }

    /// Whether `path` sits directly inside the holding directory.
    fn holds(&self, path: &Path) -> bool {
        let Some(parent) = path.parent() else {
            return false;
        };
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        match (fs::canonicalize(parent), fs::canonicalize(&self.target)) {
            (Ok(parent), Ok(target)) => parent == target,
            _ => false,
        }
    }

    fn free_destination(&self, path: &Path) -> Result<PathBuf, DeleteError> {
        let file_name = path
            .file_name()
            .ok_or_else(|| DeleteError::NotFound(path.to_path_buf()))?;
        let candidate = self.target.join(file_name);
        if !candidate.exists() {
            return Ok(candidate);
        }

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        (1u32..)
            .map(|n| self.target.join(format!("{stem} ({n}){ext}")))
            .find(|p| !p.exists())
            .ok_or_else(|| DeleteError::Io {
                path: path.to_path_buf(),
                source: io::Error::other("no free name in holding directory"),
            })
    }
}

impl Disposer for DirectoryDisposer {
    fn dispose(&self, path: &Path) -> Result<DeleteResult, DeleteError> {
        let size = verify_present(path)?;
        if self.holds(path) {
            return Err(DeleteError::AlreadyInHoldingDirectory(path.to_path_buf()));
        }

        fs::create_dir_all(&self.target).map_err(|e| DeleteError::from_io(&self.target, e))?;
        let destination = self.free_destination(path)?;

        if let Err(rename_err) = fs::rename(path, &destination) {
            // Likely a different filesystem; copy then remove.
            log::debug!(
                "Rename of {} failed ({}), copying instead",
                path.display(),
                rename_err
            );
            fs::copy(path, &destination).map_err(|e| DeleteError::from_io(path, e))?;
            if let Err(e) = fs::remove_file(path) {
                // Leave the source untouched rather than keep two copies.
                let _ = fs::remove_file(&destination);
                return Err(DeleteError::from_io(path, e));
            }
        }

        log::info!(
            "Moved {} to {} ({} bytes)",
            path.display(),
            destination.display(),
            size
        );
        Ok(DeleteResult {
            path: path.to_path_buf(),
            size,
            moved_to: Some(destination),
        })
    }

    fn holding_directory(&self) -> Option<&Path> {
        Some(&self.target)
    }
}

/// Remove every path with `disposer`, continuing past failures.
pub fn dispose_batch(paths: &[PathBuf], disposer: &dyn Disposer) -> BatchDeleteResult {
    let mut result = BatchDeleteResult::default();

    for path in paths {
        match disposer.dispose(path) {
            Ok(del) => {
                result.bytes_freed += del.size;
                result.successes.push(del);
            }
            Err(e) => {
                let error_msg = e.to_string();
                log::warn!("Failed to remove {}: {}", path.display(), error_msg);
                result.failures.push((path.clone(), error_msg));
            }
        }
    }

    result
}

/// Validate that a selection doesn't remove all copies.
///
/// # Errors
///
/// Returns `AllCopiesWouldBeDeleted` if no member of the group would remain.
///
/// # Example
///
/// ```
/// use dupsweep::actions::delete::validate_preserves_copy;
/// use std::path::PathBuf;
///
/// let group = vec![PathBuf::from("/original.txt"), PathBuf::from("/copy.txt")];
///
/// assert!(validate_preserves_copy(&[PathBuf::from("/copy.txt")], &group).is_ok());
/// assert!(validate_preserves_copy(&group, &group).is_err());
/// ```
pub fn validate_preserves_copy(
    selected_paths: &[PathBuf],
    group_paths: &[PathBuf],
) -> Result<(), DeleteError> {
    use std::collections::HashSet;

    let selected_set: HashSet<&PathBuf> = selected_paths.iter().collect();
    let preserved_count = group_paths
        .iter()
        .filter(|p| !selected_set.contains(p))
        .count();

    if preserved_count == 0 {
        log::error!(
            "Attempted to delete all {} copies of a duplicate group",
            group_paths.len()
        );
        Err(DeleteError::AllCopiesWouldBeDeleted)
    } else {
        Ok(())
    }
}

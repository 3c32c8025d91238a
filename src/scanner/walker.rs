//! Non-recursive file discovery.
//!
//! Only the immediate regular files of the target directory are returned.
//! Subdirectories are not descended into and symbolic links are skipped.
//! Entries are sorted by file name so every run sees the same order.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::ScanError;

/// List the regular files directly inside `dir`, sorted by file name.
///
/// Entries that fail to stat are logged and skipped.
///
/// # Errors
///
/// Returns [`ScanError`] if `dir` itself cannot be read.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let mut files = Vec::new();

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                if e.depth() == 0 {
                    let path = e.path().unwrap_or(dir).to_path_buf();
                    return Err(match e.into_io_error() {
                        Some(io) => ScanError::from_io(&path, io),
                        None => ScanError::NotADirectory(path),
                    });
                }
                log::warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };

        let file_type = entry.file_type();
        if file_type.is_file() {
            files.push(entry.into_path());
        } else if file_type.is_symlink() {
            log::debug!("Skipping symlink: {}", entry.path().display());
        } else {
            log::trace!("Skipping non-file entry: {}", entry.path().display());
        }
    }

    log::debug!("Found {} files in {}", files.len(), dir.display());
    Ok(files)
}

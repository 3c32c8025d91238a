//! Duplicate finding pipeline.
//!
//! One call to [`DuplicateFinder::find_duplicates`] is one run:
//!
//! 1. **Snapshot** - read the cached entries for the directory once
//! 2. **Scan** - hash files in parallel, reusing unchanged cached digests
//! 3. **Group** - partition readable files by digest
//! 4. **Remove** (optional) - keep the oldest file of each group and move the
//!    newer copies to a recoverable location
//! 5. **Reconcile** - apply the collected cache updates and inserts, one
//!    transaction each
//!
//! Steps 3 to 5 only start once every scan worker has finished.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::actions::{
    dispose_batch, validate_preserves_copy, BatchDeleteResult, Disposer, TrashDisposer,
};
use crate::cache::{CacheError, HashCache};
use crate::progress::ProgressCallback;
use crate::scanner::{
    ContentHasher, FileScanner, Hasher, PendingCacheChanges, ScanError, ScanReport, ScannerConfig,
};

use super::groups::{duplicate_groups, DuplicateGroup};
use super::retention::plan_retention;

/// Configuration for the duplicate finder.
#[derive(Clone, Default)]
pub struct FinderConfig {
    /// Number of worker threads for hashing; 0 uses the available parallelism.
    pub threads: usize,
    /// Remove all but the oldest file of each duplicate group.
    pub remove_duplicates: bool,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("threads", &self.threads)
            .field("remove_duplicates", &self.remove_duplicates)
            .field("shutdown_flag", &self.shutdown_flag.is_some())
            .field("progress_callback", &self.progress_callback.is_some())
            .finish()
    }
}

impl FinderConfig {
    /// Set the number of hashing threads.
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Enable or disable removal of newer duplicates.
    #[must_use]
    pub fn with_remove_duplicates(mut self, remove: bool) -> Self {
        self.remove_duplicates = remove;
        self
    }

    /// Set the shutdown flag.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    fn scanner_config(&self) -> ScannerConfig {
        let mut config = ScannerConfig::default().with_threads(self.threads);
        if let Some(ref flag) = self.shutdown_flag {
            config = config.with_shutdown_flag(flag.clone());
        }
        if let Some(ref callback) = self.progress_callback {
            config = config.with_progress_callback(callback.clone());
        }
        config
    }
}

/// Summary statistics for a run.
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    /// Directory that was scanned (canonical form)
    pub directory: PathBuf,
    /// Files found in the directory
    pub total_files: usize,
    /// Files whose content was read and hashed
    pub hashed_files: usize,
    /// Files whose digest came from the cache
    pub cache_hits: usize,
    /// Files excluded because they could not be read
    pub unreadable_files: Vec<PathBuf>,
    /// Cache rows updated
    pub cache_updates: usize,
    /// Cache rows inserted
    pub cache_inserts: usize,
    /// Number of duplicate groups (2+ files)
    pub duplicate_groups: usize,
    /// Files beyond the first in each duplicate group
    pub duplicate_files: usize,
    /// Outcome of removals, when enabled
    pub removal: BatchDeleteResult,
    /// Wall-clock time of the run
    pub scan_duration: Duration,
}

impl ScanSummary {
    /// Total cache writes (updates plus inserts).
    #[must_use]
    pub fn cache_writes(&self) -> usize {
        self.cache_updates + self.cache_inserts
    }

    /// Whether any file was skipped or any removal failed.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.unreadable_files.is_empty() || !self.removal.all_succeeded()
    }

    /// Freed space, human-readable.
    #[must_use]
    pub fn freed_display(&self) -> String {
        bytesize::ByteSize::b(self.removal.bytes_freed).to_string()
    }
}

/// Errors that can occur during a run.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The scan was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Scan interrupted by user")]
    Interrupted,

    /// The provided path does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// The provided path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Removal would move files into the directory being scanned.
    #[error("Holding directory is the scanned directory: {0}")]
    HoldingDirectoryIsScanned(PathBuf),

    /// An I/O error occurred while resolving the directory.
    #[error("I/O error for {path}: {source}")]
    IoWithPath {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The directory could not be listed.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// The hash cache failed; the run cannot continue safely.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Duplicate finder that runs the scan/group/remove/reconcile pipeline.
///
/// # Example
///
/// ```no_run
/// use dupsweep::cache::HashCache;
/// use dupsweep::duplicates::{DuplicateFinder, FinderConfig};
/// use std::path::Path;
///
/// let mut cache = HashCache::open(Path::new("hashes.db")).unwrap();
/// let finder = DuplicateFinder::new(FinderConfig::default());
///
/// let (groups, summary) = finder
///     .find_duplicates(Path::new("/some/path"), Some(&mut cache))
///     .unwrap();
///
/// println!("Found {} duplicate groups", groups.len());
/// println!("{} files served from cache", summary.cache_hits);
/// ```
pub struct DuplicateFinder {
    config: FinderConfig,
    hasher: Arc<dyn ContentHasher>,
    disposer: Arc<dyn Disposer>,
}

impl DuplicateFinder {
    /// Create a finder that hashes with BLAKE3 and removes to the system
    /// trash.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        Self {
            config,
            hasher: Arc::new(Hasher::new()),
            disposer: Arc::new(TrashDisposer),
        }
    }

    /// Create a new duplicate finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// Replace the content hasher.
    #[must_use]
    pub fn with_hasher(mut self, hasher: Arc<dyn ContentHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Replace the disposer used for removals.
    #[must_use]
    pub fn with_disposer(mut self, disposer: Arc<dyn Disposer>) -> Self {
        self.disposer = disposer;
        self
    }

    /// Run the pipeline over `path`.
    ///
    /// With `cache` set, unchanged files reuse their cached digest and the
    /// cache is reconciled once at the end. Without it every file is hashed
    /// and nothing is persisted.
    ///
    /// Returns every duplicate group (2+ files) in first-seen order, plus
    /// run statistics.
    ///
    /// # Errors
    ///
    /// - `PathNotFound` / `NotADirectory` if `path` is not a directory
    /// - `HoldingDirectoryIsScanned` if removal is enabled and the disposer
    ///   would move files into `path` itself
    /// - `Cache` if the cache cannot be read or written
    /// - `Interrupted` if a shutdown was requested during the scan; files
    ///   that finished hashing are still reconciled
    pub fn find_duplicates(
        &self,
        path: &Path,
        mut cache: Option<&mut HashCache>,
    ) -> Result<(Vec<DuplicateGroup>, ScanSummary), FinderError> {
        let start_time = Instant::now();
        let dir = resolve_directory(path)?;
        if self.config.remove_duplicates {
            self.check_holding_directory(&dir)?;
        }
        let mut summary = ScanSummary {
            directory: dir.clone(),
            ..Default::default()
        };

        let scanner = FileScanner::with_hasher(self.config.scanner_config(), self.hasher.clone());
        let report = match cache.as_deref() {
            Some(cache) => {
                let snapshot = cache.load_all(&dir)?;
                scanner.scan(&dir, &snapshot)?
            }
            None => scanner.scan_uncached(&dir)?,
        };

        summary.total_files = report.results.len();
        summary.hashed_files = report.hashed_files();
        summary.cache_hits = report.cache_hits();
        summary.unreadable_files = report
            .results
            .iter()
            .filter(|r| r.is_unreadable())
            .map(|r| r.path.clone())
            .collect();

        let ScanReport {
            results,
            pending,
            interrupted,
        } = report;

        if interrupted || self.config.is_shutdown_requested() {
            if let Some(cache) = cache.as_deref_mut() {
                self.reconcile(cache, &dir, pending, &mut summary)?;
            }
            return Err(FinderError::Interrupted);
        }

        let groups = duplicate_groups(&results);
        summary.duplicate_groups = groups.len();
        summary.duplicate_files = groups.iter().map(|g| g.len() - 1).sum();

        for group in &groups {
            log::info!(
                "Duplicate group {} ({} files): {}",
                group.digest.short_hex(),
                group.len(),
                group.file_names()
            );
        }

        if self.config.remove_duplicates {
            for group in &groups {
                summary.removal.merge(self.remove_newer_copies(group));
            }
        }

        if let Some(cache) = cache.as_deref_mut() {
            self.reconcile(cache, &dir, pending, &mut summary)?;
        }

        summary.scan_duration = start_time.elapsed();
        log::info!(
            "Scan complete: {} files, {} hashed, {} from cache, {} unreadable, {} duplicate groups",
            summary.total_files,
            summary.hashed_files,
            summary.cache_hits,
            summary.unreadable_files.len(),
            summary.duplicate_groups
        );

        Ok((groups, summary))
    }

    fn check_holding_directory(&self, dir: &Path) -> Result<(), FinderError> {
        let Some(holding) = self.disposer.holding_directory() else {
            return Ok(());
        };
        // A holding directory that does not exist yet cannot be `dir`.
        match fs::canonicalize(holding) {
            Ok(holding) if holding == dir => Err(FinderError::HoldingDirectoryIsScanned(holding)),
            _ => Ok(()),
        }
    }

    fn remove_newer_copies(&self, group: &DuplicateGroup) -> BatchDeleteResult {
        let plan = plan_retention(group);
        if plan.delete.is_empty() {
            log::info!(
                "Nothing to remove in group {}: oldest copy is ambiguous or alone",
                group.digest.short_hex()
            );
            return BatchDeleteResult::default();
        }
        if validate_preserves_copy(&plan.delete, &group.paths).is_err() {
            return BatchDeleteResult::default();
        }

        for kept in &plan.keep {
            log::info!("Keeping oldest copy: {}", kept.display());
        }
        dispose_batch(&plan.delete, self.disposer.as_ref())
    }

    fn reconcile(
        &self,
        cache: &mut HashCache,
        dir: &Path,
        pending: PendingCacheChanges,
        summary: &mut ScanSummary,
    ) -> Result<(), FinderError> {
        let (updates, inserts) = pending.into_batches();

        summary.cache_updates = cache.apply_updates(dir, &updates)?;
        summary.cache_inserts = cache.apply_inserts(dir, &inserts)?;

        Ok(())
    }
}

/// Check `path` is an existing directory and return its canonical form.
fn resolve_directory(path: &Path) -> Result<PathBuf, FinderError> {
    let metadata = fs::metadata(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => FinderError::PathNotFound(path.to_path_buf()),
        _ => FinderError::IoWithPath {
            path: path.to_path_buf(),
            source: e,
        },
    })?;
    if !metadata.is_dir() {
        return Err(FinderError::NotADirectory(path.to_path_buf()));
    }

    fs::canonicalize(path).map_err(|e| FinderError::IoWithPath {
        path: path.to_path_buf(),
        source: e,
    })
}

//! Parallel per-file scan with cache reuse.
//!
//! Each file is an independent unit of work. A worker looks the file name up
//! in a read-only snapshot of the cache and either reuses the cached digest
//! (modification time unchanged) or hashes the file and records the new
//! digest in [`PendingCacheChanges`]. The scan returns only after every
//! worker has finished, so callers always see a complete result set.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use super::hasher::{ContentHasher, Hasher};
use super::walker::list_files;
use super::{DigestSource, HashError, PendingCacheChanges, ScanError, ScanResult};
use crate::cache::entry::{modified_timestamp, CacheEntry};
use crate::progress::{ProgressCallback, PHASE_HASHING};

/// Configuration for the file scanner.
#[derive(Clone, Default)]
pub struct ScannerConfig {
    /// Number of worker threads; 0 uses the available parallelism.
    pub threads: usize,
    /// Optional shutdown flag checked before each file.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for ScannerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScannerConfig")
            .field("threads", &self.threads)
            .field("shutdown_flag", &self.shutdown_flag.is_some())
            .field("progress_callback", &self.progress_callback.is_some())
            .finish()
    }
}

impl ScannerConfig {
    /// Set the number of worker threads.
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
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
}

/// Everything one scan produced.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// One result per scanned file, in file-name order.
    pub results: Vec<ScanResult>,
    /// Cache changes to reconcile after the scan.
    pub pending: PendingCacheChanges,
    /// Whether a shutdown request cut the scan short.
    pub interrupted: bool,
}

impl ScanReport {
    /// Number of files whose digest was reused from the cache.
    #[must_use]
    pub fn cache_hits(&self) -> usize {
        self.count_source(|s| s == DigestSource::Cached)
    }

    /// Number of files whose content was read and hashed.
    #[must_use]
    pub fn hashed_files(&self) -> usize {
        self.count_source(DigestSource::was_hashed)
    }

    /// Number of files excluded because they could not be read.
    #[must_use]
    pub fn unreadable_files(&self) -> usize {
        self.results.iter().filter(|r| r.is_unreadable()).count()
    }

    fn count_source(&self, pred: impl Fn(DigestSource) -> bool) -> usize {
        self.results
            .iter()
            .filter_map(ScanResult::source)
            .filter(|s| pred(*s))
            .count()
    }
}

/// Scans the immediate files of a directory in parallel.
pub struct FileScanner {
    config: ScannerConfig,
    hasher: Arc<dyn ContentHasher>,
}

impl FileScanner {
    /// Create a scanner that hashes with BLAKE3.
    #[must_use]
    pub fn new(config: ScannerConfig) -> Self {
        Self::with_hasher(config, Arc::new(Hasher::new()))
    }

    /// Create a scanner with a custom content hasher.
    #[must_use]
    pub fn with_hasher(config: ScannerConfig, hasher: Arc<dyn ContentHasher>) -> Self {
        Self { config, hasher }
    }

    /// Scan `dir`, reusing digests from `snapshot` where the file's
    /// modification time is unchanged.
    ///
    /// `snapshot` maps file name to the cached entry for this directory.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] if the directory cannot be listed. Per-file
    /// failures never fail the scan; they become unreadable results.
    pub fn scan(
        &self,
        dir: &Path,
        snapshot: &HashMap<String, CacheEntry>,
    ) -> Result<ScanReport, ScanError> {
        self.scan_inner(dir, Some(snapshot))
    }

    /// Scan `dir` without consulting or feeding a cache.
    ///
    /// Every readable file is hashed and no cache changes are collected.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] if the directory cannot be listed.
    pub fn scan_uncached(&self, dir: &Path) -> Result<ScanReport, ScanError> {
        self.scan_inner(dir, None)
    }

    fn scan_inner(
        &self,
        dir: &Path,
        snapshot: Option<&HashMap<String, CacheEntry>>,
    ) -> Result<ScanReport, ScanError> {
        let files = list_files(dir)?;
        let pending = PendingCacheChanges::new();

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start(PHASE_HASHING, files.len());
        }
        log::info!("Scanning {} files in {}", files.len(), dir.display());

        let done = AtomicUsize::new(0);
        let run = || -> Vec<Option<ScanResult>> {
            files
                .into_par_iter()
                .map(|path| {
                    if self.config.is_shutdown_requested() {
                        log::debug!("Shutdown requested, skipping {}", path.display());
                        return None;
                    }
                    let result = self.scan_file(path, snapshot, &pending);
                    if let Some(ref callback) = self.config.progress_callback {
                        let current = done.fetch_add(1, Ordering::Relaxed) + 1;
                        callback.on_progress(current, result.path.to_string_lossy().as_ref());
                    }
                    Some(result)
                })
                .collect()
        };

        // Bounded pool; fall back to the global pool if it cannot be built.
        let outcomes = if self.config.threads > 0 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.threads)
                .build()
            {
                Ok(pool) => pool.install(run),
                Err(e) => {
                    log::warn!(
                        "Failed to create thread pool ({}), using global pool with {} threads",
                        e,
                        rayon::current_num_threads()
                    );
                    run()
                }
            }
        } else {
            run()
        };

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end(PHASE_HASHING);
        }

        let total = outcomes.len();
        let results: Vec<ScanResult> = outcomes.into_iter().flatten().collect();
        let interrupted = results.len() < total;
        if interrupted {
            log::info!(
                "Scan interrupted after {} of {} files",
                results.len(),
                total
            );
        }

        Ok(ScanReport {
            results,
            pending,
            interrupted,
        })
    }

    fn scan_file(
        &self,
        path: PathBuf,
        snapshot: Option<&HashMap<String, CacheEntry>>,
        pending: &PendingCacheChanges,
    ) -> ScanResult {
        let modified = match fs::metadata(&path).and_then(|m| modified_timestamp(&m)) {
            Ok(modified) => modified,
            Err(e) => return unreadable(path.clone(), HashError::from_io(&path, e)),
        };

        let Some(snapshot) = snapshot else {
            return self.hash_only(path, DigestSource::Uncached);
        };

        let Some(file_name) = path.file_name().and_then(|n| n.to_str()).map(str::to_owned) else {
            log::debug!("Non UTF-8 file name, not cached: {}", path.display());
            return self.hash_only(path, DigestSource::Uncached);
        };

        match snapshot.get(&file_name) {
            Some(cached) if cached.is_valid_for(&modified) => {
                log::trace!("Cache hit: {}", path.display());
                ScanResult::hashed(path, cached.digest, DigestSource::Cached)
            }
            Some(_) => match self.hasher.full_hash(&path) {
                Ok(digest) => {
                    log::debug!("Modified since last scan, rehashed: {}", path.display());
                    pending.record_update(file_name, CacheEntry::new(digest, modified));
                    ScanResult::hashed(path, digest, DigestSource::Updated)
                }
                Err(e) => unreadable(path, e),
            },
            None => match self.hasher.full_hash(&path) {
                Ok(digest) => {
                    log::debug!("New file hashed: {}", path.display());
                    pending.record_insert(file_name, CacheEntry::new(digest, modified));
                    ScanResult::hashed(path, digest, DigestSource::Inserted)
                }
                Err(e) => unreadable(path, e),
            },
        }
    }

    fn hash_only(&self, path: PathBuf, source: DigestSource) -> ScanResult {
        match self.hasher.full_hash(&path) {
            Ok(digest) => ScanResult::hashed(path, digest, source),
            Err(e) => unreadable(path, e),
        }
    }
}

fn unreadable(path: PathBuf, error: HashError) -> ScanResult {
    log::warn!("Skipping unreadable file: {}", error);
    ScanResult::unreadable(path, error)
}

use dupsweep::cache::HashCache;
use dupsweep::duplicates::DuplicateFinder;
use dupsweep::scanner::{ContentHasher, Digest, HashError, Hasher};
use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

/// BLAKE3 hasher that counts how many files it actually read.
#[derive(Default)]
struct CountingHasher {
    files_read: AtomicUsize,
}

impl CountingHasher {
    fn count(&self) -> usize {
        self.files_read.load(Ordering::SeqCst)
    }
}

impl ContentHasher for CountingHasher {
    fn full_hash(&self, path: &Path) -> Result<Digest, HashError> {
        self.files_read.fetch_add(1, Ordering::SeqCst);
        Hasher::new().full_hash(path)
    }
}

/// A and B identical, C distinct.
fn abc_dir() -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("A"), "same content").unwrap();
    fs::write(dir.path().join("B"), "same content").unwrap();
    fs::write(dir.path().join("C"), "other content").unwrap();
    let canonical = fs::canonicalize(dir.path()).unwrap();
    (dir, canonical)
}

#[test]
fn test_fresh_cache_inserts_every_file() {
    let (_guard, dir) = abc_dir();
    let db_dir = tempdir().unwrap();
    let mut cache = HashCache::open(&db_dir.path().join("hashes.db")).unwrap();

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(&dir, Some(&mut cache))
        .unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].file_names(), "A, B");
    assert_eq!(summary.cache_inserts, 3);
    assert_eq!(summary.cache_updates, 0);
    assert_eq!(cache.len().unwrap(), 3);

    let stored = cache.load_all(&dir).unwrap();
    assert_eq!(stored["A"].digest, stored["B"].digest);
    assert_ne!(stored["A"].digest, stored["C"].digest);
}

#[test]
fn test_warm_cache_skips_hashing() {
    let (_guard, dir) = abc_dir();
    let mut cache = HashCache::open_in_memory().unwrap();
    DuplicateFinder::with_defaults()
        .find_duplicates(&dir, Some(&mut cache))
        .unwrap();

    let hasher = Arc::new(CountingHasher::default());
    let finder = DuplicateFinder::with_defaults().with_hasher(hasher.clone());
    let (groups, summary) = finder.find_duplicates(&dir, Some(&mut cache)).unwrap();

    assert_eq!(hasher.count(), 0);
    assert_eq!(summary.cache_hits, 3);
    assert_eq!(summary.hashed_files, 0);
    assert_eq!(summary.cache_writes(), 0);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].file_names(), "A, B");
}

#[test]
fn test_second_run_is_idempotent() {
    let (_guard, dir) = abc_dir();
    let mut cache = HashCache::open_in_memory().unwrap();
    let finder = DuplicateFinder::with_defaults();

    let (first_groups, _) = finder.find_duplicates(&dir, Some(&mut cache)).unwrap();
    let before = cache.load_all(&dir).unwrap();
    let (second_groups, second) = finder.find_duplicates(&dir, Some(&mut cache)).unwrap();
    let after = cache.load_all(&dir).unwrap();

    assert_eq!(first_groups, second_groups);
    assert_eq!(second.cache_writes(), 0);
    assert_eq!(before, after);
}

#[test]
fn test_changed_mtime_updates_row_in_place() {
    let (_guard, dir) = abc_dir();
    let mut cache = HashCache::open_in_memory().unwrap();
    let finder = DuplicateFinder::with_defaults();
    finder.find_duplicates(&dir, Some(&mut cache)).unwrap();

    // C now matches A and B, with a new modification time.
    fs::write(dir.join("C"), "same content").unwrap();
    set_file_mtime(dir.join("C"), FileTime::from_unix_time(1_700_000_000, 0)).unwrap();

    let hasher = Arc::new(CountingHasher::default());
    let (groups, summary) = DuplicateFinder::with_defaults()
        .with_hasher(hasher.clone())
        .find_duplicates(&dir, Some(&mut cache))
        .unwrap();

    assert_eq!(hasher.count(), 1);
    assert_eq!(summary.cache_updates, 1);
    assert_eq!(summary.cache_inserts, 0);
    assert_eq!(cache.len().unwrap(), 3);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 3);
}

#[test]
fn test_touched_but_unchanged_file_is_rehashed() {
    let (_guard, dir) = abc_dir();
    let mut cache = HashCache::open_in_memory().unwrap();
    DuplicateFinder::with_defaults()
        .find_duplicates(&dir, Some(&mut cache))
        .unwrap();
    let before = cache.get(&dir, "A").unwrap().unwrap();

    set_file_mtime(dir.join("A"), FileTime::from_unix_time(1_600_000_000, 0)).unwrap();
    let (_, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(&dir, Some(&mut cache))
        .unwrap();
    let after = cache.get(&dir, "A").unwrap().unwrap();

    assert_eq!(summary.cache_updates, 1);
    assert_eq!(before.digest, after.digest);
    assert_ne!(before.last_modified, after.last_modified);
}

#[test]
fn test_new_file_is_inserted_on_later_run() {
    let (_guard, dir) = abc_dir();
    let mut cache = HashCache::open_in_memory().unwrap();
    let finder = DuplicateFinder::with_defaults();
    finder.find_duplicates(&dir, Some(&mut cache)).unwrap();

    fs::write(dir.join("D"), "fresh").unwrap();
    let (_, summary) = finder.find_duplicates(&dir, Some(&mut cache)).unwrap();

    assert_eq!(summary.cache_inserts, 1);
    assert_eq!(summary.cache_hits, 3);
    assert_eq!(cache.len().unwrap(), 4);
}

#[test]
fn test_same_file_names_in_different_directories() {
    let (_g1, first) = abc_dir();
    let (_g2, second) = abc_dir();
    let mut cache = HashCache::open_in_memory().unwrap();
    let finder = DuplicateFinder::with_defaults();

    finder.find_duplicates(&first, Some(&mut cache)).unwrap();
    let (_, summary) = finder.find_duplicates(&second, Some(&mut cache)).unwrap();

    assert_eq!(summary.cache_inserts, 3);
    assert_eq!(cache.len().unwrap(), 6);
    assert_ne!(
        HashCache::directory_key(&first),
        HashCache::directory_key(&second)
    );
}

#[test]
fn test_cache_persists_across_reopen() {
    let (_guard, dir) = abc_dir();
    let db_dir = tempdir().unwrap();
    let db_path = db_dir.path().join("nested").join("hashes.db");

    let mut cache = HashCache::open(&db_path).unwrap();
    DuplicateFinder::with_defaults()
        .find_duplicates(&dir, Some(&mut cache))
        .unwrap();
    cache.close().unwrap();

    let mut reopened = HashCache::open(&db_path).unwrap();
    let hasher = Arc::new(CountingHasher::default());
    let (_, summary) = DuplicateFinder::with_defaults()
        .with_hasher(hasher.clone())
        .find_duplicates(&dir, Some(&mut reopened))
        .unwrap();

    assert_eq!(hasher.count(), 0);
    assert_eq!(summary.cache_hits, 3);
}

#[test]
fn test_unreadable_file_gets_no_cache_row() {
    struct FailOnC;
    impl ContentHasher for FailOnC {
        fn full_hash(&self, path: &Path) -> Result<Digest, HashError> {
            if path.ends_with("C") {
                return Err(HashError::PermissionDenied(path.to_path_buf()));
            }
            Hasher::new().full_hash(path)
        }
    }

    let (_guard, dir) = abc_dir();
    let mut cache = HashCache::open_in_memory().unwrap();
    let (groups, summary) = DuplicateFinder::with_defaults()
        .with_hasher(Arc::new(FailOnC))
        .find_duplicates(&dir, Some(&mut cache))
        .unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(summary.cache_inserts, 2);
    assert!(cache.get(&dir, "C").unwrap().is_none());
}

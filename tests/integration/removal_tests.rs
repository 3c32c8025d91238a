use dupsweep::actions::DirectoryDisposer;
use dupsweep::cache::HashCache;
use dupsweep::duplicates::{DuplicateFinder, FinderConfig, FinderError};
use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn write_at(dir: &Path, name: &str, content: &str, secs: i64) {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    set_file_mtime(&path, FileTime::from_unix_time(secs, 0)).unwrap();
}

fn removing_finder(holding: &Path) -> DuplicateFinder {
    DuplicateFinder::new(FinderConfig::default().with_remove_duplicates(true))
        .with_disposer(Arc::new(DirectoryDisposer::new(holding)))
}

#[test]
fn test_remove_keeps_older_copy() {
    let dir = tempdir().unwrap();
    let holding = tempdir().unwrap();
    write_at(dir.path(), "A", "same", 1_000_000);
    write_at(dir.path(), "B", "same", 2_000_000);

    let (groups, summary) = removing_finder(holding.path())
        .find_duplicates(dir.path(), None)
        .unwrap();

    assert_eq!(groups.len(), 1);
    assert!(dir.path().join("A").exists());
    assert!(!dir.path().join("B").exists());
    assert!(holding.path().join("B").exists());
    assert_eq!(summary.removal.success_count(), 1);
    assert_eq!(summary.removal.bytes_freed, 4);
}

#[test]
fn test_remove_deletes_n_minus_one_for_distinct_times() {
    let dir = tempdir().unwrap();
    let holding = tempdir().unwrap();
    write_at(dir.path(), "copy3", "payload", 3_000);
    write_at(dir.path(), "copy1", "payload", 1_000);
    write_at(dir.path(), "copy4", "payload", 4_000);
    write_at(dir.path(), "copy2", "payload", 2_000);

    let (_, summary) = removing_finder(holding.path())
        .find_duplicates(dir.path(), None)
        .unwrap();

    assert_eq!(summary.removal.success_count(), 3);
    assert!(dir.path().join("copy1").exists());
    for name in ["copy2", "copy3", "copy4"] {
        assert!(!dir.path().join(name).exists(), "{} should be removed", name);
    }
}

#[test]
fn test_remove_keeps_all_tied_oldest() {
    let dir = tempdir().unwrap();
    let holding = tempdir().unwrap();
    write_at(dir.path(), "a", "x", 5_000);
    write_at(dir.path(), "b", "x", 5_000);
    write_at(dir.path(), "c", "x", 9_000);

    let (_, summary) = removing_finder(holding.path())
        .find_duplicates(dir.path(), None)
        .unwrap();

    assert!(dir.path().join("a").exists());
    assert!(dir.path().join("b").exists());
    assert!(!dir.path().join("c").exists());
    assert_eq!(summary.removal.success_count(), 1);
}

#[test]
fn test_remove_with_identical_times_deletes_nothing() {
    let dir = tempdir().unwrap();
    let holding = tempdir().unwrap();
    write_at(dir.path(), "a", "x", 5_000);
    write_at(dir.path(), "b", "x", 5_000);

    let (groups, summary) = removing_finder(holding.path())
        .find_duplicates(dir.path(), None)
        .unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(summary.removal.success_count(), 0);
    assert!(dir.path().join("a").exists());
    assert!(dir.path().join("b").exists());
}

#[test]
fn test_without_remove_flag_nothing_moves() {
    let dir = tempdir().unwrap();
    let holding = tempdir().unwrap();
    write_at(dir.path(), "A", "same", 1_000_000);
    write_at(dir.path(), "B", "same", 2_000_000);

    let finder = DuplicateFinder::with_defaults()
        .with_disposer(Arc::new(DirectoryDisposer::new(holding.path())));
    let (_, summary) = finder.find_duplicates(dir.path(), None).unwrap();

    assert!(dir.path().join("B").exists());
    assert_eq!(summary.removal.success_count(), 0);
    assert_eq!(fs::read_dir(holding.path()).unwrap().count(), 0);
}

#[test]
fn test_removal_collision_in_holding_directory() {
    let dir = tempdir().unwrap();
    let holding = tempdir().unwrap();
    fs::write(holding.path().join("B.txt"), "earlier run").unwrap();
    write_at(dir.path(), "A.txt", "same", 1_000_000);
    write_at(dir.path(), "B.txt", "same", 2_000_000);

    removing_finder(holding.path())
        .find_duplicates(dir.path(), None)
        .unwrap();

    assert_eq!(
        fs::read_to_string(holding.path().join("B.txt")).unwrap(),
        "earlier run"
    );
    assert_eq!(
        fs::read_to_string(holding.path().join("B (1).txt")).unwrap(),
        "same"
    );
}

#[test]
fn test_removed_file_keeps_its_cache_row() {
    let dir = tempdir().unwrap();
    let holding = tempdir().unwrap();
    write_at(dir.path(), "A", "same", 1_000_000);
    write_at(dir.path(), "B", "same", 2_000_000);
    let canonical = fs::canonicalize(dir.path()).unwrap();
    let mut cache = HashCache::open_in_memory().unwrap();

    let (_, summary) = removing_finder(holding.path())
        .find_duplicates(dir.path(), Some(&mut cache))
        .unwrap();

    assert_eq!(summary.cache_inserts, 2);
    assert!(cache.get(&canonical, "B").unwrap().is_some());

    // The next run sees only A and writes nothing.
    let (groups, second) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path(), Some(&mut cache))
        .unwrap();
    assert!(groups.is_empty());
    assert_eq!(second.total_files, 1);
    assert_eq!(second.cache_writes(), 0);
}

#[test]
fn test_holding_directory_inside_scan_target_is_refused() {
    let dir = tempdir().unwrap();
    write_at(dir.path(), "A", "same", 1_000_000);
    write_at(dir.path(), "B", "same", 2_000_000);
    let mut cache = HashCache::open_in_memory().unwrap();

    // Same directory, spelled through a trailing component.
    let result = removing_finder(&dir.path().join("."))
        .find_duplicates(dir.path(), Some(&mut cache));

    assert!(matches!(result, Err(FinderError::HoldingDirectoryIsScanned(_))));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    assert!(dir.path().join("A").exists());
    assert!(dir.path().join("B").exists());
    assert!(cache.is_empty().unwrap());
}

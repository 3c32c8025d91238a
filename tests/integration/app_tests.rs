//! End-to-end runs through `run_app`.
//!
//! Each test runs inside a figment Jail so that environment overrides set by
//! the config tests never leak into a run.

use clap::Parser;
use dupsweep::cache::HashCache;
use dupsweep::cli::Cli;
use dupsweep::error::ExitCode;
use dupsweep::run_app;
use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn run(args: &[&str]) -> ExitCode {
    let cli = Cli::try_parse_from(args).unwrap();
    run_app(cli).unwrap()
}

fn base_args<'a>(db: &'a str, holding: &'a str, dir: &'a str) -> Vec<&'a str> {
    vec![
        "dupsweep",
        "-q",
        "--config",
        "absent.toml",
        "--cache",
        db,
        "--trash-dir",
        holding,
        dir,
    ]
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[test]
fn test_run_reports_duplicates() {
    figment::Jail::expect_with(|_jail| {
        let dir = tempdir().unwrap();
        let work = tempdir().unwrap();
        fs::write(dir.path().join("A"), "same").unwrap();
        fs::write(dir.path().join("B"), "same").unwrap();
        let db = path_str(&work.path().join("hashes.db"));
        let holding = path_str(work.path());
        let target = path_str(dir.path());

        let code = run(&base_args(&db, &holding, &target));

        assert_eq!(code, ExitCode::Success);
        assert!(dir.path().join("B").exists());
        let cache = HashCache::open(Path::new(&db)).unwrap();
        assert_eq!(cache.len().unwrap(), 2);
        Ok(())
    });
}

#[test]
fn test_run_without_duplicates() {
    figment::Jail::expect_with(|_jail| {
        let dir = tempdir().unwrap();
        let work = tempdir().unwrap();
        fs::write(dir.path().join("only"), "unique").unwrap();
        let db = path_str(&work.path().join("hashes.db"));
        let holding = path_str(work.path());
        let target = path_str(dir.path());

        assert_eq!(
            run(&base_args(&db, &holding, &target)),
            ExitCode::NoDuplicates
        );
        Ok(())
    });
}

#[test]
fn test_run_with_remove() {
    figment::Jail::expect_with(|_jail| {
        let dir = tempdir().unwrap();
        let work = tempdir().unwrap();
        let holding_dir = work.path().join("holding");
        fs::write(dir.path().join("A"), "same").unwrap();
        fs::write(dir.path().join("B"), "same").unwrap();
        set_file_mtime(dir.path().join("A"), FileTime::from_unix_time(1_000, 0)).unwrap();
        set_file_mtime(dir.path().join("B"), FileTime::from_unix_time(2_000, 0)).unwrap();

        let db = path_str(&work.path().join("hashes.db"));
        let holding = path_str(&holding_dir);
        let target = path_str(dir.path());
        let mut args = base_args(&db, &holding, &target);
        args.insert(1, "-r");

        assert_eq!(run(&args), ExitCode::Success);
        assert!(dir.path().join("A").exists());
        assert!(!dir.path().join("B").exists());
        assert!(holding_dir.join("B").exists());
        Ok(())
    });
}

#[test]
fn test_run_with_missing_directory() {
    figment::Jail::expect_with(|_jail| {
        let work = tempdir().unwrap();
        let db = path_str(&work.path().join("hashes.db"));
        let holding = path_str(work.path());
        let missing = path_str(&work.path().join("does-not-exist"));

        assert_eq!(
            run(&base_args(&db, &holding, &missing)),
            ExitCode::GeneralError
        );
        assert!(!work.path().join("hashes.db").exists());
        Ok(())
    });
}

#[test]
fn test_run_with_no_cache_writes_nothing() {
    figment::Jail::expect_with(|_jail| {
        let dir = tempdir().unwrap();
        let work = tempdir().unwrap();
        fs::write(dir.path().join("A"), "same").unwrap();
        fs::write(dir.path().join("B"), "same").unwrap();
        let target = path_str(dir.path());

        let code = run(&[
            "dupsweep",
            "-q",
            "--config",
            "absent.toml",
            "--no-cache",
            target.as_str(),
        ]);

        assert_eq!(code, ExitCode::Success);
        assert_eq!(fs::read_dir(work.path()).unwrap().count(), 0);
        Ok(())
    });
}

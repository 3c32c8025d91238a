//! Command-line application flow.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::actions::{DirectoryDisposer, Disposer, TrashDisposer};
use crate::cache::HashCache;
use crate::cli::{prompt_directory, Cli};
use crate::config::Config;
use crate::duplicates::{DuplicateFinder, DuplicateGroup, FinderConfig, ScanSummary};
use crate::error::ExitCode;
use crate::logging::init_logging;
use crate::progress::Progress;
use crate::signal::install_handler;

/// Run one invocation of the tool.
///
/// Fatal failures (unusable cache, interrupt, unreadable config) are returned
/// as errors; [`ExitCode::from_error`] maps them to a process code.
///
/// # Errors
///
/// See above.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    init_logging(cli.verbose, cli.quiet);

    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_cli(&cli);
    log::debug!("Effective configuration: {:?}", config);

    let dir = match cli.path {
        Some(ref path) => path.clone(),
        None => prompt_directory(io::stdin().lock(), io::stdout())
            .context("Failed to read directory from standard input")?,
    };
    if !dir.is_dir() {
        println!("Directory is not found");
        log::error!("Not a directory: {}", dir.display());
        return Ok(ExitCode::GeneralError);
    }

    let shutdown = install_handler()?;
    let progress = Arc::new(Progress::new(cli.quiet || !config.progress));
    let finder_config = FinderConfig::default()
        .with_threads(config.threads)
        .with_remove_duplicates(cli.remove)
        .with_shutdown_flag(shutdown.get_flag())
        .with_progress_callback(progress);

    let finder = DuplicateFinder::new(finder_config).with_disposer(make_disposer(&config));

    let mut cache = open_cache(&config)?;
    let outcome = finder.find_duplicates(&dir, cache.as_mut());
    if let Some(cache) = cache {
        if let Err(e) = cache.close() {
            log::warn!("Failed to close hash cache cleanly: {}", e);
        }
    }
    let (groups, summary) = outcome?;

    let mut stdout = io::stdout().lock();
    print_report(&mut stdout, &groups, &summary, cli.remove)?;

    Ok(ExitCode::from_summary(&summary))
}

fn make_disposer(config: &Config) -> Arc<dyn Disposer> {
    match config.trash_dir {
        Some(ref dir) => Arc::new(DirectoryDisposer::new(dir.clone())),
        None => Arc::new(TrashDisposer),
    }
}

fn open_cache(config: &Config) -> Result<Option<HashCache>> {
    let Some(path) = config.resolved_cache_path() else {
        if config.use_cache {
            log::warn!("No platform cache directory; hashing without a cache");
        }
        return Ok(None);
    };
    let cache = HashCache::open(&path)
        .with_context(|| format!("Failed to open hash cache at {}", path.display()))?;
    log::debug!("Using hash cache {}", path.display());
    Ok(Some(cache))
}

/// Write the end-of-run report.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn print_report<W: Write>(
    out: &mut W,
    groups: &[DuplicateGroup],
    summary: &ScanSummary,
    removed: bool,
) -> io::Result<()> {
    for (index, group) in groups.iter().enumerate() {
        writeln!(
            out,
            "Group {} [{}] {} files:",
            index + 1,
            group.digest.short_hex(),
            group.len()
        )?;
        for path in &group.paths {
            writeln!(out, "  {}", display_name(&summary.directory, path).display())?;
        }
    }

    writeln!(
        out,
        "Scanned {} files in {:.2?}: {} hashed, {} from cache, {} unreadable",
        summary.total_files,
        summary.scan_duration,
        summary.hashed_files,
        summary.cache_hits,
        summary.unreadable_files.len()
    )?;
    writeln!(
        out,
        "Cache: {} updated, {} added",
        summary.cache_updates, summary.cache_inserts
    )?;

    if groups.is_empty() {
        writeln!(out, "No duplicates found")?;
    } else {
        writeln!(
            out,
            "{} duplicate groups, {} redundant files",
            summary.duplicate_groups, summary.duplicate_files
        )?;
    }

    if removed {
        writeln!(out, "{}", summary.removal.summary())?;
        writeln!(out, "Space recovered: {}", summary.freed_display())?;
        for (path, reason) in &summary.removal.failures {
            writeln!(out, "  failed: {}: {}", path.display(), reason)?;
        }
    }
    Ok(())
}

fn display_name(dir: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(dir)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

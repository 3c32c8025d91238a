//! Logging setup.
//!
//! Every run reports what it did through the `log` facade: duplicate groups,
//! files moved aside, cache rows written, files skipped. Records go to
//! standard output so the run log can be piped or redirected with the rest
//! of the report.
//!
//! The level is chosen by (in priority order):
//!
//! 1. `RUST_LOG` environment variable (if set)
//! 2. CLI flags: `--quiet` (error only) or `--verbose` (debug/trace)
//! 3. Default: info level
//!
//! ```rust,no_run
//! use dupsweep::logging::init_logging;
//!
//! init_logging(0, false);
//! log::info!("Duplicate group abcd1234 (2 files): a.txt, b.txt");
//! ```

use env_logger::{Builder, Target};
use log::LevelFilter;
use std::env;
use std::io::Write;

/// Initialize the logger from the CLI verbosity flags.
///
/// Must be called once, before any log records are emitted.
///
/// * `verbose` - Verbosity count from CLI (0=info, 1=debug, 2+=trace)
/// * `quiet` - Errors only (overridden by `RUST_LOG`)
pub fn init_logging(verbose: u8, quiet: bool) {
    let mut builder = build_logger(verbose, quiet);
    if builder.try_init().is_err() {
        log::debug!("Logger already initialized");
    }
}

fn build_logger(verbose: u8, quiet: bool) -> Builder {
    let mut builder = Builder::new();
    builder.target(Target::Stdout);

    if env::var_os("RUST_LOG").is_some() {
        builder.parse_default_env();
    } else {
        builder.filter_level(determine_level(verbose, quiet));
    }

    configure_format(&mut builder, verbose);
    builder
}

/// Map the CLI flags to a level filter.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

/// Plain `LEVEL message` lines by default; with `-v` add a timestamp and
/// the module path.
fn configure_format(builder: &mut Builder, verbose: u8) {
    if verbose == 0 {
        builder.format(|buf, record| {
            let level = record.level();
            let style = buf.default_level_style(level);
            writeln!(buf, "{style}{:<5}{style:#} {}", level, record.args())
        });
    } else {
        builder.format(|buf, record| {
            let level = record.level();
            let style = buf.default_level_style(level);
            writeln!(
                buf,
                "{} {style}{:<5}{style:#} [{}] {}",
                buf.timestamp_millis(),
                level,
                record.module_path().unwrap_or("unknown"),
                record.args()
            )
        });
    }
}

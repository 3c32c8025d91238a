//! Command-line interface definitions for dupsweep.
//!
//! # Example
//!
//! ```bash
//! # Report duplicates in ~/Downloads, keeping the hash cache warm
//! dupsweep ~/Downloads
//!
//! # Also move every newer copy to the system trash
//! dupsweep -r ~/Downloads
//!
//! # Move newer copies into a holding directory instead
//! dupsweep -r --trash-dir ~/dupes ~/Downloads
//!
//! # Hash everything, touch no cache
//! dupsweep --no-cache ~/Downloads
//! ```

use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Find duplicate files in one directory and optionally keep only the oldest copy.
///
/// Digests are cached per directory in a SQLite database and reused while a
/// file's modification time is unchanged.
#[derive(Debug, Parser)]
#[command(name = "dupsweep")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to scan (prompted for when omitted)
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Remove all but the oldest file of each duplicate group
    ///
    /// Files are moved to the system trash unless --trash-dir is given.
    #[arg(short = 'r', long = "remove")]
    pub remove: bool,

    /// Move removed files into this directory instead of the system trash
    #[arg(long, value_name = "DIR")]
    pub trash_dir: Option<PathBuf>,

    /// Path to the hash cache database
    ///
    /// If not specified, a default platform-specific path is used.
    #[arg(long, value_name = "PATH")]
    pub cache: Option<PathBuf>,

    /// Hash every file and do not read or write the cache
    #[arg(long, conflicts_with = "cache")]
    pub no_cache: bool,

    /// Number of hashing threads (0 = available parallelism)
    #[arg(short = 'j', long, value_name = "N")]
    pub threads: Option<usize>,

    /// Configuration file to use instead of the platform default
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Strip surrounding whitespace and one layer of matching quotes.
///
/// Paths pasted from a file manager often arrive quoted.
///
/// ```
/// use dupsweep::cli::clean_path_input;
/// use std::path::PathBuf;
///
/// assert_eq!(clean_path_input("  \"/tmp/my dir\"\n"), PathBuf::from("/tmp/my dir"));
/// assert_eq!(clean_path_input("'/tmp'"), PathBuf::from("/tmp"));
/// ```
#[must_use]
pub fn clean_path_input(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    let unquoted = ['"', '\'']
        .iter()
        .find_map(|q| {
            trimmed
                .strip_prefix(*q)
                .and_then(|rest| rest.strip_suffix(*q))
        })
        .unwrap_or(trimmed);
    PathBuf::from(unquoted.trim())
}

/// Ask for the directory on `output` and read one line from `input`.
///
/// # Errors
///
/// Returns an I/O error if reading or writing fails, or `UnexpectedEof` when
/// the input is closed before a line arrives.
pub fn prompt_directory<R: BufRead, W: Write>(mut input: R, mut output: W) -> io::Result<PathBuf> {
    write!(output, "Directory to scan: ")?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "no directory given",
        ));
    }
    Ok(clean_path_input(&line))
}

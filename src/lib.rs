//! dupsweep - single-directory duplicate file finder
//!
//! Hashes every file directly inside one directory (BLAKE3), caches each
//! digest together with the file's modification time in SQLite, reports
//! files with identical content, and can keep only the oldest copy of each
//! set by moving the newer ones to the trash.

pub mod actions;
pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod progress;
pub mod scanner;
pub mod signal;

pub use app::run_app;

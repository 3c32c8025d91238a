//! Application configuration.
//!
//! Settings are layered with figment, later layers winning:
//!
//! 1. Built-in defaults
//! 2. `config.toml` in the platform config directory (or `--config FILE`)
//! 3. `DUPSWEEP_*` environment variables
//! 4. Command-line flags ([`Config::apply_cli`])

use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::Cli;

/// Prefix for environment overrides, e.g. `DUPSWEEP_THREADS=4`.
pub const ENV_PREFIX: &str = "DUPSWEEP_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hashing threads; 0 uses the available parallelism.
    pub threads: usize,
    /// Cache database location; `None` uses [`default_cache_path`].
    pub cache_path: Option<PathBuf>,
    /// Read and reconcile the hash cache.
    pub use_cache: bool,
    /// Show the progress bar.
    pub progress: bool,
    /// Holding directory for removed files; `None` uses the system trash.
    pub trash_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threads: 0,
            cache_path: None,
            use_cache: true,
            progress: true,
            trash_dir: None,
        }
    }
}

impl Config {
    /// The provider chain without CLI flags.
    ///
    /// A missing config file is not an error.
    #[must_use]
    pub fn figment(config_file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load from `config_file`, or the platform default location when `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or an environment variable holds a value
    /// of the wrong type.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let path = config_file
            .map(Path::to_path_buf)
            .or_else(default_config_path);
        if let Some(ref p) = path {
            log::debug!("Loading configuration from {}", p.display());
        }

        Self::figment(path.as_deref())
            .extract()
            .context("Invalid configuration")
    }

    /// Overlay command-line flags.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(threads) = cli.threads {
            self.threads = threads;
        }
        if let Some(ref cache) = cli.cache {
            self.cache_path = Some(cache.clone());
            self.use_cache = true;
        }
        if cli.no_cache {
            self.use_cache = false;
        }
        if cli.no_progress || cli.quiet {
            self.progress = false;
        }
        if let Some(ref dir) = cli.trash_dir {
            self.trash_dir = Some(dir.clone());
        }
    }

    /// The cache database to open, or `None` when caching is off or no
    /// platform cache directory exists.
    #[must_use]
    pub fn resolved_cache_path(&self) -> Option<PathBuf> {
        if !self.use_cache {
            return None;
        }
        self.cache_path.clone().or_else(default_cache_path)
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "dupsweep", "dupsweep")
}

/// `<platform config dir>/config.toml`
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|d| d.config_dir().join("config.toml"))
}

/// `<platform cache dir>/hashes.db`
#[must_use]
pub fn default_cache_path() -> Option<PathBuf> {
    project_dirs().map(|d| d.cache_dir().join("hashes.db"))
}

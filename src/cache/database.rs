//! SQLite-backed hash cache database.
//!
//! One table holds every cached file. Rows are namespaced by a directory key
//! (SHA-256 of the directory path) and identified within that namespace by
//! file name.
//!
//! Reconciliation writes are batched: all updates of a run go through one
//! transaction and all inserts through another, so an interrupted run leaves
//! either the whole batch or none of it.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest as _, Sha256};

use super::entry::{decode_timestamp, encode_timestamp, CacheEntry};
use crate::scanner::Digest;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS file (
    directory       BLOB NOT NULL,
    filename        TEXT NOT NULL,
    hash            BLOB NOT NULL,
    last_modified   TEXT NOT NULL,
    PRIMARY KEY(directory, filename)
);
"#;

/// Errors raised by the hash cache.
///
/// Any of these is fatal for a run: reconciling against a cache that cannot
/// be read or written would leave it inconsistent.
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    /// The database file could not be opened or initialized.
    #[error("failed to open hash cache at {path}: {source}")]
    Open {
        /// Database path
        path: PathBuf,
        /// Underlying SQLite error
        #[source]
        source: rusqlite::Error,
    },

    /// A query or write failed.
    #[error("hash cache error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored row could not be decoded.
    #[error("invalid cache row for {filename}: {reason}")]
    InvalidRow {
        /// File name of the offending row
        filename: String,
        /// What was wrong with it
        reason: String,
    },
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Persistent cache for file hashes using SQLite.
///
/// The connection is owned by this value and released when it is dropped or
/// [`close`](Self::close)d.
pub struct HashCache {
    conn: Connection,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for HashCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashCache").field("path", &self.path).finish()
    }
}

impl HashCache {
    /// Opens or creates a hash cache at the specified path.
    ///
    /// Parent directories are created as needed.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Open`] if the database cannot be opened or the
    /// schema cannot be created.
    pub fn open(path: &Path) -> CacheResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::warn!(
                    "Failed to create cache directory {}: {}",
                    parent.display(),
                    e
                );
            }
        }

        let open_err = |source| CacheError::Open {
            path: path.to_path_buf(),
            source,
        };

        let conn = Connection::open(path).map_err(open_err)?;
        conn.execute_batch(SCHEMA).map_err(open_err)?;

        log::debug!("Opened hash cache at {}", path.display());
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Opens a throwaway cache that lives only as long as this value.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Open`] if SQLite cannot allocate the database.
    pub fn open_in_memory() -> CacheResult<Self> {
        let open_err = |source| CacheError::Open {
            path: PathBuf::from(":memory:"),
            source,
        };
        let conn = Connection::open_in_memory().map_err(open_err)?;
        conn.execute_batch(SCHEMA).map_err(open_err)?;
        Ok(Self { conn, path: None })
    }

    /// Path of the database file, or `None` for an in-memory cache.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Close the connection, surfacing any error SQLite reports on close.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Sqlite`] if the connection could not be closed
    /// cleanly.
    pub fn close(self) -> CacheResult<()> {
        self.conn.close().map_err(|(_, e)| CacheError::Sqlite(e))
    }

    /// Namespace key for a directory: SHA-256 of its path string.
    #[must_use]
    pub fn directory_key(dir: &Path) -> [u8; 32] {
        let mut key = [0u8; 32];
        key.copy_from_slice(&Sha256::digest(dir.to_string_lossy().as_bytes()));
        key
    }

    /// Read every cached entry for `dir`, keyed by file name.
    ///
    /// A directory that was never scanned yields an empty map.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] on query failure or an undecodable row.
    pub fn load_all(&self, dir: &Path) -> CacheResult<HashMap<String, CacheEntry>> {
        let key = Self::directory_key(dir);
        let mut stmt = self
            .conn
            .prepare("SELECT filename, hash, last_modified FROM file WHERE directory = ?1")?;

        let rows = stmt.query_map(params![key.as_slice()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Vec<u8>>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut entries = HashMap::new();
        for row in rows {
            let (filename, hash, modified) = row?;
            let entry = decode_row(&filename, &hash, &modified)?;
            entries.insert(filename, entry);
        }

        log::debug!(
            "Loaded {} cached entries for {}",
            entries.len(),
            dir.display()
        );
        Ok(entries)
    }

    /// Look up a single cached entry.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] on query failure or an undecodable row.
    pub fn get(&self, dir: &Path, filename: &str) -> CacheResult<Option<CacheEntry>> {
        let key = Self::directory_key(dir);
        let row = self
            .conn
            .query_row(
                "SELECT hash, last_modified FROM file WHERE directory = ?1 AND filename = ?2",
                params![key.as_slice(), filename],
                |row| Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        row.map(|(hash, modified)| decode_row(filename, &hash, &modified))
            .transpose()
    }

    /// Overwrite digest and timestamp of existing rows, in one transaction.
    ///
    /// Returns the number of rows changed. Entries whose row is missing are
    /// logged and count as unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if any statement fails; the whole batch is
    /// rolled back.
    pub fn apply_updates(
        &mut self,
        dir: &Path,
        changes: &BTreeMap<String, CacheEntry>,
    ) -> CacheResult<usize> {
        if changes.is_empty() {
            return Ok(0);
        }

        let key = Self::directory_key(dir);
        let tx = self.conn.transaction()?;
        let mut changed = 0;
        {
            let mut stmt = tx.prepare(
                "UPDATE file SET hash = ?1, last_modified = ?2 \
                 WHERE directory = ?3 AND filename = ?4",
            )?;
            for (filename, entry) in changes {
                let rows = stmt.execute(params![
                    entry.digest.as_bytes().as_slice(),
                    encode_timestamp(&entry.last_modified),
                    key.as_slice(),
                    filename,
                ])?;
                if rows == 0 {
                    log::warn!("No cached row to update for {}", filename);
                } else {
                    log::info!("Cache entry updated: {} ({})", filename, entry.digest.short_hex());
                }
                changed += rows;
            }
        }
        tx.commit()?;

        log::debug!("Committed {} cache updates for {}", changed, dir.display());
        Ok(changed)
    }

    /// Insert new rows, in one transaction.
    ///
    /// Returns the number of rows inserted.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if any statement fails, including a row that
    /// already exists; the whole batch is rolled back.
    pub fn apply_inserts(
        &mut self,
        dir: &Path,
        changes: &BTreeMap<String, CacheEntry>,
    ) -> CacheResult<usize> {
        if changes.is_empty() {
            return Ok(0);
        }

        let key = Self::directory_key(dir);
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO file (directory, filename, hash, last_modified) \
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (filename, entry) in changes {
                inserted += stmt.execute(params![
                    key.as_slice(),
                    filename,
                    entry.digest.as_bytes().as_slice(),
                    encode_timestamp(&entry.last_modified),
                ])?;
                log::info!("Cache entry added: {} ({})", filename, entry.digest.short_hex());
            }
        }
        tx.commit()?;

        log::debug!("Committed {} cache inserts for {}", inserted, dir.display());
        Ok(inserted)
    }

    /// Total number of rows across all directories.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] on query failure.
    pub fn len(&self) -> CacheResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM file", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Check if the cache holds no rows at all.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] on query failure.
    pub fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len()? == 0)
    }
}

fn decode_row(filename: &str, hash: &[u8], modified: &str) -> CacheResult<CacheEntry> {
    let digest = Digest::from_slice(hash).ok_or_else(|| CacheError::InvalidRow {
        filename: filename.to_string(),
        reason: format!("hash is {} bytes, expected 32", hash.len()),
    })?;
    let last_modified = decode_timestamp(modified).map_err(|e| CacheError::InvalidRow {
        filename: filename.to_string(),
        reason: format!("bad timestamp {modified:?}: {e}"),
    })?;
    Ok(CacheEntry::new(digest, last_modified))
}

//! BLAKE3 content hashing and the digest type used as the grouping key.
//!
//! # Overview
//!
//! [`Digest`] is a 32-byte content fingerprint. Two digests are equal only
//! when every byte matches, which makes it usable directly as a `HashMap`
//! key for duplicate grouping.
//!
//! [`ContentHasher`] is the seam the scanner hashes through. [`Hasher`] is
//! the production implementation; tests substitute instrumented ones.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use super::HashError;

/// Size of a digest in bytes.
pub const DIGEST_LEN: usize = 32;

/// Read buffer used while streaming file content into the hasher.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// A 32-byte content digest.
///
/// Equality, ordering and hashing all operate on the full byte array.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    /// Wrap raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Build a digest from a byte slice, returning `None` unless it is
    /// exactly [`DIGEST_LEN`] bytes long.
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; DIGEST_LEN]>::try_from(bytes).ok().map(Self)
    }

    /// Borrow the raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Lowercase hex rendering.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// First eight hex characters, for log lines.
    #[must_use]
    pub fn short_hex(&self) -> String {
        self.to_hex()[..8].to_string()
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.short_hex())
    }
}

/// Computes content digests.
///
/// Implementations must be deterministic: the same bytes always produce the
/// same digest.
pub trait ContentHasher: Send + Sync {
    /// Hash the full content of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when the file cannot be opened or read.
    fn full_hash(&self, path: &Path) -> Result<Digest, HashError>;
}

/// BLAKE3 hasher that streams file content through a buffered reader.
#[derive(Debug, Clone, Default)]
pub struct Hasher;

impl Hasher {
    /// Create a new hasher.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ContentHasher for Hasher {
    fn full_hash(&self, path: &Path) -> Result<Digest, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);

        let mut hasher = blake3::Hasher::new();
        io::copy(&mut reader, &mut hasher).map_err(|e| HashError::from_io(path, e))?;

        Ok(Digest(*hasher.finalize().as_bytes()))
    }
}

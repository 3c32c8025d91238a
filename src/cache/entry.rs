//! Cache entry definitions.

use std::fs::Metadata;
use std::io;
use std::time::SystemTime;

use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;

use crate::scanner::Digest;

/// Modification timestamp as stored in the cache.
pub type Timestamp = DateTime<Utc>;

/// Digest and modification time recorded for one file.
///
/// The file name and directory key are the row's identity and live outside
/// this struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEntry {
    /// Content digest
    pub digest: Digest,
    /// Modification time observed when the digest was computed
    pub last_modified: Timestamp,
}

impl CacheEntry {
    /// Create a new cache entry.
    #[must_use]
    pub fn new(digest: Digest, last_modified: Timestamp) -> Self {
        Self {
            digest,
            last_modified,
        }
    }

    /// Whether this entry can stand in for a file whose current modification
    /// time is `modified`.
    ///
    /// Only exact equality counts. Any change, including a touch that leaves
    /// content alone, forces a rehash.
    #[must_use]
    pub fn is_valid_for(&self, modified: &Timestamp) -> bool {
        self.last_modified == *modified
    }
}

/// Convert a filesystem time into the cache timestamp type.
#[must_use]
pub fn timestamp_from_system(time: SystemTime) -> Timestamp {
    DateTime::<Utc>::from(time)
}

/// Read the modification time from file metadata.
///
/// # Errors
///
/// Returns the I/O error when the platform does not report modification times.
pub fn modified_timestamp(metadata: &Metadata) -> io::Result<Timestamp> {
    metadata.modified().map(timestamp_from_system)
}

/// Errors from decoding a stored timestamp.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimestampError {
    /// Text is not `<seconds>.<nanoseconds>`
    #[error("expected <seconds>.<nanoseconds>, got {0:?}")]
    Malformed(String),

    /// Fields parse but name no representable instant
    #[error("timestamp {0}.{1:09} is out of range")]
    OutOfRange(i64, u32),
}

/// Encode a timestamp for storage as `<seconds>.<nanoseconds>` since the
/// Unix epoch.
///
/// Seconds are signed and the nanosecond part is always nine digits, so
/// every representable instant survives a round-trip, including years
/// past 9999 and before year 0.
#[must_use]
pub fn encode_timestamp(ts: &Timestamp) -> String {
    format!("{}.{:09}", ts.timestamp(), ts.timestamp_subsec_nanos())
}

/// Decode a timestamp written by [`encode_timestamp`].
///
/// # Errors
///
/// Returns [`TimestampError::Malformed`] when the text does not have the
/// expected shape and [`TimestampError::OutOfRange`] when it names no valid
/// instant.
pub fn decode_timestamp(text: &str) -> Result<Timestamp, TimestampError> {
    let malformed = || TimestampError::Malformed(text.to_string());
    let (secs, nanos) = text.split_once('.').ok_or_else(malformed)?;
    if nanos.len() < 9 || !nanos.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    let secs: i64 = secs.parse().map_err(|_| malformed())?;
    let nanos: u32 = nanos.parse().map_err(|_| malformed())?;
    Utc.timestamp_opt(secs, nanos)
        .single()
        .ok_or(TimestampError::OutOfRange(secs, nanos))
}

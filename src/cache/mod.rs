//! Hash caching module for dupsweep.
//!
//! This module provides persistent storage for file hashes to speed up
//! subsequent scans by avoiding re-hashing of unchanged files.
//!
//! # Architecture
//!
//! The caching system is split into two main components:
//!
//! * [`database`]: SQLite persistence, schema creation and the batched
//!   reconciliation writes.
//! * [`entry`]: The stored record and timestamp encoding.
//!
//! # Cache Invalidation
//!
//! Rows are keyed by (directory key, file name). A cached digest is reused
//! only when the file's current modification time equals the stored one
//! exactly; any other value triggers a rehash and an update of the row.
//! Rows are never deleted, so entries for removed files simply go unread.

pub mod database;
pub mod entry;

pub use database::{CacheError, CacheResult, HashCache};
pub use entry::{CacheEntry, Timestamp, TimestampError};

//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Grouping scan results by content digest
//! - The keep-oldest retention policy
//! - The end-to-end run pipeline ([`DuplicateFinder`])

pub mod finder;
pub mod groups;
pub mod retention;

pub use finder::{DuplicateFinder, FinderConfig, FinderError, ScanSummary};
pub use groups::{duplicate_groups, group_by_digest, DuplicateGroup};
pub use retention::{plan_retention, select_deletions, RetentionPlan};

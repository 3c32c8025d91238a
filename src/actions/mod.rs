//! File actions module.
//!
//! Duplicate removal is always recoverable: files go to the system trash
//! (default) or to a holding directory chosen by the user.
//!
//! ```no_run
//! use dupsweep::actions::{Disposer, TrashDisposer};
//! use std::path::Path;
//!
//! let result = TrashDisposer.dispose(Path::new("/path/to/duplicate.txt"));
//! ```

pub mod delete;

// Re-export commonly used types
pub use delete::{
    dispose_batch, validate_preserves_copy, BatchDeleteResult, DeleteError, DeleteResult,
    DirectoryDisposer, Disposer, TrashDisposer,
};

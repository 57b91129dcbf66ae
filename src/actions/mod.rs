//! Caller-side file actions.
//!
//! The scan core only reads files. Removing the duplicates a user picked
//! after review lives here:
//! - Move to system trash (default, recoverable)
//! - Permanent deletion (requires explicit flag)
//! - Pruning deleted paths from collision groups
//!
//! The `delete` command only uses the first two. [`prune_groups`] is for
//! library callers that keep a scan's groups in memory while the user
//! reviews them, and want the groups updated after each deletion.
//!
//! ```no_run
//! use duplicut::actions::{delete_file, DeleteMode};
//! use std::path::Path;
//!
//! let result = delete_file(Path::new("/path/to/duplicate.txt"), DeleteMode::Trash);
//! ```

pub mod delete;

pub use delete::{
    confirm_delete, delete_batch, delete_file, prune_groups, BatchDeleteResult, DeleteError,
    DeleteMode, DeleteResult,
};

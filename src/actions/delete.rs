//! Deleting reviewed duplicates.
//!
//! # Overview
//!
//! Scanning never touches files. Once the user has reviewed the collision
//! groups, the paths they picked are removed here:
//! - [`DeleteMode::Trash`] moves files to the system trash (default,
//!   recoverable)
//! - [`DeleteMode::Permanent`] removes them for good
//!
//! Batches keep going past failures; every failure is reported with its
//! path. [`prune_groups`] then drops deleted paths from the groups so the
//! remaining review list stays accurate.
//!
//! # Example
//!
//! ```no_run
//! use duplicut::actions::delete::{delete_file, DeleteMode};
//! use std::path::Path;
//!
//! match delete_file(Path::new("/path/to/copy.jpg"), DeleteMode::Trash) {
//!     Ok(result) => println!("Moved to trash: {}", result.path.display()),
//!     Err(e) => eprintln!("Failed: {}", e),
//! }
//! ```

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::duplicates::CollisionGroup;

/// Error type for deletion operations.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// File was not found (may have been deleted or moved).
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Permission denied when attempting to delete.
    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    /// The path is a directory; only files are deleted.
    #[error("not a file: {}", .0.display())]
    NotAFile(PathBuf),

    /// Trash operation failed.
    #[error("trash operation failed for {}: {message}", .path.display())]
    TrashFailed {
        /// File that could not be trashed
        path: PathBuf,
        /// Platform error text
        message: String,
    },

    /// General I/O error.
    #[error("I/O error for {}: {source}", .path.display())]
    Io {
        /// File being deleted
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

impl DeleteError {
    /// Get the path associated with this error.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::NotAFile(p)
            | Self::TrashFailed { path: p, .. }
            | Self::Io { path: p, .. } => p,
        }
    }

    fn from_io(path: &Path, e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: e,
            },
        }
    }
}

/// How files are removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeleteMode {
    /// Move to the system trash.
    #[default]
    Trash,
    /// Remove permanently.
    Permanent,
}

/// Result of a successful deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteResult {
    /// Path that was deleted.
    pub path: PathBuf,
    /// Size of the deleted file in bytes.
    pub size: u64,
    /// How it was deleted.
    pub mode: DeleteMode,
}

/// Results of a batch deletion.
#[derive(Debug, Default)]
pub struct BatchDeleteResult {
    /// Successfully deleted files.
    pub successes: Vec<DeleteResult>,
    /// Failed deletions.
    pub failures: Vec<DeleteError>,
    /// Files the user declined to delete.
    pub skipped: Vec<PathBuf>,
}

impl BatchDeleteResult {
    /// Number of successful deletions.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    /// Number of failed deletions.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Check if all attempted deletions succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Total bytes freed.
    #[must_use]
    pub fn bytes_freed(&self) -> u64 {
        self.successes.iter().map(|r| r.size).sum()
    }

    /// Paths that are gone after this batch.
    pub fn deleted_paths(&self) -> impl Iterator<Item = &Path> {
        self.successes.iter().map(|r| r.path.as_path())
    }

    /// Human-readable summary of the operation.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut text = format!(
            "Deleted {} file(s), freed {} bytes",
            self.success_count(),
            self.bytes_freed()
        );
        if !self.failures.is_empty() {
            text.push_str(&format!(", {} failed", self.failure_count()));
        }
        if !self.skipped.is_empty() {
            text.push_str(&format!(", {} skipped", self.skipped.len()));
        }
        text
    }
}

/// Delete one file.
///
/// # Errors
///
/// - `NotFound` / `PermissionDenied` / `Io` if the file cannot be inspected
/// - `NotAFile` for directories
/// - `TrashFailed` or `Io` if the removal itself fails
pub fn delete_file(path: &Path, mode: DeleteMode) -> Result<DeleteResult, DeleteError> {
    let metadata = fs::symlink_metadata(path).map_err(|e| DeleteError::from_io(path, e))?;
    if metadata.is_dir() {
        return Err(DeleteError::NotAFile(path.to_path_buf()));
    }
    let size = metadata.len();

    match mode {
        DeleteMode::Trash => {
            trash::delete(path).map_err(|e| {
                log::error!("Trash operation failed for {}: {}", path.display(), e);
                DeleteError::TrashFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
            })?;
            log::info!("Moved to trash: {} ({} bytes)", path.display(), size);
        }
        DeleteMode::Permanent => {
            fs::remove_file(path).map_err(|e| {
                log::error!("Permanent delete failed for {}: {}", path.display(), e);
                DeleteError::from_io(path, e)
            })?;
            log::info!("Permanently deleted: {} ({} bytes)", path.display(), size);
        }
    }

    Ok(DeleteResult {
        path: path.to_path_buf(),
        size,
        mode,
    })
}

/// Delete `paths` one by one, asking `confirm` before each.
///
/// A declined path is recorded in `skipped`; a failure is recorded and the
/// batch continues.
pub fn delete_batch<C>(paths: &[PathBuf], mode: DeleteMode, mut confirm: C) -> BatchDeleteResult
where
    C: FnMut(&Path) -> bool,
{
    let mut result = BatchDeleteResult::default();

    for path in paths {
        if !confirm(path) {
            log::debug!("Skipped {}", path.display());
            result.skipped.push(path.clone());
            continue;
        }
        match delete_file(path, mode) {
            Ok(deleted) => result.successes.push(deleted),
            Err(e) => {
                log::warn!("{}", e);
                result.failures.push(e);
            }
        }
    }

    log::info!("{}", result.summary());
    result
}

/// Ask whether `path` should be deleted. Anything but `y`/`yes` is a no.
///
/// # Errors
///
/// Returns an error if the prompt cannot be written or the answer read.
pub fn confirm_delete<R: BufRead, W: Write>(
    path: &Path,
    mode: DeleteMode,
    input: &mut R,
    output: &mut W,
) -> io::Result<bool> {
    let verb = match mode {
        DeleteMode::Trash => "move to the trash",
        DeleteMode::Permanent => "permanently delete",
    };
    write!(output, "Are you sure you want to {} {}? [y/N] ", verb, path.display())?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

/// Drop `deleted` paths from `groups` and discard groups left with fewer
/// than two members.
///
/// Library API for callers holding scan results in memory; the `delete`
/// command works on plain paths and does not call this.
pub fn prune_groups<'a, I>(groups: &mut Vec<CollisionGroup>, deleted: I)
where
    I: IntoIterator<Item = &'a Path>,
{
    for path in deleted {
        for group in groups.iter_mut() {
            if group.remove(path) {
                break;
            }
        }
    }
    groups.retain(CollisionGroup::has_duplicates);
}

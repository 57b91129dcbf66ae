//! Root enumeration.
//!
//! # Overview
//!
//! The [`Walker`] turns a list of scan roots into one flat list of file
//! paths. Each root is traversed depth-first; within a directory, entries
//! are visited in name order so two scans of the same tree list files in the
//! same order.
//!
//! Enumeration runs to completion before hashing begins, so the number of
//! files it returns is the final denominator for progress reporting.
//!
//! # Error handling
//!
//! A directory that cannot be listed (permission denied, removed mid-walk,
//! root that is not a directory) is logged and skipped. Its siblings are
//! still visited; one bad entry never aborts the walk of a root.
//!
//! # Example
//!
//! ```no_run
//! use duplicut::scanner::{OsFileSystem, Walker};
//! use duplicut::signal::CancelToken;
//! use std::path::PathBuf;
//!
//! let roots = vec![PathBuf::from(".")];
//! let (files, _stats) = Walker::new(&OsFileSystem).walk(&roots, &CancelToken::new());
//! println!("Found {} files", files.len());
//! ```

use std::path::{Path, PathBuf};

use super::fs::{DirEntry, FileSystem};
use crate::signal::CancelToken;

/// Counters gathered while enumerating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Directories listed successfully
    pub dirs_listed: usize,
    /// Directories that could not be listed and were skipped
    pub skipped_dirs: usize,
    /// Whether enumeration stopped early because of cancellation
    pub interrupted: bool,
}

/// Sequential depth-first enumerator over a [`FileSystem`].
#[derive(Debug)]
pub struct Walker<'a, F: FileSystem + ?Sized> {
    fs: &'a F,
}

impl<'a, F: FileSystem + ?Sized> Walker<'a, F> {
    /// Create a walker over `fs`.
    #[must_use]
    pub fn new(fs: &'a F) -> Self {
        Self { fs }
    }

    /// Enumerate every non-directory entry under `roots`.
    ///
    /// Roots are walked in the order given. The cancellation token is
    /// checked before each directory is listed; once it is set the files
    /// found so far are returned with `interrupted` set.
    pub fn walk(&self, roots: &[PathBuf], cancel: &CancelToken) -> (Vec<PathBuf>, WalkStats) {
        let mut files = Vec::new();
        let mut stats = WalkStats::default();

        for root in roots {
            if cancel.is_cancelled() {
                stats.interrupted = true;
                break;
            }
            log::debug!("Walking root {}", root.display());
            let before = files.len();
            self.walk_root(root, cancel, &mut files, &mut stats);
            log::debug!(
                "Root {} contributed {} files",
                root.display(),
                files.len() - before
            );
            if stats.interrupted {
                break;
            }
        }

        (files, stats)
    }

    /// Depth-first pre-order walk of one root with an explicit stack, so
    /// deeply nested trees cannot overflow the thread stack.
    fn walk_root(
        &self,
        root: &Path,
        cancel: &CancelToken,
        files: &mut Vec<PathBuf>,
        stats: &mut WalkStats,
    ) {
        let mut stack: Vec<(PathBuf, std::vec::IntoIter<DirEntry>)> = Vec::new();
        if let Some(entries) = self.list_sorted(root, stats) {
            stack.push((root.to_path_buf(), entries.into_iter()));
        }

        while let Some((dir, entries)) = stack.last_mut() {
            let Some(entry) = entries.next() else {
                stack.pop();
                continue;
            };

            let path = dir.join(&entry.name);
            if !entry.is_dir {
                log::trace!("Found file: {}", path.display());
                files.push(path);
                continue;
            }

            if cancel.is_cancelled() {
                log::debug!("Walker: cancellation requested, stopping");
                stats.interrupted = true;
                return;
            }
            if let Some(children) = self.list_sorted(&path, stats) {
                stack.push((path, children.into_iter()));
            }
        }
    }

    fn list_sorted(&self, dir: &Path, stats: &mut WalkStats) -> Option<Vec<DirEntry>> {
        match self.fs.list_entries(dir) {
            Ok(mut entries) => {
                entries.sort_by(|a, b| a.name.cmp(&b.name));
                stats.dirs_listed += 1;
                Some(entries)
            }
            Err(e) => {
                log::debug!("Skipping directory {}: {}", dir.display(), e);
                stats.skipped_dirs += 1;
                None
            }
        }
    }
}

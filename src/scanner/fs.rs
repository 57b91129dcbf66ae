//! Filesystem capability used by the scanner.
//!
//! The walker only needs to list a directory and the hasher only needs to
//! open a file for sequential reading. Keeping these behind [`FileSystem`]
//! lets tests inject unreadable files, failing reads and slow reads without
//! depending on the permissions of the user running them.

use std::ffi::OsString;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// File name relative to the listed directory
    pub name: OsString,
    /// Whether the entry is a directory (symlinks are never directories)
    pub is_dir: bool,
}

impl DirEntry {
    /// Create a new directory entry.
    #[must_use]
    pub fn new(name: impl Into<OsString>, is_dir: bool) -> Self {
        Self {
            name: name.into(),
            is_dir,
        }
    }
}

/// Minimal filesystem operations consumed by a scan.
pub trait FileSystem: Send + Sync {
    /// List the entries of `dir`. Order is not significant.
    ///
    /// # Errors
    ///
    /// Any error reading the directory itself.
    fn list_entries(&self, dir: &Path) -> io::Result<Vec<DirEntry>>;

    /// Open `path` for sequential reading.
    ///
    /// # Errors
    ///
    /// Any error opening the file.
    fn open_for_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>>;
}

/// [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn list_entries(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    log::debug!("Skipping unreadable entry in {}: {}", dir.display(), e);
                    continue;
                }
            };
            // file_type() does not follow symlinks
            let is_dir = match entry.file_type() {
                Ok(t) => t.is_dir(),
                Err(e) => {
                    log::debug!(
                        "Skipping entry without file type {}: {}",
                        entry.path().display(),
                        e
                    );
                    continue;
                }
            };
            entries.push(DirEntry::new(entry.file_name(), is_dir));
        }
        Ok(entries)
    }

    fn open_for_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(fs::File::open(path)?))
    }
}

impl<T: FileSystem + ?Sized> FileSystem for &T {
    fn list_entries(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        (**self).list_entries(dir)
    }

    fn open_for_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        (**self).open_for_read(path)
    }
}

impl<T: FileSystem + ?Sized> FileSystem for std::sync::Arc<T> {
    fn list_entries(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        (**self).list_entries(dir)
    }

    fn open_for_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        (**self).open_for_read(path)
    }
}

//! Scanner module for directory traversal and file fingerprinting.
//!
//! This module provides functionality for:
//! - Sequential depth-first enumeration of every scan root
//! - Streaming content fingerprints (SHA-256 or BLAKE3)
//! - A small filesystem abstraction so both can run against fakes in tests
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`fs`]: The filesystem capability consumed by the walker and hasher
//! - [`walker`]: Root enumeration into a flat file list
//! - [`hasher`]: Chunked streaming fingerprints
//!
//! # Example
//!
//! ```no_run
//! use duplicut::scanner::{OsFileSystem, Walker};
//! use duplicut::signal::CancelToken;
//! use std::path::PathBuf;
//!
//! let roots = vec![PathBuf::from("/home/user/Downloads")];
//! let walker = Walker::new(&OsFileSystem);
//! let (files, stats) = walker.walk(&roots, &CancelToken::new());
//! println!("{} files, {} unreadable directories", files.len(), stats.skipped_dirs);
//! ```

pub mod fs;
pub mod hasher;
pub mod walker;

use std::path::PathBuf;

// Re-export main types
pub use fs::{DirEntry, FileSystem, OsFileSystem};
pub use hasher::{Fingerprint, HashAlgorithm, Hasher};
pub use walker::{WalkStats, Walker};

/// Errors that can occur while fingerprinting one file.
///
/// These are always local to the file: the scan counts them and moves on.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The file could not be opened.
    #[error("Failed to open {path}: {source}")]
    Open {
        /// Path that failed to open
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A read failed before end of file.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Path of the file that failed.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Open { path, .. } | Self::Read { path, .. } => path,
        }
    }

    /// Whether the error was a permission problem.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        let source = match self {
            Self::Open { source, .. } | Self::Read { source, .. } => source,
        };
        source.kind() == std::io::ErrorKind::PermissionDenied
    }
}

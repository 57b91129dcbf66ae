//! JSON output formatter for scan results.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "duplicates": [
//!     {
//!       "fingerprint": "2cf24dba5fb0a30e...",
//!       "algorithm": "sha256",
//!       "files": ["/path/to/file1.txt", "/path/to/file2.txt"]
//!     }
//!   ],
//!   "summary": {
//!     "total_files": 3,
//!     "processed_files": 3,
//!     "errored_files": 0,
//!     "skipped_dirs": 0,
//!     "duplicate_groups": 1,
//!     "duplicate_files": 1,
//!     "peak_in_flight": 3,
//!     "started_at": "2024-05-01T10:00:00+02:00",
//!     "finished_at": "2024-05-01T10:00:01+02:00",
//!     "duration_ms": 1234,
//!     "exit_code": 0,
//!     "exit_code_name": "DC000"
//!   }
//! }
//! ```

use std::io::Write;

use serde::Serialize;

use crate::duplicates::{CollisionGroup, ScanSummary};
use crate::error::ExitCode;
use crate::scanner::HashAlgorithm;

/// A single collision group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// Fingerprint as lowercase hex (64 characters)
    pub fingerprint: String,
    /// Digest that produced the fingerprint
    pub algorithm: HashAlgorithm,
    /// Member paths
    pub files: Vec<String>,
}

impl JsonDuplicateGroup {
    /// Convert a collision group.
    #[must_use]
    pub fn from_group(group: &CollisionGroup, algorithm: HashAlgorithm) -> Self {
        Self {
            fingerprint: group.fingerprint.to_hex(),
            algorithm,
            files: group
                .paths
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
        }
    }
}

/// Summary statistics plus the exit code in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Scan statistics
    #[serde(flatten)]
    pub scan: ScanSummary,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "DC000")
    pub exit_code_name: String,
}

/// Complete JSON document.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Collision groups
    pub duplicates: Vec<JsonDuplicateGroup>,
    /// Scan summary
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Build the document for a finished scan.
    #[must_use]
    pub fn new(
        groups: &[CollisionGroup],
        summary: &ScanSummary,
        algorithm: HashAlgorithm,
        exit_code: ExitCode,
    ) -> Self {
        Self {
            duplicates: groups
                .iter()
                .map(|g| JsonDuplicateGroup::from_group(g, algorithm))
                .collect(),
            summary: JsonSummary {
                scan: summary.clone(),
                exit_code: exit_code.as_i32(),
                exit_code_name: exit_code.code_prefix().to_string(),
            },
        }
    }

    /// Serialize to compact JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the document followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        if pretty {
            serde_json::to_writer_pretty(&mut *writer, self)?;
        } else {
            serde_json::to_writer(&mut *writer, self)?;
        }
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors from writing JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// Serialization failed.
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Writing failed.
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}

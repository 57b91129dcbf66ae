//! Human-readable scan report.
//!
//! ```text
//! Detected 2 collision groups in 1.42s
//!
//! Collision Group 1/2 (sha256:2cf24dba5fb0...)
//!   /photos/a.jpg
//!   /backup/a.jpg
//! ...
//!
//! 1204 files: 1202 hashed, 2 errors, 0 skipped directories
//! ```

use std::fmt::Display;
use std::io::{self, Write};

use yansi::{Condition, Paint};

use crate::duplicates::{CollisionGroup, ScanSummary};
use crate::scanner::HashAlgorithm;

/// Characters of the fingerprint shown in group headers.
const FINGERPRINT_PREFIX_LEN: usize = 12;

/// Text formatter for a completed scan.
#[derive(Debug)]
pub struct TextReport<'a> {
    groups: &'a [CollisionGroup],
    summary: &'a ScanSummary,
    algorithm: HashAlgorithm,
    color: bool,
}

impl<'a> TextReport<'a> {
    /// Create an uncolored report.
    #[must_use]
    pub fn new(
        groups: &'a [CollisionGroup],
        summary: &'a ScanSummary,
        algorithm: HashAlgorithm,
    ) -> Self {
        Self {
            groups,
            summary,
            algorithm,
            color: false,
        }
    }

    /// Enable or disable ANSI colors.
    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    fn condition(&self) -> Condition {
        if self.color {
            Condition::ALWAYS
        } else {
            Condition::NEVER
        }
    }

    /// Write the report.
    ///
    /// # Errors
    ///
    /// Returns any error from `writer`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let when = self.condition();
        let total = self.groups.len();

        writeln!(
            writer,
            "Detected {} collision groups in {}",
            total.bold().whenever(when),
            self.summary.duration_display()
        )?;

        if total == 0 {
            writeln!(writer, "{}", "No Collision!".green().whenever(when))?;
        }

        for (index, group) in self.groups.iter().enumerate() {
            let hex = group.fingerprint.to_hex();
            let short = &hex[..FINGERPRINT_PREFIX_LEN.min(hex.len())];
            writeln!(writer)?;
            writeln!(
                writer,
                "{} {}",
                format!("Collision Group {}/{}", index + 1, total)
                    .cyan()
                    .bold()
                    .whenever(when),
                format!("({}:{}...)", self.algorithm, short).dim().whenever(when)
            )?;
            for path in &group.paths {
                writeln!(writer, "  {}", path.display())?;
            }
        }

        writeln!(writer)?;
        writeln!(
            writer,
            "{} files: {} hashed, {} errors, {} skipped directories",
            self.summary.total_files,
            self.summary.processed_files,
            warn_if_nonzero(self.summary.errored_files, when),
            warn_if_nonzero(self.summary.skipped_dirs, when),
        )?;
        Ok(())
    }

    /// Render the report into a string.
    #[must_use]
    pub fn render(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.write_to(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

fn warn_if_nonzero(count: usize, when: Condition) -> impl Display {
    let condition = if count > 0 { when } else { Condition::NEVER };
    count.yellow().whenever(condition).to_string()
}

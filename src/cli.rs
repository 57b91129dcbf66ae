//! Command-line interface definitions.
//!
//! # Example
//!
//! ```bash
//! # Scan two directory trees
//! duplicut scan ~/Pictures /mnt/backup/Pictures
//!
//! # Scan the roots listed in the config file, JSON output
//! duplicut scan --output json
//!
//! # Fewer concurrent reads on a spinning disk
//! duplicut scan ~/Music --concurrency 4 --buffer-size 1048576
//!
//! # Move reviewed copies to the trash
//! duplicut delete ~/Pictures/copy-1.jpg ~/Pictures/copy-2.jpg
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::ScanOverrides;
use crate::scanner::HashAlgorithm;

/// Find byte-identical files across directory trees.
///
/// Every file under the given roots is fingerprinted with a cryptographic
/// digest; files sharing a fingerprint are reported as a collision group.
#[derive(Debug, Parser)]
#[command(name = "duplicut")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Configuration file (default: config.toml in the platform config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Report fatal errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan directory trees for duplicate files
    Scan(ScanArgs),
    /// Delete files picked from a scan report
    Delete(DeleteArgs),
    /// Show or save the effective configuration
    Config(ConfigArgs),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Root directories to scan. Defaults to the configured roots.
    ///
    /// Roots must not overlap: a root may not be inside another root.
    #[arg(value_name = "ROOT")]
    pub roots: Vec<PathBuf>,

    /// Maximum number of files hashed at once
    #[arg(short = 'c', long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Bytes read per chunk while hashing
    #[arg(short = 'b', long, value_name = "BYTES")]
    pub buffer_size: Option<usize>,

    /// Fingerprint digest
    #[arg(short = 'a', long, value_enum)]
    pub algorithm: Option<HashAlgorithm>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl ScanArgs {
    /// Flag values that override configuration.
    #[must_use]
    pub fn overrides(&self) -> ScanOverrides {
        ScanOverrides {
            concurrency: self.concurrency,
            buffer_size: self.buffer_size,
            algorithm: self.algorithm,
        }
    }
}

/// Arguments for the delete subcommand.
#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Files to delete
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,

    /// Remove files permanently instead of moving them to the trash
    ///
    /// Warning: Files cannot be recovered after permanent deletion.
    #[arg(long)]
    pub permanent: bool,

    /// Skip the per-file confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// Arguments for the config subcommand.
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Write the effective settings to the config file
    ///
    /// Uses `--config` when given, otherwise the platform config directory.
    #[arg(long)]
    pub save: bool,

    /// Override concurrency before showing or saving
    #[arg(short = 'c', long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Override buffer size before showing or saving
    #[arg(short = 'b', long, value_name = "BYTES")]
    pub buffer_size: Option<usize>,

    /// Override the digest before showing or saving
    #[arg(short = 'a', long, value_enum)]
    pub algorithm: Option<HashAlgorithm>,
}

impl ConfigArgs {
    /// Flag values that override configuration.
    #[must_use]
    pub fn overrides(&self) -> ScanOverrides {
        ScanOverrides {
            concurrency: self.concurrency,
            buffer_size: self.buffer_size,
            algorithm: self.algorithm,
        }
    }
}

/// Output format for scan results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report
    #[default]
    Text,
    /// JSON for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

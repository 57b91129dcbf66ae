//! duplicut - concurrent duplicate file finder
//!
//! Walks one or more non-overlapping directory trees, fingerprints every
//! file with a cryptographic digest on a bounded pool of workers, and
//! reports the groups of byte-identical files.
//!
//! The library side is usable on its own:
//!
//! ```no_run
//! use duplicut::duplicates::FinderConfig;
//! use duplicut::roots::RootSet;
//! use duplicut::session::ScanSession;
//!
//! let mut roots = RootSet::new();
//! roots.add("/home/user/Pictures").unwrap();
//! roots.add("/mnt/backup/Pictures").unwrap();
//!
//! let handle = ScanSession::start(&roots, FinderConfig::default()).unwrap();
//! let outcome = handle.wait().unwrap();
//! for group in outcome.groups() {
//!     println!("{:?}", group.paths);
//! }
//! ```

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod roots;
pub mod scanner;
pub mod session;
pub mod signal;

use std::io::{self, IsTerminal};

use anyhow::{bail, Context, Result};

use crate::actions::{confirm_delete, delete_batch, DeleteMode};
use crate::cli::{Cli, Commands, ConfigArgs, DeleteArgs, OutputFormat, ScanArgs};
use crate::config::Config;
use crate::error::ExitCode;
use crate::output::{JsonOutput, TextReport};
use crate::progress::{Progress, ProgressCallback};
use crate::roots::RootSet;
use crate::scanner::OsFileSystem;
use crate::session::{ScanEvent, ScanSession};
use crate::signal::CancelToken;

/// Run the command line application and return the process exit code.
///
/// # Errors
///
/// Returns an error for anything that prevents the command from running:
/// bad configuration, overlapping roots, or failing to write output.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    if let Err(e) = logging::init_logging(cli.verbose, cli.quiet) {
        eprintln!("Warning: logging unavailable: {}", e);
    }

    match cli.command {
        Commands::Scan(ref args) => run_scan(&cli, args),
        Commands::Delete(ref args) => run_delete(args),
        Commands::Config(ref args) => run_config(&cli, args),
    }
}

fn run_scan(cli: &Cli, args: &ScanArgs) -> Result<ExitCode> {
    let config = Config::load(cli.config.as_deref(), &args.overrides())
        .context("Failed to load configuration")?;

    let root_paths = if args.roots.is_empty() {
        config.roots.clone()
    } else {
        args.roots.clone()
    };
    if root_paths.is_empty() {
        bail!("No roots to scan: pass directories or set `roots` in the config file");
    }
    let roots = RootSet::from_paths(root_paths).context("Invalid scan roots")?;

    let cancel = CancelToken::new();
    signal::install_handler(&cancel).context("Failed to install Ctrl+C handler")?;
    let handle =
        ScanSession::start_with_cancel(&roots, config.finder_config(), OsFileSystem, cancel)
            .context("Failed to start scan")?;

    let progress = Progress::new(cli.quiet || args.no_progress);
    for event in handle.events().iter() {
        match event {
            ScanEvent::PhaseStarted { phase, total } => progress.on_phase_start(phase, total),
            ScanEvent::Progress(snapshot) => progress.on_progress(&snapshot),
            ScanEvent::PhaseFinished(phase) => progress.on_phase_end(phase),
            ScanEvent::Finished(_) => break,
        }
    }

    let outcome = handle.wait().context("Scan failed")?;
    let exit_code = ExitCode::for_outcome(&outcome);
    if outcome.is_cancelled() {
        let summary = outcome.summary();
        eprintln!(
            "Scan cancelled after {} ({}/{} files hashed)",
            summary.duration_display(),
            summary.processed_files + summary.errored_files,
            summary.total_files
        );
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.output {
        OutputFormat::Text => {
            if !outcome.is_cancelled() {
                let color = !cli.no_color && stdout.is_terminal();
                TextReport::new(outcome.groups(), outcome.summary(), config.algorithm)
                    .with_color(color)
                    .write_to(&mut out)
                    .context("Failed to write report")?;
            }
        }
        OutputFormat::Json => {
            JsonOutput::new(
                outcome.groups(),
                outcome.summary(),
                config.algorithm,
                exit_code,
            )
            .write_to(&mut out, true)
            .context("Failed to write JSON output")?;
        }
    }

    Ok(exit_code)
}

fn run_delete(args: &DeleteArgs) -> Result<ExitCode> {
    let mode = if args.permanent {
        DeleteMode::Permanent
    } else {
        DeleteMode::Trash
    };

    let result = if args.yes {
        delete_batch(&args.paths, mode, |_| true)
    } else {
        if !io::stdin().is_terminal() {
            bail!("Refusing to delete without confirmation: pass --yes when stdin is not a terminal");
        }
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut prompt = io::stderr();
        delete_batch(&args.paths, mode, |path| {
            confirm_delete(path, mode, &mut input, &mut prompt).unwrap_or_else(|e| {
                log::warn!("Could not read confirmation: {}", e);
                false
            })
        })
    };

    for failure in &result.failures {
        eprintln!("Error: {}", failure);
    }
    println!("{}", result.summary());

    Ok(if result.all_succeeded() {
        ExitCode::Success
    } else {
        ExitCode::PartialSuccess
    })
}

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<ExitCode> {
    // Saving may create the file named by --config.
    let source = cli
        .config
        .as_deref()
        .filter(|path| !args.save || path.exists());
    let config = Config::load(source, &args.overrides())
        .context("Failed to load configuration")?;

    if args.save {
        let path = match cli.config {
            Some(ref path) => {
                config.save(path)?;
                path.clone()
            }
            None => config.save_default()?,
        };
        if !cli.quiet {
            eprintln!("Saved configuration to {}", path.display());
        }
    }

    let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
    print!("{}", rendered);
    Ok(ExitCode::Success)
}

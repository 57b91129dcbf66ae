//! Progress reporting.
//!
//! Scan code reports through the [`ProgressCallback`] trait and knows
//! nothing about terminals. [`Progress`] is the indicatif implementation
//! used by the command line; sessions also forward every callback onto their
//! event channel (see [`crate::session`]).

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::Serialize;

/// Pipeline phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Walking the roots into a file list
    Enumerating,
    /// Fingerprinting the file list
    Hashing,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Enumerating => f.write_str("enumerating"),
            Self::Hashing => f.write_str("hashing"),
        }
    }
}

/// Counters published after every finished hashing task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    /// Files fingerprinted successfully
    pub processed: usize,
    /// Files that failed to open or read
    pub errored: usize,
    /// Files discovered by enumeration
    pub total: usize,
}

impl ProgressSnapshot {
    /// Files finished either way.
    #[must_use]
    pub fn done(&self) -> usize {
        self.processed + self.errored
    }

    /// Completed fraction in `0.0..=1.0`. An empty scan reports `0.0`.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.done() as f64 / self.total as f64
        }
    }

    /// Whether every file has been accounted for.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.done() == self.total
    }
}

/// Progress callback for scan phases.
///
/// Implement this trait to receive progress updates during a scan.
/// `on_progress` is called from hashing threads while the collision map
/// lock is held, so implementations must be quick and must not call back
/// into the scan.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts. `total` is 0 for enumeration, whose size
    /// is unknown until it finishes.
    fn on_phase_start(&self, phase: Phase, total: usize);

    /// Called after every finished hashing task.
    fn on_progress(&self, snapshot: &ProgressSnapshot);

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: Phase);
}

/// Progress reporter using indicatif.
pub struct Progress {
    bar: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use duplicut::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            quiet,
        }
    }

    fn enumerating_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn hashing_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn replace_bar(&self, bar: Option<ProgressBar>) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(old) = slot.take() {
                old.finish_and_clear();
            }
            *slot = bar;
        }
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: Phase, total: usize) {
        if self.quiet {
            return;
        }

        let pb = match phase {
            Phase::Enumerating => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(Self::enumerating_style());
                pb.set_message("Getting file paths...");
                pb.enable_steady_tick(Duration::from_millis(100));
                pb
            }
            Phase::Hashing => {
                let pb = ProgressBar::new(total as u64);
                pb.set_style(Self::hashing_style());
                pb.set_message("errors: 0");
                pb
            }
        };
        pb.set_draw_target(ProgressDrawTarget::stderr());
        self.replace_bar(Some(pb));
    }

    fn on_progress(&self, snapshot: &ProgressSnapshot) {
        if self.quiet {
            return;
        }

        if let Ok(slot) = self.bar.lock() {
            if let Some(ref pb) = *slot {
                pb.set_position(snapshot.done() as u64);
                pb.set_message(format!("errors: {}", snapshot.errored));
            }
        }
    }

    fn on_phase_end(&self, phase: Phase) {
        if self.quiet {
            return;
        }
        log::debug!("Phase {} finished", phase);
        self.replace_bar(None);
    }
}

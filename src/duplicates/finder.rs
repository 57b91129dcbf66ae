//! Duplicate finder: enumeration, bounded hashing and aggregation.
//!
//! # Overview
//!
//! This module orchestrates one scan:
//! 1. **Enumerate** - walk every root into a flat file list (see [`Walker`])
//! 2. **Hash** - fingerprint each file on a pool of `concurrency` threads,
//!    admitting at most `concurrency` tasks at once through an
//!    [`AdmissionGate`]
//! 3. **Aggregate** - record results in a [`CollisionMap`] and derive the
//!    collision groups
//!
//! A [`CancelToken`] is checked before each task is admitted and before each
//! read inside a task. A cancelled scan always yields
//! [`ScanOutcome::Cancelled`] with no groups.
//!
//! # Example
//!
//! ```no_run
//! use duplicut::duplicates::{DuplicateFinder, FinderConfig};
//! use duplicut::signal::CancelToken;
//! use std::path::PathBuf;
//!
//! let finder = DuplicateFinder::new(FinderConfig::default().with_concurrency(8));
//! let roots = vec![PathBuf::from("/home/user/Pictures")];
//! let outcome = finder.find_duplicates(&roots, &CancelToken::new()).unwrap();
//!
//! for group in outcome.groups() {
//!     println!("{}: {} copies", group.fingerprint, group.len());
//! }
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use serde::Serialize;

use super::groups::{CollisionGroup, CollisionMap};
use crate::progress::{Phase, ProgressCallback};
use crate::scanner::hasher::DEFAULT_BUFFER_SIZE;
use crate::scanner::{FileSystem, HashAlgorithm, Hasher, OsFileSystem, Walker};
use crate::signal::CancelToken;

/// Default number of concurrently admitted hashing tasks.
pub const DEFAULT_CONCURRENCY: usize = 50;

/// Counting semaphore limiting concurrently running hashing tasks.
///
/// Also records the highest number of slots ever held at once.
#[derive(Debug)]
pub struct AdmissionGate {
    capacity: usize,
    in_use: Mutex<usize>,
    released: Condvar,
    peak: AtomicUsize,
}

impl AdmissionGate {
    /// Create a gate with `capacity` slots (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            in_use: Mutex::new(0),
            released: Condvar::new(),
            peak: AtomicUsize::new(0),
        }
    }

    /// Block until a slot is free and take it. The slot is returned when the
    /// permit is dropped.
    pub fn acquire(&self) -> Permit<'_> {
        let mut in_use = self.in_use.lock().unwrap_or_else(|e| e.into_inner());
        while *in_use >= self.capacity {
            in_use = self
                .released
                .wait(in_use)
                .unwrap_or_else(|e| e.into_inner());
        }
        *in_use += 1;
        self.peak.fetch_max(*in_use, Ordering::SeqCst);
        Permit { gate: self }
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently held.
    #[must_use]
    pub fn in_use(&self) -> usize {
        *self.in_use.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Most slots ever held at the same time.
    #[must_use]
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn release(&self) {
        let mut in_use = self.in_use.lock().unwrap_or_else(|e| e.into_inner());
        *in_use -= 1;
        self.released.notify_one();
    }
}

/// A held admission slot.
#[derive(Debug)]
pub struct Permit<'a> {
    gate: &'a AdmissionGate,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}

/// Configuration for a scan.
#[derive(Clone)]
pub struct FinderConfig {
    /// Maximum number of hashing tasks running at once. Must be at least 1.
    pub concurrency: usize,
    /// Bytes requested per read. Must be at least 1.
    pub buffer_size: usize,
    /// Fingerprint digest.
    pub algorithm: HashAlgorithm,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("concurrency", &self.concurrency)
            .field("buffer_size", &self.buffer_size)
            .field("algorithm", &self.algorithm)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            buffer_size: DEFAULT_BUFFER_SIZE,
            algorithm: HashAlgorithm::default(),
            progress_callback: None,
        }
    }
}

impl FinderConfig {
    /// Set the concurrency ceiling.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the read buffer size in bytes.
    #[must_use]
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Set the fingerprint digest.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Reject a zero concurrency ceiling or buffer size.
    ///
    /// # Errors
    ///
    /// [`FinderError::InvalidConcurrency`] or [`FinderError::InvalidBufferSize`].
    pub fn validate(&self) -> Result<(), FinderError> {
        if self.concurrency == 0 {
            return Err(FinderError::InvalidConcurrency(self.concurrency));
        }
        if self.buffer_size == 0 {
            return Err(FinderError::InvalidBufferSize(self.buffer_size));
        }
        Ok(())
    }

    fn hasher(&self) -> Hasher {
        Hasher::new(self.algorithm, self.buffer_size)
    }
}

/// Errors that prevent a scan from running.
///
/// Per-file failures are never reported here; they are counted in
/// [`ScanSummary::errored_files`].
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The concurrency ceiling was below 1.
    #[error("concurrency must be at least 1 (got {0})")]
    InvalidConcurrency(usize),

    /// The read buffer size was below 1.
    #[error("buffer size must be at least 1 byte (got {0})")]
    InvalidBufferSize(usize),

    /// The hashing thread pool could not be created.
    #[error("failed to build hashing thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Counters from the hashing phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HashStats {
    /// Tasks admitted through the gate
    pub admitted: usize,
    /// Most tasks admitted at the same time
    pub peak_in_flight: usize,
    /// Whether admission stopped because of cancellation
    pub interrupted: bool,
}

/// Fingerprint `paths` with at most `config.concurrency` tasks in flight,
/// recording every result in `map`.
///
/// Returns once every admitted task has finished. After cancellation no new
/// task is admitted and running tasks stop at their next read.
///
/// # Errors
///
/// [`FinderError::ThreadPool`] if the worker threads cannot be spawned.
pub fn hash_files<F: FileSystem + ?Sized>(
    fs: &F,
    paths: Vec<PathBuf>,
    config: &FinderConfig,
    map: &CollisionMap,
    cancel: &CancelToken,
) -> Result<HashStats, FinderError> {
    let mut stats = HashStats::default();
    if paths.is_empty() {
        return Ok(stats);
    }

    // The gate enforces the ceiling; more threads than files would sit idle.
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.concurrency.min(paths.len()))
        .thread_name(|i| format!("duplicut-hash-{}", i))
        .build()?;
    let gate = AdmissionGate::new(config.concurrency);
    let hasher = config.hasher();
    let progress = config.progress_callback.as_deref();

    pool.in_place_scope(|scope| {
        for path in paths {
            if cancel.is_cancelled() {
                log::debug!("Hashing: cancellation requested, admitting no more tasks");
                stats.interrupted = true;
                break;
            }

            let permit = gate.acquire();
            if cancel.is_cancelled() {
                stats.interrupted = true;
                break;
            }
            stats.admitted += 1;

            let gate_hasher = &hasher;
            scope.spawn(move |_| {
                let _permit = permit;
                match gate_hasher.fingerprint_path(fs, &path, cancel) {
                    Ok(Some(fingerprint)) => {
                        log::trace!("{} {}", fingerprint, path.display());
                        map.record_fingerprint(path, fingerprint, progress);
                    }
                    Ok(None) => {
                        log::trace!("Cancelled while hashing {}", path.display());
                    }
                    Err(e) => {
                        log::warn!("{}", e);
                        map.record_error(progress);
                    }
                }
            });
        }
    });

    stats.peak_in_flight = gate.peak();
    Ok(stats)
}

/// Statistics for a finished scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    /// Files discovered by enumeration
    pub total_files: usize,
    /// Files fingerprinted
    pub processed_files: usize,
    /// Files that failed to open or read
    pub errored_files: usize,
    /// Directories that could not be listed
    pub skipped_dirs: usize,
    /// Collision groups found
    pub duplicate_groups: usize,
    /// Files in collision groups beyond the first of each group
    pub duplicate_files: usize,
    /// Most hashing tasks in flight at once
    pub peak_in_flight: usize,
    /// When the scan started
    pub started_at: DateTime<Local>,
    /// When the scan reached its terminal state
    pub finished_at: DateTime<Local>,
    /// Wall-clock duration of the scan
    #[serde(serialize_with = "serialize_duration_ms", rename = "duration_ms")]
    pub duration: Duration,
}

fn serialize_duration_ms<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl ScanSummary {
    fn started(total_files: usize, started_at: DateTime<Local>) -> Self {
        Self {
            total_files,
            processed_files: 0,
            errored_files: 0,
            skipped_dirs: 0,
            duplicate_groups: 0,
            duplicate_files: 0,
            peak_in_flight: 0,
            started_at,
            finished_at: started_at,
            duration: Duration::ZERO,
        }
    }

    /// Whether any file failed to hash.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.errored_files > 0
    }

    /// Human-readable duration, e.g. "1.25s".
    #[must_use]
    pub fn duration_display(&self) -> String {
        format_duration(self.duration)
    }
}

/// Format a duration with a unit suited to its size.
#[must_use]
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs >= 60.0 {
        let whole = d.as_secs();
        format!("{}m{:02}s", whole / 60, whole % 60)
    } else if secs >= 1.0 {
        format!("{:.2}s", secs)
    } else {
        format!("{}ms", d.as_millis())
    }
}

/// Terminal result of a scan.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ScanOutcome {
    /// Hashing ran to the end.
    Completed {
        /// Collision groups, ordered by first path
        groups: Vec<CollisionGroup>,
        /// Scan statistics
        summary: ScanSummary,
    },
    /// The scan was cancelled; partial results were discarded.
    Cancelled {
        /// Statistics up to the point of cancellation
        summary: ScanSummary,
    },
}

impl ScanOutcome {
    /// Collision groups; always empty for a cancelled scan.
    #[must_use]
    pub fn groups(&self) -> &[CollisionGroup] {
        match self {
            Self::Completed { groups, .. } => groups,
            Self::Cancelled { .. } => &[],
        }
    }

    /// Take ownership of the collision groups.
    #[must_use]
    pub fn into_groups(self) -> Vec<CollisionGroup> {
        match self {
            Self::Completed { groups, .. } => groups,
            Self::Cancelled { .. } => Vec::new(),
        }
    }

    /// Scan statistics.
    #[must_use]
    pub fn summary(&self) -> &ScanSummary {
        match self {
            Self::Completed { summary, .. } | Self::Cancelled { summary } => summary,
        }
    }

    /// Whether the scan was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Duplicate finder that runs the enumerate, hash, aggregate pipeline.
///
/// # Example
///
/// ```no_run
/// use duplicut::duplicates::DuplicateFinder;
/// use duplicut::signal::CancelToken;
/// use std::path::PathBuf;
///
/// let finder = DuplicateFinder::with_defaults();
/// let outcome = finder
///     .find_duplicates(&[PathBuf::from(".")], &CancelToken::new())
///     .unwrap();
/// println!("{} groups", outcome.groups().len());
/// ```
pub struct DuplicateFinder<F: FileSystem = OsFileSystem> {
    config: FinderConfig,
    fs: F,
}

impl DuplicateFinder<OsFileSystem> {
    /// Create a finder over the real filesystem.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        Self {
            config,
            fs: OsFileSystem,
        }
    }

    /// Create a finder with default settings.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }
}

impl<F: FileSystem> DuplicateFinder<F> {
    /// Create a finder over a custom filesystem.
    #[must_use]
    pub fn with_filesystem(config: FinderConfig, fs: F) -> Self {
        Self { config, fs }
    }

    /// The finder's configuration.
    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Scan `roots` and return the collision groups.
    ///
    /// Roots are assumed to be validated already (see
    /// [`crate::roots::RootSet`]); overlapping roots are not re-checked.
    ///
    /// # Errors
    ///
    /// Only configuration problems (zero concurrency or buffer size) and
    /// thread pool creation fail the scan. Unreadable directories and files
    /// are counted and skipped.
    pub fn find_duplicates(
        &self,
        roots: &[PathBuf],
        cancel: &CancelToken,
    ) -> Result<ScanOutcome, FinderError> {
        self.config.validate()?;

        let start = Instant::now();
        let started_at = Local::now();
        let progress = self.config.progress_callback.as_deref();

        log::info!(
            "Starting duplicate scan of {} root(s) (concurrency {}, buffer {} bytes, {})",
            roots.len(),
            self.config.concurrency,
            self.config.buffer_size,
            self.config.algorithm
        );

        // Enumerate
        if let Some(callback) = progress {
            callback.on_phase_start(Phase::Enumerating, 0);
        }
        let (files, walk_stats) = Walker::new(&self.fs).walk(roots, cancel);
        if let Some(callback) = progress {
            callback.on_phase_end(Phase::Enumerating);
        }

        let total = files.len();
        log::info!("Found {} files", total);

        let mut summary = ScanSummary::started(total, started_at);
        summary.skipped_dirs = walk_stats.skipped_dirs;

        // Hash
        let map = CollisionMap::new(total);
        if !cancel.is_cancelled() {
            if let Some(callback) = progress {
                callback.on_phase_start(Phase::Hashing, total);
            }
            let hash_stats = hash_files(&self.fs, files, &self.config, &map, cancel)?;
            summary.peak_in_flight = hash_stats.peak_in_flight;
            if let Some(callback) = progress {
                callback.on_phase_end(Phase::Hashing);
            }
        }

        // Aggregate
        let snapshot = map.snapshot();
        summary.processed_files = snapshot.processed;
        summary.errored_files = snapshot.errored;
        summary.duration = start.elapsed();
        summary.finished_at = Local::now();

        let cancelled = cancel.is_cancelled();
        let groups = map.finalize(cancelled);

        if cancelled {
            log::info!(
                "Scan cancelled after {} ({}/{} files)",
                summary.duration_display(),
                snapshot.done(),
                total
            );
            return Ok(ScanOutcome::Cancelled { summary });
        }

        summary.duplicate_groups = groups.len();
        summary.duplicate_files = groups.iter().map(CollisionGroup::duplicate_count).sum();
        log::info!(
            "Detected {} collision groups in {} ({} errors)",
            summary.duplicate_groups,
            summary.duration_display(),
            summary.errored_files
        );

        Ok(ScanOutcome::Completed { groups, summary })
    }
}

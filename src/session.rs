//! Scan sessions running on a background thread.
//!
//! # Overview
//!
//! [`ScanSession::start`] snapshots the root set, validates the
//! configuration and runs one scan on a dedicated thread. The returned
//! [`ScanHandle`] lets the caller:
//!
//! - receive [`ScanEvent`]s (phase changes, a progress snapshot after every
//!   finished hashing task, and one final [`ScanEvent::Finished`])
//! - poll the latest counters and [`SessionState`] without blocking
//! - cancel the session, which is idempotent
//! - [`wait`](ScanHandle::wait) for the outcome
//!
//! Each session has its own [`CancelToken`], so cancelling one session never
//! affects another.
//!
//! # Example
//!
//! ```no_run
//! use duplicut::duplicates::FinderConfig;
//! use duplicut::roots::RootSet;
//! use duplicut::session::{ScanEvent, ScanSession};
//!
//! let mut roots = RootSet::new();
//! roots.add("/home/user/Pictures").unwrap();
//!
//! let handle = ScanSession::start(&roots, FinderConfig::default()).unwrap();
//! for event in handle.events().iter() {
//!     if let ScanEvent::Progress(snapshot) = event {
//!         println!("{}/{}", snapshot.done(), snapshot.total);
//!     }
//! }
//! let outcome = handle.wait().unwrap();
//! println!("{} groups", outcome.groups().len());
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};

use crate::duplicates::{DuplicateFinder, FinderConfig, FinderError, ScanOutcome};
use crate::progress::{Phase, ProgressCallback, ProgressSnapshot};
use crate::roots::RootSet;
use crate::scanner::{FileSystem, OsFileSystem};
use crate::signal::CancelToken;

/// Lifecycle of a scan session.
///
/// `Created -> Enumerating -> Hashing -> Completed | Cancelled`. A session
/// cancelled during enumeration goes straight to `Cancelled`. `Failed` is
/// reached only when the hashing pool cannot be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    /// Thread spawned, nothing done yet
    Created = 0,
    /// Walking the roots
    Enumerating = 1,
    /// Fingerprinting files
    Hashing = 2,
    /// Finished; collision groups available
    Completed = 3,
    /// Cancelled; result is empty
    Cancelled = 4,
    /// Aborted by an internal error
    Failed = 5,
}

impl SessionState {
    /// Whether no further transition is possible.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Enumerating,
            2 => Self::Hashing,
            3 => Self::Completed,
            4 => Self::Cancelled,
            _ => Self::Failed,
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Enumerating => "enumerating",
            Self::Hashing => "hashing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Message delivered on a session's event channel.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// A phase began. `total` is the file count for hashing, 0 for
    /// enumeration.
    PhaseStarted {
        /// Phase that started
        phase: Phase,
        /// Work items in the phase, if known
        total: usize,
    },
    /// A hashing task finished, successfully or not.
    Progress(ProgressSnapshot),
    /// A phase ended.
    PhaseFinished(Phase),
    /// The session reached its terminal outcome. Sent exactly once, and
    /// always last, for every session that did not fail.
    Finished(ScanOutcome),
}

/// Errors from starting or awaiting a session.
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    /// The scan configuration was rejected or the scan could not run.
    #[error(transparent)]
    Finder(#[from] FinderError),

    /// The session thread could not be spawned.
    #[error("failed to spawn scan thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The session thread panicked.
    #[error("scan thread panicked")]
    Panicked,
}

#[derive(Debug)]
struct Shared {
    state: AtomicU8,
    processed: AtomicUsize,
    errored: AtomicUsize,
    total: AtomicUsize,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(SessionState::Created as u8),
            processed: AtomicUsize::new(0),
            errored: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
        }
    }

    fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Move to `next` unless the session is already terminal.
    fn transition(&self, next: SessionState) -> bool {
        self.state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                if SessionState::from_u8(current).is_terminal() {
                    None
                } else {
                    Some(next as u8)
                }
            })
            .is_ok()
    }

    fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            processed: self.processed.load(Ordering::Acquire),
            errored: self.errored.load(Ordering::Acquire),
            total: self.total.load(Ordering::Acquire),
        }
    }
}

/// Forwards finder callbacks onto the event channel and the shared state,
/// then to the caller's own callback if one was configured.
struct ChannelReporter {
    tx: Sender<ScanEvent>,
    shared: Arc<Shared>,
    downstream: Option<Arc<dyn ProgressCallback>>,
}

impl ChannelReporter {
    fn send(&self, event: ScanEvent) {
        // The receiver may have been dropped; the scan carries on regardless.
        let _ = self.tx.send(event);
    }
}

impl ProgressCallback for ChannelReporter {
    fn on_phase_start(&self, phase: Phase, total: usize) {
        let state = match phase {
            Phase::Enumerating => SessionState::Enumerating,
            Phase::Hashing => {
                self.shared.total.store(total, Ordering::Release);
                SessionState::Hashing
            }
        };
        self.shared.transition(state);
        self.send(ScanEvent::PhaseStarted { phase, total });
        if let Some(ref callback) = self.downstream {
            callback.on_phase_start(phase, total);
        }
    }

    fn on_progress(&self, snapshot: &ProgressSnapshot) {
        self.shared
            .processed
            .store(snapshot.processed, Ordering::Release);
        self.shared.errored.store(snapshot.errored, Ordering::Release);
        self.send(ScanEvent::Progress(*snapshot));
        if let Some(ref callback) = self.downstream {
            callback.on_progress(snapshot);
        }
    }

    fn on_phase_end(&self, phase: Phase) {
        self.send(ScanEvent::PhaseFinished(phase));
        if let Some(ref callback) = self.downstream {
            callback.on_phase_end(phase);
        }
    }
}

/// Entry point for starting scans.
#[derive(Debug)]
pub struct ScanSession;

impl ScanSession {
    /// Start scanning `roots` on the real filesystem.
    ///
    /// # Errors
    ///
    /// [`SessionError::Finder`] if `config` is invalid, or
    /// [`SessionError::Spawn`] if the session thread cannot be created.
    pub fn start(roots: &RootSet, config: FinderConfig) -> Result<ScanHandle, SessionError> {
        Self::start_with_cancel(roots, config, OsFileSystem, CancelToken::new())
    }

    /// Start scanning `roots` on a custom filesystem.
    ///
    /// # Errors
    ///
    /// See [`ScanSession::start`].
    pub fn start_with_filesystem<F>(
        roots: &RootSet,
        config: FinderConfig,
        fs: F,
    ) -> Result<ScanHandle, SessionError>
    where
        F: FileSystem + 'static,
    {
        Self::start_with_cancel(roots, config, fs, CancelToken::new())
    }

    /// Start scanning with a token the caller created beforehand, e.g. one
    /// already wired to Ctrl+C. The token should not be shared with another
    /// session. A token that is already set yields a cancelled outcome.
    ///
    /// # Errors
    ///
    /// See [`ScanSession::start`].
    pub fn start_with_cancel<F>(
        roots: &RootSet,
        mut config: FinderConfig,
        fs: F,
        cancel: CancelToken,
    ) -> Result<ScanHandle, SessionError>
    where
        F: FileSystem + 'static,
    {
        config.validate()?;

        let roots: Vec<PathBuf> = roots.snapshot().to_vec();
        let (tx, rx) = crossbeam_channel::unbounded();
        let shared = Arc::new(Shared::new());

        config.progress_callback = Some(Arc::new(ChannelReporter {
            tx: tx.clone(),
            shared: Arc::clone(&shared),
            downstream: config.progress_callback.take(),
        }));

        let thread_shared = Arc::clone(&shared);
        let thread_cancel = cancel.clone();
        let thread = thread::Builder::new()
            .name("duplicut-session".into())
            .spawn(move || {
                let finder = DuplicateFinder::with_filesystem(config, fs);
                let result = finder.find_duplicates(&roots, &thread_cancel);
                match result {
                    Ok(ref outcome) => {
                        let terminal = if outcome.is_cancelled() {
                            SessionState::Cancelled
                        } else {
                            SessionState::Completed
                        };
                        thread_shared.transition(terminal);
                        let _ = tx.send(ScanEvent::Finished(outcome.clone()));
                    }
                    Err(ref e) => {
                        log::error!("Scan failed: {}", e);
                        thread_shared.transition(SessionState::Failed);
                    }
                }
                result
            })
            .map_err(SessionError::Spawn)?;

        Ok(ScanHandle {
            cancel,
            events: rx,
            shared,
            thread: Some(thread),
        })
    }
}

/// Handle to a running or finished session.
///
/// Dropping the handle without calling [`wait`](ScanHandle::wait) cancels
/// the session and joins its thread.
pub struct ScanHandle {
    cancel: CancelToken,
    events: Receiver<ScanEvent>,
    shared: Arc<Shared>,
    thread: Option<JoinHandle<Result<ScanOutcome, FinderError>>>,
}

impl std::fmt::Debug for ScanHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanHandle")
            .field("state", &self.state())
            .field("progress", &self.progress())
            .finish()
    }
}

impl ScanHandle {
    /// Request cancellation. Idempotent; has no effect once the session
    /// has finished.
    pub fn cancel(&self) {
        if self.cancel.cancel() {
            log::info!("Cancelling scan session");
        }
    }

    /// The session's cancellation token, e.g. for wiring up Ctrl+C.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Event stream. Iteration ends once the session has finished and every
    /// event has been received.
    #[must_use]
    pub fn events(&self) -> &Receiver<ScanEvent> {
        &self.events
    }

    /// Latest published counters.
    #[must_use]
    pub fn progress(&self) -> ProgressSnapshot {
        self.shared.snapshot()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Whether the session thread has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Block until the session finishes and return its outcome.
    ///
    /// # Errors
    ///
    /// [`SessionError::Finder`] if the scan could not run, or
    /// [`SessionError::Panicked`] if the session thread panicked.
    pub fn wait(mut self) -> Result<ScanOutcome, SessionError> {
        let Some(thread) = self.thread.take() else {
            return Err(SessionError::Panicked);
        };
        match thread.join() {
            Ok(result) => result.map_err(SessionError::from),
            Err(_) => {
                self.shared.transition(SessionState::Failed);
                Err(SessionError::Panicked)
            }
        }
    }
}

impl Drop for ScanHandle {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.cancel.cancel();
            let _ = thread.join();
        }
    }
}

//! Cancellation tokens and Ctrl+C handling.
//!
//! Every scan session owns one [`CancelToken`]. The enumerator and every
//! hashing task hold a clone and poll it cooperatively; setting it is
//! terminal for that session and cannot be undone.
//!
//! # Usage
//!
//! ```rust
//! use duplicut::signal::CancelToken;
//!
//! let token = CancelToken::new();
//! let worker_view = token.clone();
//!
//! assert!(!worker_view.is_cancelled());
//! token.cancel();
//! assert!(worker_view.is_cancelled());
//! ```
//!
//! # Exit Codes
//!
//! When Ctrl+C cancels a scan from the command line, the process exits with
//! code 130 (128 + SIGINT).

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Exit code for SIGINT (Ctrl+C) interruption.
/// This follows Unix convention: 128 + signal number (SIGINT = 2).
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Write-once cancellation flag shared between a session and its workers.
///
/// Clones share the same flag. Two tokens created with [`CancelToken::new`]
/// are independent, so concurrent sessions never observe each other's
/// cancellation.
///
/// # Thread Safety
///
/// `CancelToken` is `Send` and `Sync`; the flag uses atomic operations.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a new token with the flag clear.
    #[must_use]
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. Idempotent.
    ///
    /// Returns `true` if this call set the flag, `false` if it was already set.
    pub fn cancel(&self) -> bool {
        let first = !self.flag.swap(true, Ordering::SeqCst);
        if first {
            log::debug!("Cancellation requested");
        }
        first
    }

    /// Check whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Whether two tokens share the same flag.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.flag, &other.flag)
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

/// Token cancelled by the process-wide Ctrl+C hook.
static CTRLC_TARGET: Mutex<Option<CancelToken>> = Mutex::new(None);

/// Whether the OS-level hook has been registered successfully.
static CTRLC_REGISTERED: Mutex<bool> = Mutex::new(false);

/// Route Ctrl+C to `token`.
///
/// The OS-level hook is registered once per process; later calls only
/// retarget it, so a front end running several scans in sequence can point
/// Ctrl+C at whichever session is active. A failed registration is retried
/// on the next call.
///
/// When Ctrl+C is pressed:
/// 1. The current target token is cancelled
/// 2. "Interrupted. Cancelling scan..." is printed to stderr
///
/// # Errors
///
/// Returns [`SignalError::InstallFailed`] if the OS hook cannot be
/// registered.
pub fn install_handler(token: &CancelToken) -> Result<(), SignalError> {
    if let Ok(mut slot) = CTRLC_TARGET.lock() {
        *slot = Some(token.clone());
    }

    register_once(&CTRLC_REGISTERED, || ctrlc::set_handler(on_interrupt))
}

fn on_interrupt() {
    if let Ok(slot) = CTRLC_TARGET.lock() {
        if let Some(token) = slot.as_ref() {
            token.cancel();
        }
    }

    let _ = writeln!(std::io::stderr(), "\nInterrupted. Cancelling scan...");
    let _ = std::io::stderr().flush();

    log::info!("Shutdown signal received");
}

/// Run `register` unless an earlier call succeeded. Only success is
/// remembered.
fn register_once<R>(registered: &Mutex<bool>, register: R) -> Result<(), SignalError>
where
    R: FnOnce() -> Result<(), ctrlc::Error>,
{
    let mut done = registered.lock().unwrap_or_else(|e| e.into_inner());
    if *done {
        return Ok(());
    }
    register()?;
    *done = true;
    Ok(())
}

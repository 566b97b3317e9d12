//! Cooperative shutdown signaling
//!
//! The sampling loop polls a shared flag rather than reacting to signals
//! directly: handlers only flip the flag, so an in-flight append always
//! completes before the loop observes the stop request and no partial row
//! is ever written.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[cfg(unix)]
use std::sync::OnceLock;

/// Flag the signal handlers write to; registered before any handler runs
#[cfg(unix)]
static SIGNAL_FLAG: OnceLock<Arc<AtomicBool>> = OnceLock::new();

/// Cancellation token shared between the sampling loop, the signal
/// handlers, and any embedding caller
#[derive(Clone, Debug, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Request a stop; the loop exits at its next flag check
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a stop has been requested
    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Route SIGINT and SIGTERM to this flag.
    ///
    /// Only the first flag registered in the process receives signals. The
    /// handler performs a single atomic store, which is async-signal-safe.
    #[cfg(unix)]
    pub fn install_signal_handlers(&self) -> crate::error::Result<()> {
        use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};

        SIGNAL_FLAG.get_or_init(|| Arc::clone(&self.0));

        let action = SigAction::new(
            SigHandler::Handler(handle_signal),
            SaFlags::empty(),
            SigSet::empty(),
        );
        unsafe {
            signal::sigaction(Signal::SIGINT, &action)?;
            signal::sigaction(Signal::SIGTERM, &action)?;
        }
        Ok(())
    }
}

#[cfg(unix)]
extern "C" fn handle_signal(_signum: nix::libc::c_int) {
    if let Some(flag) = SIGNAL_FLAG.get() {
        flag.store(true, Ordering::SeqCst);
    }
}

//! Cooperative pause/cancel signals shared between a controller and a transfer.
//!
//! A `TransferControl` is created once per transfer session and cloned into
//! whichever thread performs the copy. The controller (UI thread, signal
//! handler, prompt loop) flips the signals; the copy loop only observes them,
//! at chunk boundaries and on every pause-poll tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::error::EngineError;

/// Interval at which a paused copy re-checks its signals.
///
/// This bounds both pause-to-resume and cancel-while-paused latency.
pub const PAUSE_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Default)]
struct Signals {
    paused: AtomicBool,
    canceled: AtomicBool,
}

/// Shared pause/cancel handle. Clones observe the same signals.
#[derive(Debug, Clone, Default)]
pub struct TransferControl {
    signals: Arc<Signals>,
}

impl TransferControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the copy loop to suspend at its next chunk boundary.
    pub fn request_pause(&self) {
        self.signals.paused.store(true, Ordering::SeqCst);
    }

    /// Clear a pending pause. Has no effect on cancellation.
    pub fn resume(&self) {
        self.signals.paused.store(false, Ordering::SeqCst);
    }

    /// Cancel the transfer. Once set this is never cleared.
    pub fn request_cancel(&self) {
        self.signals.canceled.store(true, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.signals.paused.load(Ordering::SeqCst)
    }

    pub fn is_canceled(&self) -> bool {
        self.signals.canceled.load(Ordering::SeqCst)
    }

    /// Block while paused, polling every [`PAUSE_POLL_INTERVAL`].
    ///
    /// Returns `Err(Canceled)` if cancellation is requested before or during
    /// the wait, `Ok(())` once the pause has been lifted.
    pub fn wait_while_paused(&self) -> Result<(), EngineError> {
        loop {
            if self.is_canceled() {
                return Err(EngineError::Canceled);
            }
            if !self.is_paused() {
                return Ok(());
            }
            thread::sleep(PAUSE_POLL_INTERVAL);
        }
    }
}

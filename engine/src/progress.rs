//! Progress reporting trait.
//!
//! This module defines the ProgressCallback trait, which decouples the
//! transfer engine from any specific UI technology. The CLI prints to stderr,
//! the GUI forwards updates over a channel; the engine never consults a
//! callback for control decisions.

/// Trait for receiving progress updates from a transfer.
///
/// All methods are called synchronously on the thread running the transfer,
/// so implementations should return quickly.
pub trait ProgressCallback: Send + Sync {
    /// Called after every chunk written.
    ///
    /// `bytes_copied` counts from the start of the file, including any
    /// prefix that was already present when the transfer resumed.
    fn on_progress(&self, _bytes_copied: u64, _total_bytes: u64) {}

    /// Called once per second while waiting to retry after a transient error.
    fn on_retry_wait(&self, _seconds_remaining: u64) {}
}

/// A callback that ignores every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressCallback for NoProgress {}

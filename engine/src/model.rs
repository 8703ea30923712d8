//! Core data model for single-file transfers.
//!
//! This module defines the data passed into and out of the engine:
//! - TransferOptions: chunk size, timeout and resume policy for one call
//! - TransferAttempt: per-invocation bookkeeping of the retry loop
//! - TransferReport: what a successful transfer did
//! - TransferState, ResumePolicy, ChunkPass: supporting enums and results

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

/// Default chunk size: 1 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Default transfer timeout: 300 seconds.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// How much of an existing destination file to trust when resuming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResumePolicy {
    /// Resume at the destination's current length without checking its content.
    #[default]
    TrustLength,
    /// Digest the matching source prefix first; start over when it differs.
    VerifyPrefix,
}

/// Options for one call into the resilient transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOptions {
    /// Bytes read and written per chunk
    pub chunk_size: usize,

    /// Wall-clock budget for retrying transient failures
    pub timeout: Duration,

    /// How the starting offset is derived from an existing destination
    pub resume_policy: ResumePolicy,
}

impl Default for TransferOptions {
    fn default() -> Self {
        TransferOptions {
            chunk_size: DEFAULT_CHUNK_SIZE,
            timeout: DEFAULT_TIMEOUT,
            resume_policy: ResumePolicy::TrustLength,
        }
    }
}

impl TransferOptions {
    /// Chunk size with the zero value mapped to the default.
    pub fn effective_chunk_size(&self) -> usize {
        if self.chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            self.chunk_size
        }
    }
}

/// State of the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    /// A copy pass is running
    Copying,
    /// Waiting before the next pass after a transient error
    Backoff,
    /// Destination holds the full source content
    Succeeded,
    /// Transient errors outlasted the timeout
    FailedTimeout,
    /// The control was canceled
    FailedCanceled,
}

impl std::fmt::Display for TransferState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferState::Copying => write!(f, "copying"),
            TransferState::Backoff => write!(f, "backoff"),
            TransferState::Succeeded => write!(f, "succeeded"),
            TransferState::FailedTimeout => write!(f, "failed-timeout"),
            TransferState::FailedCanceled => write!(f, "failed-canceled"),
        }
    }
}

/// Ephemeral state of one `run_transfer` call.
#[derive(Debug)]
pub struct TransferAttempt {
    /// Identifier used to correlate log lines of this call
    pub id: Uuid,

    pub chunk_size: usize,

    /// Resume offset: bytes known to be present at the destination
    pub offset: u64,

    /// Offset the call started from
    pub resumed_from: u64,

    /// Number of transient failures so far; drives the backoff delay
    pub attempt: u32,

    pub state: TransferState,

    /// Wall-clock start, for logs
    pub started_at: DateTime<Utc>,

    /// Monotonic start, for the timeout
    pub started: Instant,
}

impl TransferAttempt {
    pub fn new(chunk_size: usize, offset: u64) -> Self {
        TransferAttempt {
            id: Uuid::new_v4(),
            chunk_size,
            offset,
            resumed_from: offset,
            attempt: 0,
            state: TransferState::Copying,
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Result of a single copier pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPass {
    /// Bytes written by this pass
    pub bytes_copied: u64,

    /// Source length when the pass opened it
    pub total_bytes: u64,

    /// True once the end of the source was reached
    pub done: bool,
}

/// Summary of a successful transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub id: Uuid,

    /// Destination length when the call started
    pub resumed_from: u64,

    /// Bytes written across all passes of this call
    pub bytes_written: u64,

    /// Source length as seen by the final, successful pass
    pub total_bytes: u64,

    /// Copy passes performed (1 when no transient error occurred)
    pub attempts: u32,

    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = TransferOptions::default();
        assert_eq!(options.chunk_size, 1024 * 1024);
        assert_eq!(options.timeout, Duration::from_secs(300));
        assert_eq!(options.resume_policy, ResumePolicy::TrustLength);
    }

    #[test]
    fn test_zero_chunk_size_falls_back_to_default() {
        let options = TransferOptions {
            chunk_size: 0,
            ..TransferOptions::default()
        };
        assert_eq!(options.effective_chunk_size(), DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_state_names() {
        assert_eq!(TransferState::Backoff.to_string(), "backoff");
        assert_eq!(TransferState::FailedTimeout.to_string(), "failed-timeout");
        assert_eq!(TransferState::FailedCanceled.to_string(), "failed-canceled");
    }

    #[test]
    fn test_new_attempt_starts_at_resume_offset() {
        let attempt = TransferAttempt::new(4096, 17);
        assert_eq!(attempt.offset, 17);
        assert_eq!(attempt.resumed_from, 17);
        assert_eq!(attempt.attempt, 0);
        assert_eq!(attempt.state, TransferState::Copying);
    }
}

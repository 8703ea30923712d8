//! Resilient single-file transfer.
//!
//! `run_transfer` drives [`copy_chunk`] in a retry loop:
//!
//! ```text
//! Copying --ok/done--> Succeeded
//! Copying --Canceled--> FailedCanceled
//! Copying --AccessDenied--> (returned to the caller for escalation)
//! Copying --I/O error, elapsed >= timeout--> FailedTimeout
//! Copying --I/O error--> Backoff --min(2^attempt, 60)s--> Copying
//! ```
//!
//! The resume offset is always the destination's current length. With the
//! default [`ResumePolicy::TrustLength`] its content is not checked against
//! the source, so a destination left behind by an unrelated write produces a
//! corrupt result that only a digest comparison will catch.

use std::path::Path;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, info_span, warn};

use crate::checksums::{self, ChecksumAlgorithm};
use crate::control::{TransferControl, PAUSE_POLL_INTERVAL};
use crate::copier::copy_chunk;
use crate::error::EngineError;
use crate::fs_ops;
use crate::model::{ResumePolicy, TransferAttempt, TransferOptions, TransferReport, TransferState};
use crate::progress::ProgressCallback;

/// Upper bound of a single backoff wait, in seconds.
pub const MAX_BACKOFF_SECS: u64 = 60;

/// Backoff delay after the given number of previous failures: `min(2^attempt, 60)` seconds.
pub fn backoff_delay(attempt: u32) -> Duration {
    let secs = 1u64
        .checked_shl(attempt)
        .filter(|secs| *secs <= MAX_BACKOFF_SECS)
        .unwrap_or(MAX_BACKOFF_SECS);
    Duration::from_secs(secs)
}

/// Transfer `source` to `destination`, retrying transient failures.
///
/// # Errors
/// - `Canceled` when the control is canceled (never retried)
/// - `AccessDenied` as soon as the OS refuses access (never retried here)
/// - `Timeout` once a transient failure occurs after `options.timeout` has elapsed
/// - any non-transient error, unchanged and without backoff
pub fn run_transfer(
    source: &Path,
    destination: &Path,
    options: &TransferOptions,
    control: &TransferControl,
    progress: &dyn ProgressCallback,
) -> Result<TransferReport, EngineError> {
    let offset = starting_offset(source, destination, options.resume_policy)?;
    let mut attempt = TransferAttempt::new(options.effective_chunk_size(), offset);

    let span = info_span!("transfer", id = %attempt.id);
    let _enter = span.enter();
    info!(
        source = %source.display(),
        destination = %destination.display(),
        offset,
        "transfer started"
    );

    let mut bytes_written: u64 = 0;
    let mut total_bytes: u64 = 0;
    let mut passes: u32 = 0;

    loop {
        attempt.state = TransferState::Copying;
        passes += 1;

        let err = match copy_chunk(
            source,
            destination,
            attempt.offset,
            attempt.chunk_size,
            control,
            progress,
        ) {
            Ok(pass) => {
                bytes_written += pass.bytes_copied;
                attempt.offset += pass.bytes_copied;
                total_bytes = pass.total_bytes;
                if pass.done {
                    break;
                }
                continue;
            }
            Err(e) => e,
        };

        match failure_action(&err) {
            FailureAction::Cancel => {
                attempt.state = TransferState::FailedCanceled;
                warn!(offset = attempt.offset, state = %attempt.state, "transfer canceled");
                return Err(err);
            }
            FailureAction::Escalate => {
                warn!(error = %err, "access denied, not retrying");
                return Err(err);
            }
            FailureAction::Stop => {
                error!(error = %err, offset = attempt.offset, "non-transient error, not retrying");
                return Err(err);
            }
            FailureAction::Backoff => {
                // Bytes written before the failure are already in the file.
                let on_disk = fs_ops::destination_len(destination).unwrap_or(attempt.offset);
                bytes_written += on_disk.saturating_sub(attempt.offset);
                attempt.offset = on_disk;

                let elapsed = attempt.elapsed();
                if elapsed >= options.timeout {
                    attempt.state = TransferState::FailedTimeout;
                    error!(
                        error = %err,
                        elapsed_secs = elapsed.as_secs(),
                        offset = attempt.offset,
                        state = %attempt.state,
                        "transfer timed out"
                    );
                    return Err(EngineError::Timeout {
                        elapsed,
                        attempts: attempt.attempt + 1,
                        last_error: Box::new(err),
                    });
                }

                attempt.state = TransferState::Backoff;
                let delay = backoff_delay(attempt.attempt);
                warn!(
                    error = %err,
                    attempt = attempt.attempt,
                    delay_secs = delay.as_secs(),
                    offset = attempt.offset,
                    "transient error, backing off"
                );
                if let Err(canceled) = wait_backoff(delay, control, progress) {
                    attempt.state = TransferState::FailedCanceled;
                    warn!(offset = attempt.offset, "transfer canceled during backoff");
                    return Err(canceled);
                }
                attempt.attempt += 1;
            }
        }
    }

    if let Err(e) = fs_ops::preserve_mtime(source, destination) {
        debug!(error = %e, "could not preserve modification time");
    }

    attempt.state = TransferState::Succeeded;
    info!(
        bytes_written,
        total_bytes,
        passes,
        state = %attempt.state,
        "transfer complete"
    );

    Ok(TransferReport {
        id: attempt.id,
        resumed_from: attempt.resumed_from,
        bytes_written,
        total_bytes,
        attempts: passes,
        started_at: attempt.started_at,
        finished_at: Utc::now(),
    })
}

/// Boolean form of [`run_transfer`]. The terminal state is logged.
pub fn transfer(
    source: &Path,
    destination: &Path,
    options: &TransferOptions,
    control: &TransferControl,
    progress: &dyn ProgressCallback,
) -> bool {
    match run_transfer(source, destination, options, control, progress) {
        Ok(_) => true,
        Err(e) => {
            log_failure(source, &e);
            false
        }
    }
}

/// Resumable copy followed by a SHA-256 comparison of source and destination.
///
/// This path never escalates permissions. A digest mismatch is reported as
/// failure and is not retried.
pub fn copy_file_resumable(
    source: &Path,
    destination: &Path,
    options: &TransferOptions,
    control: &TransferControl,
    progress: &dyn ProgressCallback,
) -> bool {
    copy_file_resumable_with(
        source,
        destination,
        options,
        control,
        progress,
        ChecksumAlgorithm::Sha256,
    )
}

/// [`copy_file_resumable`] with a caller-chosen digest algorithm.
pub fn copy_file_resumable_with(
    source: &Path,
    destination: &Path,
    options: &TransferOptions,
    control: &TransferControl,
    progress: &dyn ProgressCallback,
    algorithm: ChecksumAlgorithm,
) -> bool {
    transfer(source, destination, options, control, progress)
        && checksums::verify_with(source, destination, algorithm)
}

/// What the retry loop does with a failed pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureAction {
    /// Wait and run another pass
    Backoff,
    /// Hand the error to the caller for permission escalation
    Escalate,
    /// The control was canceled
    Cancel,
    /// End the transfer with this error
    Stop,
}

fn failure_action(err: &EngineError) -> FailureAction {
    if matches!(err, EngineError::Canceled) {
        FailureAction::Cancel
    } else if err.is_access_denied() {
        FailureAction::Escalate
    } else if err.is_transient() {
        FailureAction::Backoff
    } else {
        FailureAction::Stop
    }
}

pub(crate) fn log_failure(source: &Path, err: &EngineError) {
    match err {
        EngineError::Canceled => warn!(source = %source.display(), "transfer canceled"),
        EngineError::Timeout { .. } => {
            error!(source = %source.display(), error = %err, "transfer timed out")
        }
        _ => error!(source = %source.display(), error = %err, "transfer failed"),
    }
}

fn starting_offset(
    source: &Path,
    destination: &Path,
    policy: ResumePolicy,
) -> Result<u64, EngineError> {
    let existing = fs_ops::destination_len(destination)?;
    match policy {
        ResumePolicy::TrustLength => Ok(existing),
        ResumePolicy::VerifyPrefix if existing == 0 => Ok(0),
        ResumePolicy::VerifyPrefix => {
            if checksums::prefix_matches(source, destination, existing)? {
                Ok(existing)
            } else {
                warn!(
                    destination = %destination.display(),
                    existing,
                    "existing destination does not match source, restarting"
                );
                Ok(0)
            }
        }
    }
}

/// Sleep for `delay`, reporting the countdown once per second.
fn wait_backoff(
    delay: Duration,
    control: &TransferControl,
    progress: &dyn ProgressCallback,
) -> Result<(), EngineError> {
    let ticks_per_second = (1000 / PAUSE_POLL_INTERVAL.as_millis().max(1)) as u32;
    for remaining in (1..=delay.as_secs()).rev() {
        if control.is_canceled() {
            return Err(EngineError::Canceled);
        }
        progress.on_retry_wait(remaining);
        for _ in 0..ticks_per_second {
            if control.is_canceled() {
                return Err(EngineError::Canceled);
            }
            thread::sleep(PAUSE_POLL_INTERVAL);
        }
    }
    if control.is_canceled() {
        return Err(EngineError::Canceled);
    }
    Ok(())
}

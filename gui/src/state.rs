use std::path::PathBuf;

use crossbeam_channel::Receiver;
use winmigrate_engine::{ChecksumAlgorithm, TransferControl};

use crate::progress::ProgressUpdate;
use crate::worker::{TransferOutcome, WorkerError};

/// Application state, holding all UI and transfer-related data.
#[derive(Debug)]
pub struct AppState {
    // Input fields
    pub source_path: String,
    pub destination_path: String,
    pub verify_after_copy: bool,
    pub checksum_algorithm: ChecksumAlgorithm,

    // Transfer state
    pub is_running: bool,
    pub is_paused: bool,
    pub bytes_copied: u64,
    pub total_bytes: u64,
    pub retry_seconds: Option<u64>,
    pub control: Option<TransferControl>,
    pub updates: Option<Receiver<ProgressUpdate>>,

    // UI state
    pub status_message: Option<String>,
    pub error_message: Option<String>,
}

impl AppState {
    pub fn new() -> Self {
        AppState {
            source_path: String::new(),
            destination_path: String::new(),
            verify_after_copy: false,
            checksum_algorithm: ChecksumAlgorithm::Sha256,

            is_running: false,
            is_paused: false,
            bytes_copied: 0,
            total_bytes: 0,
            retry_seconds: None,
            control: None,
            updates: None,

            status_message: None,
            error_message: None,
        }
    }

    /// Check the input fields and return the source and destination paths.
    pub fn validate_inputs(&self) -> Result<(PathBuf, PathBuf), String> {
        let source = self.source_path.trim();
        let destination = self.destination_path.trim();
        if source.is_empty() {
            return Err("Source path is required".to_string());
        }
        if destination.is_empty() {
            return Err("Destination path is required".to_string());
        }
        if source == destination {
            return Err("Source and destination cannot be the same".to_string());
        }
        let source = PathBuf::from(source);
        if !source.is_file() {
            return Err(format!("Source is not a file: {}", source.display()));
        }
        Ok((source, PathBuf::from(destination)))
    }

    /// Reset progress for a new transfer driven by `control`.
    pub fn begin(&mut self, control: TransferControl, updates: Receiver<ProgressUpdate>) {
        self.is_running = true;
        self.is_paused = false;
        self.bytes_copied = 0;
        self.total_bytes = 0;
        self.retry_seconds = None;
        self.control = Some(control);
        self.updates = Some(updates);
        self.status_message = None;
        self.error_message = None;
    }

    pub fn pause(&mut self) {
        if let Some(control) = &self.control {
            control.request_pause();
            self.is_paused = true;
        }
    }

    pub fn resume(&mut self) {
        if let Some(control) = &self.control {
            control.resume();
            self.is_paused = false;
        }
    }

    pub fn cancel(&self) {
        if let Some(control) = &self.control {
            control.request_cancel();
        }
    }

    /// Apply every update queued by the worker since the last tick.
    pub fn drain_updates(&mut self) {
        let pending: Vec<ProgressUpdate> = match &self.updates {
            Some(rx) => rx.try_iter().collect(),
            None => return,
        };
        for update in pending {
            self.handle_progress_update(update);
        }
    }

    pub fn handle_progress_update(&mut self, update: ProgressUpdate) {
        match update {
            ProgressUpdate::Progress {
                bytes_copied,
                total_bytes,
            } => {
                self.bytes_copied = bytes_copied;
                self.total_bytes = total_bytes;
                self.retry_seconds = None;
            }
            ProgressUpdate::RetryWait { seconds_remaining } => {
                self.retry_seconds = Some(seconds_remaining);
            }
        }
    }

    pub fn finish(&mut self, result: Result<TransferOutcome, WorkerError>) {
        self.drain_updates();
        self.is_running = false;
        self.is_paused = false;
        self.retry_seconds = None;
        self.control = None;
        self.updates = None;
        match result {
            Ok(TransferOutcome::Succeeded) => {
                self.status_message = Some("Transfer complete".to_string());
            }
            Ok(TransferOutcome::Canceled) => {
                self.status_message = Some("Transfer canceled; starting again resumes it".to_string());
            }
            Ok(TransferOutcome::Failed) => {
                self.error_message = Some("Transfer failed; see the log for details".to_string());
            }
            Err(err) => {
                self.error_message = Some(err.to_string());
            }
        }
    }

    pub fn percent(&self) -> f32 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        (self.bytes_copied as f32 / self.total_bytes as f32 * 100.0).min(100.0)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_validate_inputs() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("a.txt");
        std::fs::write(&src, "a").unwrap();

        let mut state = AppState::new();
        assert!(state.validate_inputs().is_err());

        state.source_path = src.display().to_string();
        assert!(state.validate_inputs().is_err());

        state.destination_path = state.source_path.clone();
        assert!(state.validate_inputs().is_err());

        state.destination_path = temp_dir.path().join("b.txt").display().to_string();
        let (source, destination) = state.validate_inputs().unwrap();
        assert_eq!(source, src);
        assert_eq!(destination, temp_dir.path().join("b.txt"));

        state.source_path = temp_dir.path().display().to_string();
        assert!(state.validate_inputs().is_err(), "directories are not transferable here");
    }

    #[test]
    fn test_updates_are_drained() {
        let (tx, rx) = unbounded();
        let mut state = AppState::new();
        state.begin(TransferControl::new(), rx);

        tx.send(ProgressUpdate::RetryWait { seconds_remaining: 3 }).unwrap();
        state.drain_updates();
        assert_eq!(state.retry_seconds, Some(3));

        tx.send(ProgressUpdate::Progress { bytes_copied: 25, total_bytes: 100 }).unwrap();
        state.drain_updates();
        assert_eq!(state.retry_seconds, None);
        assert_eq!(state.percent(), 25.0);
    }

    #[test]
    fn test_pause_resume_cancel_reach_control() {
        let (_tx, rx) = unbounded();
        let control = TransferControl::new();
        let mut state = AppState::new();
        state.begin(control.clone(), rx);

        state.pause();
        assert!(control.is_paused());
        assert!(state.is_paused);

        state.resume();
        assert!(!control.is_paused());

        state.cancel();
        assert!(control.is_canceled());
    }

    #[test]
    fn test_finish_clears_transfer() {
        let (_tx, rx) = unbounded();
        let mut state = AppState::new();
        state.begin(TransferControl::new(), rx);

        state.finish(Ok(TransferOutcome::Failed));
        assert!(!state.is_running);
        assert!(state.control.is_none());
        assert!(state.error_message.is_some());

        state.finish(Err(WorkerError::Join("panicked".into())));
        assert!(state.error_message.unwrap().contains("panicked"));
    }
}

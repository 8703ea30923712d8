use std::path::{Path, PathBuf};

use crossbeam_channel::Sender;
use iced::Command;
use rfd::{MessageButtons, MessageDialog, MessageDialogResult, MessageLevel};
use thiserror::Error;
use tracing::{info, warn};
use winmigrate_engine::{
    copy_file_resumable_with, transfer_with_permissions, ChecksumAlgorithm, EngineError,
    PermissionDecision, PermissionPrompt, TransferControl, TransferOptions,
};

use crate::progress::{GuiProgressCallback, ProgressUpdate};
use crate::Message;

#[derive(Debug, Clone, Error)]
pub enum WorkerError {
    #[error("transfer task stopped unexpectedly: {0}")]
    Join(String),
}

/// How a finished transfer ended, as far as the window cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    Succeeded,
    Canceled,
    Failed,
}

impl TransferOutcome {
    fn classify(ok: bool, control: &TransferControl) -> Self {
        if ok {
            Self::Succeeded
        } else if control.is_canceled() {
            Self::Canceled
        } else {
            Self::Failed
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub options: TransferOptions,
    /// `Some` selects the copy-and-verify path, which never prompts.
    pub verify: Option<ChecksumAlgorithm>,
}

/// Run the transfer on the blocking pool and report back with `TransferCompleted`.
pub fn start(
    request: TransferRequest,
    control: TransferControl,
    sender: Sender<ProgressUpdate>,
) -> Command<Message> {
    Command::perform(
        async move {
            tokio::task::spawn_blocking(move || {
                execute_transfer(&request, &control, sender, &DialogPrompt)
            })
            .await
            .map_err(|e| WorkerError::Join(e.to_string()))
        },
        Message::TransferCompleted,
    )
}

fn execute_transfer(
    request: &TransferRequest,
    control: &TransferControl,
    sender: Sender<ProgressUpdate>,
    prompt: &dyn PermissionPrompt,
) -> TransferOutcome {
    let progress = GuiProgressCallback::new(sender);
    let ok = match request.verify {
        Some(algorithm) => copy_file_resumable_with(
            &request.source,
            &request.destination,
            &request.options,
            control,
            &progress,
            algorithm,
        ),
        None => transfer_with_permissions(
            &request.source,
            &request.destination,
            &request.options,
            control,
            &progress,
            prompt,
        ),
    };

    let outcome = TransferOutcome::classify(ok, control);
    info!(?outcome, source = %request.source.display(), "transfer finished");
    outcome
}

/// Resolves access denials with native message dialogs.
struct DialogPrompt;

impl DialogPrompt {
    fn ask(title: &str, description: String) -> bool {
        let answer = MessageDialog::new()
            .set_level(MessageLevel::Warning)
            .set_title(title)
            .set_description(description)
            .set_buttons(MessageButtons::YesNo)
            .show();
        matches!(answer, MessageDialogResult::Yes)
    }
}

impl PermissionPrompt for DialogPrompt {
    fn decide(&self, path: &Path, error: &EngineError) -> PermissionDecision {
        warn!(path = %path.display(), error = %error, "asking how to handle access denial");
        if Self::ask(
            "Access denied",
            format!(
                "Access to {} was denied.\n\nRetry as administrator?",
                path.display()
            ),
        ) {
            return PermissionDecision::RetryElevated;
        }
        if Self::ask(
            "Access denied",
            format!(
                "Take ownership of {} and retry?",
                path.display()
            ),
        ) {
            return PermissionDecision::TakeOwnership;
        }
        PermissionDecision::Abandon
    }
}

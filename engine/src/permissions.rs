//! Access-denial escalation.
//!
//! When the operating system refuses access, retrying on a timer cannot
//! help. Instead the user decides: retry as administrator, take ownership of
//! the source and retry, or abandon. The decision surface belongs to the
//! front end (a stdin prompt in the CLI, message dialogs in the GUI); the
//! state machine lives here so both behave the same way.

use std::fs;
use std::path::Path;

use tracing::{error, info, warn};

use crate::control::TransferControl;
use crate::error::EngineError;
use crate::model::TransferOptions;
use crate::progress::ProgressCallback;
use crate::transfer::{log_failure, run_transfer};

/// The user's answer to an access-denial prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionDecision {
    /// Try again unchanged, typically after elevating privileges
    RetryElevated,
    /// Relax the source's permissions, then try again
    TakeOwnership,
    /// Give up on this file
    Abandon,
}

/// What the escalator does next for a given decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationAction {
    Retry,
    RelaxPermissionsThenRetry,
    GiveUp,
}

/// Map a decision onto the next escalation step.
pub fn next_action(decision: PermissionDecision) -> EscalationAction {
    match decision {
        PermissionDecision::RetryElevated => EscalationAction::Retry,
        PermissionDecision::TakeOwnership => EscalationAction::RelaxPermissionsThenRetry,
        PermissionDecision::Abandon => EscalationAction::GiveUp,
    }
}

/// Presentation layer for the access-denial decision.
pub trait PermissionPrompt {
    /// Ask how to proceed after `error` was raised for `path`.
    fn decide(&self, path: &Path, error: &EngineError) -> PermissionDecision;
}

/// Relax the permissions of `path` so the current user can read it.
///
/// On Unix the mode becomes `0o777`; elsewhere the read-only attribute is cleared.
pub fn take_ownership(path: &Path) -> Result<(), EngineError> {
    let result = {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o777))
        }
        #[cfg(not(unix))]
        {
            fs::metadata(path).and_then(|metadata| {
                let mut permissions = metadata.permissions();
                permissions.set_readonly(false);
                fs::set_permissions(path, permissions)
            })
        }
    };

    match result {
        Ok(()) => {
            info!(path = %path.display(), "took ownership");
            Ok(())
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "failed to take ownership");
            Err(EngineError::PermissionChangeFailed {
                path: path.to_path_buf(),
                source: e,
            })
        }
    }
}

/// Top-level entry point: resilient transfer with interactive escalation on
/// access denial.
///
/// Each retry is a fresh [`run_transfer`] call, so its backoff attempt count
/// starts from zero. The destination is not digest-verified on this path.
pub fn transfer_with_permissions(
    source: &Path,
    destination: &Path,
    options: &TransferOptions,
    control: &TransferControl,
    progress: &dyn ProgressCallback,
    prompt: &dyn PermissionPrompt,
) -> bool {
    escalate(
        source,
        prompt,
        || run_transfer(source, destination, options, control, progress).map(|_| ()),
        || take_ownership(source),
    )
}

/// Drive `attempt` until it succeeds, fails for another reason, or the user
/// abandons. `relax` runs before the retry that follows a take-ownership answer.
fn escalate(
    source: &Path,
    prompt: &dyn PermissionPrompt,
    mut attempt: impl FnMut() -> Result<(), EngineError>,
    mut relax: impl FnMut() -> Result<(), EngineError>,
) -> bool {
    let mut result = attempt();

    loop {
        let denied = match result {
            Ok(()) => return true,
            Err(e) if e.is_access_denied() => e,
            Err(e) => {
                log_failure(source, &e);
                return false;
            }
        };

        warn!(source = %source.display(), error = %denied, "permission denied");
        result = match next_action(prompt.decide(source, &denied)) {
            EscalationAction::Retry => {
                info!(source = %source.display(), "retrying as administrator");
                attempt()
            }
            EscalationAction::RelaxPermissionsThenRetry => match relax() {
                Ok(()) => attempt(),
                // Ask again with the original denial.
                Err(_) => Err(denied),
            },
            EscalationAction::GiveUp => {
                info!(source = %source.display(), "user abandoned transfer");
                return false;
            }
        };
    }
}

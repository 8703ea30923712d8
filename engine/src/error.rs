//! Error types for the transfer engine.
//!
//! `EngineError` covers every way a single-file transfer can stop. The retry
//! loop backs off only on errors for which [`EngineError::is_transient`] holds.
//! Cancellation is terminal, access denial is handed to the permission
//! workflow, and any other error ends the transfer at once.

use std::error::Error;
use std::fmt::{self, Display};
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Errors raised by the transfer engine and its ambient modules.
///
/// Note: EngineError wraps io::Error and is therefore neither Clone nor
/// Serialize. Front ends that need to ship an error across a channel should
/// send its `to_string()`.
#[derive(Debug)]
pub enum EngineError {
    /// Source file does not exist
    SourceNotFound { path: PathBuf },

    /// The operating system refused access to the source or destination
    AccessDenied { path: PathBuf, source: io::Error },

    /// Failed to open or read from the source file
    ReadError { path: PathBuf, source: io::Error },

    /// Failed to open, write or sync the destination file
    WriteError { path: PathBuf, source: io::Error },

    /// Failed to create a parent directory of the destination
    DirectoryCreationFailed { path: PathBuf, source: io::Error },

    /// Failed to enumerate a source directory
    EnumerationFailed { path: PathBuf, source: io::Error },

    /// The transfer was canceled through its `TransferControl`
    Canceled,

    /// Transient failures persisted past the transfer timeout
    Timeout {
        elapsed: Duration,
        attempts: u32,
        last_error: Box<EngineError>,
    },

    /// Relaxing permissions on a path failed
    PermissionChangeFailed { path: PathBuf, source: io::Error },

    /// A configuration file could not be read
    ConfigRead { path: PathBuf, source: io::Error },

    /// A configuration file could not be parsed
    ConfigParse { path: PathBuf, message: String },

    /// The logging subscriber could not be installed
    LoggingInit { message: String },
}

impl Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceNotFound { path } => {
                write!(f, "Source file not found: {}", path.display())
            }
            Self::AccessDenied { path, source } => {
                write!(f, "Access denied: {} ({})", path.display(), source)
            }
            Self::ReadError { path, source } => {
                write!(f, "Failed to read file: {} ({})", path.display(), source)
            }
            Self::WriteError { path, source } => {
                write!(f, "Failed to write file: {} ({})", path.display(), source)
            }
            Self::DirectoryCreationFailed { path, .. } => {
                write!(f, "Failed to create directory: {}", path.display())
            }
            Self::EnumerationFailed { path, .. } => {
                write!(f, "Failed to enumerate directory: {}", path.display())
            }
            Self::Canceled => write!(f, "Transfer canceled"),
            Self::Timeout {
                elapsed,
                attempts,
                last_error,
            } => {
                write!(
                    f,
                    "Transfer timed out after {}s and {} attempt(s): {}",
                    elapsed.as_secs(),
                    attempts,
                    last_error
                )
            }
            Self::PermissionChangeFailed { path, .. } => {
                write!(f, "Failed to change permissions of {}", path.display())
            }
            Self::ConfigRead { path, .. } => {
                write!(f, "Failed to read configuration file: {}", path.display())
            }
            Self::ConfigParse { path, message } => {
                write!(f, "Invalid configuration file {}: {}", path.display(), message)
            }
            Self::LoggingInit { message } => {
                write!(f, "Failed to initialize logging: {}", message)
            }
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::AccessDenied { source, .. }
            | Self::ReadError { source, .. }
            | Self::WriteError { source, .. }
            | Self::DirectoryCreationFailed { source, .. }
            | Self::EnumerationFailed { source, .. }
            | Self::PermissionChangeFailed { source, .. }
            | Self::ConfigRead { source, .. } => Some(source),
            Self::Timeout { last_error, .. } => Some(last_error.as_ref()),
            _ => None,
        }
    }
}

impl EngineError {
    /// Wrap an I/O error raised while reading `path`.
    ///
    /// Permission errors become `AccessDenied` so the caller can escalate.
    pub fn read(path: impl Into<PathBuf>, err: io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::PermissionDenied => Self::AccessDenied { path, source: err },
            io::ErrorKind::NotFound => Self::SourceNotFound { path },
            _ => Self::ReadError { path, source: err },
        }
    }

    /// Wrap an I/O error raised while writing `path`.
    pub fn write(path: impl Into<PathBuf>, err: io::Error) -> Self {
        let path = path.into();
        if err.kind() == io::ErrorKind::PermissionDenied {
            Self::AccessDenied { path, source: err }
        } else {
            Self::WriteError { path, source: err }
        }
    }

    /// True if this error is an access denial that only a privilege change can fix.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied { .. })
    }

    /// True if the retry loop should back off and try again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::SourceNotFound { .. }
                | Self::ReadError { .. }
                | Self::WriteError { .. }
                | Self::DirectoryCreationFailed { .. }
        )
    }
}

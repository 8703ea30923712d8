//! # WinMigrate Engine - Resilient File Transfer Library
//!
//! The transfer core of WinMigrate, a utility for moving files between
//! machines over removable media, network shares or a relay directory.
//! Designed as the foundation for multiple front ends (CLI, GUI).
//!
//! ## Overview
//!
//! The engine copies one source file to one destination file per call:
//! - Chunked copy that resumes from the destination's current length
//! - Cooperative pause/cancel through a shared [`TransferControl`]
//! - Bounded retry with exponential backoff on transient I/O errors
//! - SHA-256 integrity verification
//! - An access-denial escalation workflow driven by a front-end prompt
//!
//! Iterating a directory tree is left to callers; [`fs_ops::enumerate_files`]
//! helps with that.
//!
//! ## Basic Usage
//!
//! ```no_run
//! use std::path::Path;
//! use winmigrate_engine::{run_transfer, verify_files, NoProgress, TransferControl, TransferOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let control = TransferControl::new();
//! let report = run_transfer(
//!     Path::new("E:\\backup\\photos.zip"),
//!     Path::new("C:\\Users\\me\\photos.zip"),
//!     &TransferOptions::default(),
//!     &control,
//!     &NoProgress,
//! )?;
//! println!("wrote {} bytes", report.bytes_written);
//!
//! assert!(verify_files(
//!     Path::new("E:\\backup\\photos.zip"),
//!     Path::new("C:\\Users\\me\\photos.zip"),
//! )?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - **control**: pause/cancel signals shared with the controller
//! - **copier**: one chunked copy pass
//! - **transfer**: retry/backoff loop and the resumable-copy-and-verify path
//! - **checksums**: digests and verification
//! - **permissions**: access-denial escalation
//! - **model**, **error**, **progress**: data types, errors, observer trait
//! - **config**, **logging**, **fs_ops**: ambient support for front ends
//! - **restore**, **programs**: restore script and installed-programs report
//!   written alongside a migration

pub mod checksums;
pub mod config;
pub mod control;
pub mod copier;
pub mod error;
pub mod fs_ops;
pub mod logging;
pub mod model;
pub mod permissions;
pub mod programs;
pub mod progress;
pub mod restore;
pub mod transfer;

pub use checksums::{
    compute_file_checksum, prefix_matches, verify, verify_files, verify_files_with, verify_with,
    ChecksumAlgorithm, ChecksumValue,
};
pub use config::{ConfigOverrides, TransferConfig};
pub use control::{TransferControl, PAUSE_POLL_INTERVAL};
pub use copier::copy_chunk;
pub use error::EngineError;
pub use model::{
    ChunkPass, ResumePolicy, TransferAttempt, TransferOptions, TransferReport, TransferState,
    DEFAULT_CHUNK_SIZE, DEFAULT_TIMEOUT,
};
pub use permissions::{
    next_action, take_ownership, transfer_with_permissions, EscalationAction, PermissionDecision,
    PermissionPrompt,
};
pub use programs::{generate_report, scan_installed_programs, ProgramInfo};
pub use progress::{NoProgress, ProgressCallback};
pub use restore::{render_restore_script, write_restore_script};
pub use transfer::{
    backoff_delay, copy_file_resumable, copy_file_resumable_with, run_transfer, transfer,
    MAX_BACKOFF_SECS,
};

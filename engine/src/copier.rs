//! Single-pass chunked copy.
//!
//! `copy_chunk` copies from a byte offset to the end of the source in
//! fixed-size chunks, in source order. Between chunks it honors the
//! transfer's pause and cancel signals; before suspending or stopping it
//! syncs the destination so its length is always a valid resume offset.
//!
//! I/O errors are returned as-is. Deciding whether to retry is the job of
//! [`crate::transfer`].

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, trace};

use crate::control::TransferControl;
use crate::error::EngineError;
use crate::fs_ops;
use crate::model::{ChunkPass, DEFAULT_CHUNK_SIZE};
use crate::progress::ProgressCallback;

/// Copy `source` into `destination` starting at `start_offset`.
///
/// The destination is opened for append when `start_offset > 0` and
/// truncated otherwise. A `chunk_size` of 0 selects [`DEFAULT_CHUNK_SIZE`].
///
/// # Returns
/// The bytes written by this pass and `done = true` once the end of the
/// source was reached.
///
/// # Errors
/// `Canceled` if the control was canceled (immediately or while paused), or
/// the read/write error that interrupted the pass.
pub fn copy_chunk(
    source: &Path,
    destination: &Path,
    start_offset: u64,
    chunk_size: usize,
    control: &TransferControl,
    progress: &dyn ProgressCallback,
) -> Result<ChunkPass, EngineError> {
    let chunk_size = if chunk_size == 0 {
        DEFAULT_CHUNK_SIZE
    } else {
        chunk_size
    };

    let mut src_file = File::open(source).map_err(|e| EngineError::read(source, e))?;
    let total_bytes = src_file
        .metadata()
        .map_err(|e| EngineError::read(source, e))?
        .len();
    src_file
        .seek(SeekFrom::Start(start_offset))
        .map_err(|e| EngineError::read(source, e))?;

    fs_ops::ensure_parent_dir_exists(destination)?;
    let mut dst_file = open_destination(destination, start_offset)
        .map_err(|e| EngineError::write(destination, e))?;

    debug!(
        source = %source.display(),
        destination = %destination.display(),
        offset = start_offset,
        total_bytes,
        "copy pass started"
    );

    let mut buffer = vec![0u8; chunk_size];
    let mut copied: u64 = 0;

    loop {
        if control.is_canceled() {
            sync(&dst_file, destination)?;
            debug!(offset = start_offset + copied, "copy pass canceled");
            return Err(EngineError::Canceled);
        }
        if control.is_paused() {
            sync(&dst_file, destination)?;
            debug!(offset = start_offset + copied, "copy pass paused");
            control.wait_while_paused()?;
            debug!(offset = start_offset + copied, "copy pass resumed");
        }

        let n = match src_file.read(&mut buffer) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(EngineError::read(source, e)),
        };
        if n == 0 {
            sync(&dst_file, destination)?;
            return Ok(ChunkPass {
                bytes_copied: copied,
                total_bytes,
                done: true,
            });
        }

        dst_file
            .write_all(&buffer[..n])
            .map_err(|e| EngineError::write(destination, e))?;
        copied += n as u64;
        trace!(offset = start_offset + copied, "chunk written");
        progress.on_progress(start_offset + copied, total_bytes);
    }
}

fn open_destination(path: &Path, start_offset: u64) -> io::Result<File> {
    if start_offset > 0 {
        OpenOptions::new().create(true).append(true).open(path)
    } else {
        File::create(path)
    }
}

fn sync(file: &File, path: &Path) -> Result<(), EngineError> {
    file.sync_data().map_err(|e| EngineError::write(path, e))
}

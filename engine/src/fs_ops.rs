//! Filesystem operations module.
//!
//! Low-level helpers shared by the copier and by callers:
//! - Creating the destination's parent directories
//! - Reading the current destination length (the resume offset)
//! - Preserving modification times
//! - Enumerating a directory tree into source/destination file pairs

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::EngineError;

/// A single file to migrate, as produced by [`enumerate_files`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePair {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub size: u64,
}

/// Enumerate every regular file under `source`, mapping each onto the
/// matching path under `destination_root`.
///
/// Entries are sorted by path so callers transfer in a stable order.
///
/// # Errors
/// Returns EngineError if any directory cannot be read.
pub fn enumerate_files(
    source: &Path,
    destination_root: &Path,
) -> Result<Vec<FilePair>, EngineError> {
    fn recurse(
        dir: &Path,
        rel_path: &Path,
        destination_root: &Path,
        pairs: &mut Vec<FilePair>,
    ) -> Result<(), EngineError> {
        let entries = fs::read_dir(dir).map_err(|e| EngineError::EnumerationFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| EngineError::EnumerationFailed {
                path: dir.to_path_buf(),
                source: e,
            })?;
            let metadata = entry.metadata().map_err(|e| EngineError::EnumerationFailed {
                path: entry.path(),
                source: e,
            })?;

            let rel_full_path = rel_path.join(entry.file_name());
            if metadata.is_dir() {
                recurse(&entry.path(), &rel_full_path, destination_root, pairs)?;
            } else if metadata.is_file() {
                pairs.push(FilePair {
                    source: entry.path(),
                    destination: destination_root.join(&rel_full_path),
                    size: metadata.len(),
                });
            }
        }
        Ok(())
    }

    let mut pairs = Vec::new();
    recurse(source, Path::new(""), destination_root, &mut pairs)?;
    pairs.sort_by(|a, b| a.source.cmp(&b.source));
    Ok(pairs)
}

/// Current length of `path`, or 0 when it does not exist.
pub fn destination_len(path: &Path) -> Result<u64, EngineError> {
    match fs::metadata(path) {
        Ok(metadata) => Ok(metadata.len()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(EngineError::write(path, e)),
    }
}

/// Copy the modification time of `src` onto `dst`.
pub fn preserve_mtime(src: &Path, dst: &Path) -> io::Result<()> {
    let mtime = fs::metadata(src)?.modified()?;
    filetime::set_file_mtime(dst, filetime::FileTime::from_system_time(mtime))
}

/// Ensure the parent directory of a path exists, creating it if necessary.
///
/// # Errors
/// Returns EngineError if the parent exists but is not a directory, or if
/// directory creation fails.
pub fn ensure_parent_dir_exists(path: &Path) -> Result<(), EngineError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    // Relative file name with no directory component
    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    match fs::metadata(parent) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(EngineError::DirectoryCreationFailed {
            path: parent.to_path_buf(),
            source: io::Error::new(
                io::ErrorKind::InvalidInput,
                "Parent path exists but is not a directory",
            ),
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(parent).map_err(|e| {
                if e.kind() == io::ErrorKind::PermissionDenied {
                    EngineError::AccessDenied {
                        path: parent.to_path_buf(),
                        source: e,
                    }
                } else {
                    EngineError::DirectoryCreationFailed {
                        path: parent.to_path_buf(),
                        source: e,
                    }
                }
            })
        }
        Err(e) => Err(EngineError::DirectoryCreationFailed {
            path: parent.to_path_buf(),
            source: e,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_enumerate_nested_directory() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let subdir = src.join("subdir");
        fs::create_dir_all(&subdir).expect("Failed to create subdir");

        let mut file1 = fs::File::create(src.join("file1.txt")).expect("Failed to create file1");
        file1.write_all(b"data1").expect("Failed to write file1");
        let mut file2 = fs::File::create(subdir.join("file2.txt")).expect("Failed to create file2");
        file2.write_all(b"data22").expect("Failed to write file2");

        let dst = temp_dir.path().join("dst");
        let pairs = enumerate_files(&src, &dst).expect("Failed to enumerate");

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].destination, dst.join("file1.txt"));
        assert_eq!(pairs[1].destination, dst.join("subdir").join("file2.txt"));
        let total: u64 = pairs.iter().map(|p| p.size).sum();
        assert_eq!(total, 11);
    }

    #[test]
    fn test_enumerate_nonexistent_source() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("nonexistent");
        let dst = temp_dir.path().join("dst");

        let result = enumerate_files(&src, &dst);
        assert!(matches!(result, Err(EngineError::EnumerationFailed { .. })));
    }

    #[test]
    fn test_destination_len_missing_is_zero() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("absent.bin");
        assert_eq!(destination_len(&path).unwrap(), 0);

        fs::write(&path, b"12345").unwrap();
        assert_eq!(destination_len(&path).unwrap(), 5);
    }

    #[test]
    fn test_ensure_parent_dir_exists() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("a").join("b").join("file.txt");

        ensure_parent_dir_exists(&path).expect("Failed to create parent");
        assert!(path.parent().unwrap().is_dir());
    }

    #[test]
    fn test_ensure_parent_rejects_file_parent() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();

        let result = ensure_parent_dir_exists(&blocker.join("file.txt"));
        assert!(matches!(result, Err(EngineError::DirectoryCreationFailed { .. })));
    }

    #[test]
    fn test_preserve_mtime() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src.txt");
        let dst = temp_dir.path().join("dst.txt");
        fs::write(&src, b"a").unwrap();
        fs::write(&dst, b"a").unwrap();

        let past = filetime::FileTime::from_unix_time(1_000_000_000, 0);
        filetime::set_file_mtime(&src, past).unwrap();

        preserve_mtime(&src, &dst).expect("Failed to preserve mtime");
        let dst_mtime = filetime::FileTime::from_last_modification_time(&fs::metadata(&dst).unwrap());
        assert_eq!(dst_mtime, past);
    }
}

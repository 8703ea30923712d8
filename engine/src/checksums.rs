//! Checksum computation and integrity verification.
//!
//! This module provides:
//! - Streaming file digests (SHA-256 by default; BLAKE3, MD5 and CRC32 on request)
//! - Source/destination comparison after a transfer
//! - Prefix comparison, used when a resume must not trust the destination blindly
//!
//! Digests are computed on demand and never cached between calls.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

use sha2::Digest;
use tracing::{debug, error, info};

use crate::error::EngineError;

const BUFFER_SIZE: usize = 64 * 1024;

/// Supported checksum algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChecksumAlgorithm {
    /// SHA-256, the integrity oracle used by the transfer paths
    #[default]
    Sha256,
    /// BLAKE3 (modern, fast, 256-bit)
    Blake3,
    /// MD5 (compatibility only)
    Md5,
    /// CRC32 (fast, 32-bit, not collision resistant)
    Crc32,
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => write!(f, "sha256"),
            Self::Blake3 => write!(f, "blake3"),
            Self::Md5 => write!(f, "md5"),
            Self::Crc32 => write!(f, "crc32"),
        }
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "blake3" => Ok(Self::Blake3),
            "md5" => Ok(Self::Md5),
            "crc32" => Ok(Self::Crc32),
            other => Err(format!(
                "unknown checksum algorithm '{}' (expected sha256, blake3, md5 or crc32)",
                other
            )),
        }
    }
}

/// A computed checksum value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumValue {
    algorithm: ChecksumAlgorithm,
    hex: String,
}

impl ChecksumValue {
    pub fn new(algorithm: ChecksumAlgorithm, hex: String) -> Self {
        ChecksumValue { algorithm, hex }
    }

    pub fn hex(&self) -> &str {
        &self.hex
    }
}

impl fmt::Display for ChecksumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

enum Hasher {
    Sha256(sha2::Sha256),
    Blake3(Box<blake3::Hasher>),
    Md5(md5::Context),
    Crc32(crc32fast::Hasher),
}

impl Hasher {
    fn new(algorithm: ChecksumAlgorithm) -> Self {
        match algorithm {
            ChecksumAlgorithm::Sha256 => Hasher::Sha256(sha2::Sha256::new()),
            ChecksumAlgorithm::Blake3 => Hasher::Blake3(Box::new(blake3::Hasher::new())),
            ChecksumAlgorithm::Md5 => Hasher::Md5(md5::Context::new()),
            ChecksumAlgorithm::Crc32 => Hasher::Crc32(crc32fast::Hasher::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Sha256(h) => h.update(data),
            Hasher::Blake3(h) => {
                h.update(data);
            }
            Hasher::Md5(h) => h.consume(data),
            Hasher::Crc32(h) => h.update(data),
        }
    }

    fn finalize(self) -> ChecksumValue {
        match self {
            Hasher::Sha256(h) => {
                ChecksumValue::new(ChecksumAlgorithm::Sha256, format!("{:x}", h.finalize()))
            }
            Hasher::Blake3(h) => {
                ChecksumValue::new(ChecksumAlgorithm::Blake3, h.finalize().to_hex().to_string())
            }
            Hasher::Md5(h) => ChecksumValue::new(ChecksumAlgorithm::Md5, format!("{:x}", h.compute())),
            Hasher::Crc32(h) => {
                ChecksumValue::new(ChecksumAlgorithm::Crc32, format!("{:08x}", h.finalize()))
            }
        }
    }
}

/// Digest at most `limit` bytes of `path` (the whole file when `None`).
fn digest_reader(
    path: &Path,
    algorithm: ChecksumAlgorithm,
    limit: Option<u64>,
) -> Result<ChecksumValue, EngineError> {
    let file = File::open(path).map_err(|e| EngineError::read(path, e))?;
    let mut reader: Box<dyn Read> = match limit {
        Some(limit) => Box::new(file.take(limit)),
        None => Box::new(file),
    };

    let mut hasher = Hasher::new(algorithm);
    let mut buffer = vec![0u8; BUFFER_SIZE];
    loop {
        match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => hasher.update(&buffer[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(EngineError::read(path, e)),
        }
    }
    Ok(hasher.finalize())
}

/// Compute the digest of a file's full content, streaming.
pub fn compute_file_checksum(
    path: &Path,
    algorithm: ChecksumAlgorithm,
) -> Result<ChecksumValue, EngineError> {
    digest_reader(path, algorithm, None)
}

/// Compare the SHA-256 digests of `source` and `destination`.
///
/// # Errors
/// Returns EngineError if either file cannot be read.
pub fn verify_files(source: &Path, destination: &Path) -> Result<bool, EngineError> {
    verify_files_with(source, destination, ChecksumAlgorithm::Sha256)
}

/// Compare digests of `source` and `destination` with the given algorithm.
pub fn verify_files_with(
    source: &Path,
    destination: &Path,
    algorithm: ChecksumAlgorithm,
) -> Result<bool, EngineError> {
    let source_digest = compute_file_checksum(source, algorithm)?;
    let dest_digest = compute_file_checksum(destination, algorithm)?;
    debug!(source = %source_digest, destination = %dest_digest, "digests computed");
    Ok(source_digest == dest_digest)
}

/// Boolean form of [`verify_files`]; read errors are logged and count as a mismatch.
pub fn verify(source: &Path, destination: &Path) -> bool {
    verify_with(source, destination, ChecksumAlgorithm::Sha256)
}

/// Boolean form of [`verify_files_with`].
pub fn verify_with(source: &Path, destination: &Path, algorithm: ChecksumAlgorithm) -> bool {
    match verify_files_with(source, destination, algorithm) {
        Ok(true) => {
            info!(source = %source.display(), %algorithm, "transfer verified");
            true
        }
        Ok(false) => {
            error!(
                source = %source.display(),
                destination = %destination.display(),
                %algorithm,
                "digest mismatch"
            );
            false
        }
        Err(e) => {
            error!(source = %source.display(), error = %e, "verification failed");
            false
        }
    }
}

/// True if the first `len` bytes of `source` and `destination` hash equal.
///
/// A source shorter than `len` never matches.
pub fn prefix_matches(source: &Path, destination: &Path, len: u64) -> Result<bool, EngineError> {
    let source_len = std::fs::metadata(source)
        .map_err(|e| EngineError::read(source, e))?
        .len();
    if source_len < len {
        return Ok(false);
    }
    let source_digest = digest_reader(source, ChecksumAlgorithm::Sha256, Some(len))?;
    let dest_digest = digest_reader(destination, ChecksumAlgorithm::Sha256, Some(len))?;
    Ok(source_digest == dest_digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_algorithm_round_trips_through_display() {
        for algo in [
            ChecksumAlgorithm::Sha256,
            ChecksumAlgorithm::Blake3,
            ChecksumAlgorithm::Md5,
            ChecksumAlgorithm::Crc32,
        ] {
            assert_eq!(algo.to_string().parse::<ChecksumAlgorithm>(), Ok(algo));
        }
        assert_eq!("SHA-256".parse::<ChecksumAlgorithm>(), Ok(ChecksumAlgorithm::Sha256));
        assert!("sha1".parse::<ChecksumAlgorithm>().is_err());
    }

    #[test]
    fn test_known_digests() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("abc.txt");
        fs::write(&path, b"abc").unwrap();

        let sha = compute_file_checksum(&path, ChecksumAlgorithm::Sha256).unwrap();
        assert_eq!(
            sha.hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        let md5 = compute_file_checksum(&path, ChecksumAlgorithm::Md5).unwrap();
        assert_eq!(md5.hex(), "900150983cd24fb0d6963f7d28e17f72");
        let crc = compute_file_checksum(&path, ChecksumAlgorithm::Crc32).unwrap();
        assert_eq!(crc.hex(), "352441c2");
        let blake = compute_file_checksum(&path, ChecksumAlgorithm::Blake3).unwrap();
        assert_eq!(blake.hex().len(), 64);
    }

    #[test]
    fn test_verify_file_against_itself() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("self.bin");
        fs::write(&path, vec![7u8; 200_000]).unwrap();

        assert!(verify(&path, &path));
        assert!(verify_files(&path, &path).unwrap());
    }

    #[test]
    fn test_verify_detects_mismatch() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let a = temp_dir.path().join("a.bin");
        let b = temp_dir.path().join("b.bin");
        fs::write(&a, b"same length A").unwrap();
        fs::write(&b, b"same length B").unwrap();

        assert!(!verify(&a, &b));
        assert!(!verify_files_with(&a, &b, ChecksumAlgorithm::Blake3).unwrap());
    }

    #[test]
    fn test_verify_missing_destination_is_false() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let a = temp_dir.path().join("a.bin");
        fs::write(&a, b"x").unwrap();

        assert!(!verify(&a, &temp_dir.path().join("missing.bin")));
        assert!(verify_files(&a, &temp_dir.path().join("missing.bin")).is_err());
    }

    #[test]
    fn test_prefix_matches() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src.bin");
        let good = temp_dir.path().join("good.bin");
        let bad = temp_dir.path().join("bad.bin");
        fs::write(&src, b"0123456789").unwrap();
        fs::write(&good, b"01234").unwrap();
        fs::write(&bad, b"corrupt").unwrap();

        assert!(prefix_matches(&src, &good, 5).unwrap());
        assert!(!prefix_matches(&src, &bad, 7).unwrap());
        assert!(!prefix_matches(&src, &good, 11).unwrap());
        assert!(prefix_matches(&src, &good, 0).unwrap());
    }
}

//! Post-transfer integrity checking.
//!
//! Streams a local file through CRC32 (IEEE polynomial, the one Ethernet
//! and zip use) in fixed-size chunks, so memory use is independent of file
//! size. CRC32 detects accidental transmission corruption only — it is not
//! collision resistant and must never be treated as a tamper-evidence
//! mechanism.

use crate::error::EngineError;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Chunk size for the streaming read.
const READ_BUF_SIZE: usize = 64 * 1024;

/// A computed CRC32 digest, rendered as 8 lowercase hex digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumValue {
    hex: String,
}

impl ChecksumValue {
    fn from_crc(crc: u32) -> Self {
        ChecksumValue {
            hex: format!("{:08x}", crc),
        }
    }

    /// The hex string representation.
    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// Compare against a caller-supplied hex digest, ignoring ASCII case.
    pub fn matches(&self, other: &str) -> bool {
        self.hex.eq_ignore_ascii_case(other.trim())
    }
}

impl fmt::Display for ChecksumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hex)
    }
}

/// Compute the CRC32 checksum of a file.
///
/// Reads in 64 KiB chunks; never loads the whole file into memory.
///
/// # Errors
/// Returns `LocalIo` if the file cannot be opened or read.
pub fn compute_file_checksum(path: &Path) -> Result<ChecksumValue, EngineError> {
    let mut file = File::open(path).map_err(|e| EngineError::LocalIo {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut hasher = crc32fast::Hasher::new();
    let mut buffer = [0u8; READ_BUF_SIZE];

    loop {
        match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => hasher.update(&buffer[..n]),
            Err(e) => {
                return Err(EngineError::LocalIo {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        }
    }

    Ok(ChecksumValue::from_crc(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_known_vector() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("hello.txt");
        fs::write(&path, b"hello").expect("Failed to write file");

        // CRC32/IEEE of "hello"
        let checksum = compute_file_checksum(&path).expect("Failed to compute checksum");
        assert_eq!(checksum.hex(), "3610a686");
    }

    #[test]
    fn test_empty_file() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("empty.bin");
        fs::write(&path, b"").expect("Failed to write file");

        let checksum = compute_file_checksum(&path).expect("Failed to compute checksum");
        assert_eq!(checksum.hex(), "00000000");
    }

    #[test]
    fn test_determinism() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("data.bin");
        fs::write(&path, vec![0xabu8; 200_000]).expect("Failed to write file");

        let first = compute_file_checksum(&path).expect("Failed to compute checksum");
        let second = compute_file_checksum(&path).expect("Failed to compute checksum");
        assert_eq!(first, second);
    }

    #[test]
    fn test_single_byte_flip_changes_digest() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("data.bin");

        let mut content = vec![0x55u8; 4096];
        fs::write(&path, &content).expect("Failed to write file");
        let original = compute_file_checksum(&path).expect("Failed to compute checksum");

        content[2048] ^= 0x01;
        fs::write(&path, &content).expect("Failed to rewrite file");
        let flipped = compute_file_checksum(&path).expect("Failed to compute checksum");

        assert_ne!(original, flipped);
    }

    #[test]
    fn test_missing_file_is_local_io_error() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("nonexistent.bin");

        let err = compute_file_checksum(&path).expect_err("Expected an error");
        assert_eq!(err.kind(), "local_io");
    }

    #[test]
    fn test_matches_ignores_case_and_whitespace() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("hello.txt");
        fs::write(&path, b"hello").expect("Failed to write file");

        let checksum = compute_file_checksum(&path).expect("Failed to compute checksum");
        assert!(checksum.matches("3610A686"));
        assert!(checksum.matches(" 3610a686 "));
        assert!(!checksum.matches("00000000"));
    }
}

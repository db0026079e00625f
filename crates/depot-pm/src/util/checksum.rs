//! Checksum verification for downloaded artifacts.

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use std::path::Path;

use crate::Result;

/// Supported checksum types, in the order repositories are probed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumType {
    Sha512,
    Sha256,
    Sha1,
    Md5,
}

impl ChecksumType {
    pub const ALL: [ChecksumType; 4] = [
        ChecksumType::Sha512,
        ChecksumType::Sha256,
        ChecksumType::Sha1,
        ChecksumType::Md5,
    ];

    /// Extension of the side file published next to an artifact
    pub fn extension(&self) -> &'static str {
        match self {
            ChecksumType::Sha512 => "sha512",
            ChecksumType::Sha256 => "sha256",
            ChecksumType::Sha1 => "sha1",
            ChecksumType::Md5 => "md5",
        }
    }
}

/// Hex digest of a file
pub fn compute_checksum(path: &Path, checksum_type: ChecksumType) -> Result<String> {
    let buffer = std::fs::read(path)?;

    Ok(match checksum_type {
        ChecksumType::Sha1 => format!("{:x}", Sha1::digest(&buffer)),
        ChecksumType::Sha256 => format!("{:x}", Sha256::digest(&buffer)),
        ChecksumType::Sha512 => format!("{:x}", Sha512::digest(&buffer)),
        ChecksumType::Md5 => format!("{:x}", Md5::digest(&buffer)),
    })
}

/// Verify a file against the contents of a checksum side file.
///
/// Side files may carry a trailing file name (`<hex>  name.jar`); only the
/// first token is compared.
pub fn verify_checksum(path: &Path, side_file: &str, checksum_type: ChecksumType) -> Result<bool> {
    let expected = side_file.split_whitespace().next().unwrap_or_default();
    let actual = compute_checksum(path, checksum_type)?;
    Ok(actual.eq_ignore_ascii_case(expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_verify_sha1_with_file_name() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.jar");
        std::fs::write(&file, b"hello").unwrap();

        let side = "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d  a.jar\n";
        assert!(verify_checksum(&file, side, ChecksumType::Sha1).unwrap());
        assert!(!verify_checksum(&file, "deadbeef", ChecksumType::Sha1).unwrap());
    }

    #[test]
    fn test_compute_md5() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.jar");
        std::fs::write(&file, b"hello").unwrap();

        assert_eq!(
            compute_checksum(&file, ChecksumType::Md5).unwrap(),
            "5d41402abc4b2a76b9719d911017c592"
        );
    }
}

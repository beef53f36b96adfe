//! Content hashes for downloaded packages.

use crate::error::UpdateError;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

/// Lower-case hex SHA-256 of a file, read in chunks.
pub fn sha256_file(path: &Path) -> Result<String, UpdateError> {
    let io_err = |source| UpdateError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(io_err)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher).map_err(io_err)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Checks a downloaded package against the hash the auth gate returned.
///
/// The comparison ignores case.
pub fn verify_artifact(path: &Path, expected_sha256: &str) -> Result<(), UpdateError> {
    let actual = sha256_file(path)?;
    if actual.eq_ignore_ascii_case(expected_sha256.trim()) {
        Ok(())
    } else {
        Err(UpdateError::HashMismatch {
            expected: expected_sha256.trim().to_ascii_lowercase(),
            actual,
        })
    }
}

//! SHA-256 fingerprints used to detect writes by other processes.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{ConfigError, Result};

/// Hex-encoded SHA-256 of a byte slice.
pub fn fingerprint_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Fingerprint of the file at `path`, or `None` if it does not exist.
pub fn fingerprint_file(path: &Path) -> Result<Option<String>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(fingerprint_bytes(&bytes))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ConfigError::Io {
            operation: "read",
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

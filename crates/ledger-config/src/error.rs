//! Knowledge base storage errors.
//!
//! All store operations return structured errors that provide
//! user-friendly messages and optional remediation hints.

use std::path::PathBuf;
use std::time::Duration;

use ledger_model::ModelError;
use thiserror::Error;

/// Knowledge base storage error.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The backing file does not exist.
    #[error("Knowledge base not found: {path}")]
    NotFound { path: PathBuf },

    /// The backing file exists but is not a valid knowledge base.
    #[error("Invalid knowledge base {path}: {reason}")]
    Format { path: PathBuf, reason: String },

    /// File I/O error.
    #[error("Failed to {operation} file: {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Atomic write failed (temp file couldn't be renamed).
    #[error("Failed to complete save operation")]
    AtomicWriteFailed {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Another writer kept changing the file between our read and our write.
    #[error("Knowledge base {path} changed concurrently ({attempts} attempts)")]
    WriteConflict { path: PathBuf, attempts: u32 },

    /// The store lock could not be acquired in time.
    #[error("Timed out after {waited:?} waiting for lock {lock_path}")]
    LockTimeout { lock_path: PathBuf, waited: Duration },

    /// A synonym update was rejected by the model.
    #[error("Invalid synonym update: {0}")]
    InvalidSynonym(#[from] ModelError),

    /// Serialization error.
    #[error("Failed to serialize knowledge base")]
    Serialization {
        #[source]
        source: serde_yaml::Error,
    },
}

impl ConfigError {
    /// True for errors that make the whole run pointless (no catalog to match against).
    pub fn is_fatal_at_load(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Format { .. })
    }

    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { path } => {
                format!("No knowledge base was found at {}", path.display())
            }
            Self::Format { path, reason } => {
                format!(
                    "The file at {} is not a valid knowledge base: {}",
                    path.display(),
                    reason
                )
            }
            Self::Io {
                operation, path, ..
            } => {
                format!("Could not {} the file at {}", operation, path.display())
            }
            Self::AtomicWriteFailed { target_path, .. } => {
                format!(
                    "Could not save the knowledge base to {}. Please check disk space and permissions.",
                    target_path.display()
                )
            }
            Self::WriteConflict { path, attempts } => {
                format!(
                    "The knowledge base at {} kept changing while saving (gave up after {} attempts).",
                    path.display(),
                    attempts
                )
            }
            Self::LockTimeout { lock_path, .. } => {
                format!(
                    "Another process is holding the knowledge base lock ({}).",
                    lock_path.display()
                )
            }
            Self::InvalidSynonym(err) => format!("The synonym update was rejected: {err}"),
            Self::Serialization { .. } => {
                "An error occurred while writing the knowledge base.".to_string()
            }
        }
    }

    /// Get a suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::NotFound { .. } => {
                Some("Run `ledger-mapper init` to create a knowledge base with the built-in catalog.".into())
            }
            Self::Format { .. } => {
                Some("Fix the YAML by hand or restore it from a backup.".into())
            }
            Self::Io { operation, .. } => {
                if *operation == "read" {
                    Some("Check that the file exists and you have permission to read it.".into())
                } else {
                    Some("Check that you have permission to write to this location.".into())
                }
            }
            Self::AtomicWriteFailed { .. } => {
                Some("Free up disk space or try saving to a different location.".into())
            }
            Self::WriteConflict { .. } => {
                Some("Re-run the training session once other writers have finished.".into())
            }
            Self::LockTimeout { .. } => Some(
                "Wait for the other session to finish, or delete the lock file if no session is running."
                    .into(),
            ),
            Self::InvalidSynonym(_) | Self::Serialization { .. } => None,
        }
    }
}

/// Result type alias for knowledge base operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

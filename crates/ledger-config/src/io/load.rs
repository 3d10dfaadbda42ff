//! Knowledge base loading.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use ledger_model::{KnowledgeBase, SynonymConflict};

use crate::document::ConfigDocument;
use crate::error::{ConfigError, Result};

/// Read and parse the document at `path`.
///
/// Returns the raw bytes alongside the parsed state so the caller can
/// fingerprint exactly what was read.
pub fn read_document(path: &Path) -> Result<(Vec<u8>, KnowledgeBase, Vec<SynonymConflict>)> {
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ConfigError::NotFound {
            path: path.to_path_buf(),
        },
        _ => ConfigError::Io {
            operation: "read",
            path: path.to_path_buf(),
            source: e,
        },
    })?;
    let (kb, conflicts) = parse_document(&bytes, path)?;
    Ok((bytes, kb, conflicts))
}

/// Parse document bytes into the model.
pub fn parse_document(bytes: &[u8], path: &Path) -> Result<(KnowledgeBase, Vec<SynonymConflict>)> {
    let format_error = |reason: String| ConfigError::Format {
        path: path.to_path_buf(),
        reason,
    };
    let document: ConfigDocument =
        serde_yaml::from_slice(bytes).map_err(|e| format_error(e.to_string()))?;
    document.into_knowledge_base().map_err(format_error)
}

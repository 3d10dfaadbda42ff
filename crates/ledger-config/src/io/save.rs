//! Knowledge base saving.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use ledger_model::KnowledgeBase;

use crate::document::ConfigDocument;
use crate::error::{ConfigError, Result};

/// Serialize the knowledge base to its YAML form.
pub fn render_document(kb: &KnowledgeBase) -> Result<Vec<u8>> {
    let document = ConfigDocument::from(kb);
    serde_yaml::to_string(&document)
        .map(String::into_bytes)
        .map_err(|source| ConfigError::Serialization { source })
}

/// Write `bytes` to `path` via a synced temp file and rename.
///
/// A crash at any point leaves either the previous file or the new one,
/// never a partial document.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
            operation: "create directory",
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let temp_path = sibling_path(path, ".tmp");

    let mut file = File::create(&temp_path).map_err(|e| ConfigError::Io {
        operation: "create",
        path: temp_path.clone(),
        source: e,
    })?;

    file.write_all(bytes).map_err(|e| ConfigError::Io {
        operation: "write",
        path: temp_path.clone(),
        source: e,
    })?;

    file.sync_all().map_err(|e| ConfigError::Io {
        operation: "sync",
        path: temp_path.clone(),
        source: e,
    })?;
    drop(file);

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(ConfigError::AtomicWriteFailed {
            temp_path,
            target_path: path.to_path_buf(),
            source: e,
        });
    }

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "wrote knowledge base");
    Ok(())
}

/// `path` with `suffix` appended to its file name (`kb.yaml` -> `kb.yaml.tmp`).
pub(crate) fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("knowledge_base"));
    name.push(suffix);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn atomic_write_replaces_content_and_cleans_up() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config").join("kb.yaml");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
        assert!(!sibling_path(&path, ".tmp").exists());
    }

    #[test]
    fn rendered_default_catalog_is_yaml() {
        let bytes = render_document(&KnowledgeBase::with_default_catalog()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("field_definitions:"));
        assert!(text.contains("BELNR"));
        assert!(text.contains("min_confidence_threshold: 0.6"));
    }
}

//! The shared, persisted knowledge base handle.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use ledger_model::{
    FieldDefinition, FieldId, KnowledgeBase, SynonymEntry, UpsertOutcome, header_key,
};
use tracing::{info, warn};

use crate::error::{ConfigError, Result};
use crate::io::{
    LockOptions, StoreLock, fingerprint_bytes, fingerprint_file, read_document, render_document,
    write_atomic,
};

/// Tuning for a [`ConfigStore`].
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    pub lock: LockOptions,
    /// Attempts at a read-modify-write before giving up with `WriteConflict`.
    pub max_write_attempts: u32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            lock: LockOptions::default(),
            max_write_attempts: 3,
        }
    }
}

/// Owner of the field catalog and synonym knowledge base.
///
/// Readers take cheap [`Arc`] snapshots; writers build a modified copy and
/// swap it in, so a reader never observes a half-applied update. Writes to
/// the backing file go through a lock file plus temp-file rename, and a
/// SHA-256 fingerprint of the last file content seen detects writers in
/// other processes.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    options: StoreOptions,
    state: RwLock<Arc<KnowledgeBase>>,
    /// Fingerprint of the file content `state` was last synced with.
    fingerprint: Mutex<Option<String>>,
    /// Serializes writers within this process.
    write_guard: Mutex<()>,
    dirty: AtomicBool,
}

impl ConfigStore {
    /// Load the knowledge base at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_options(path, StoreOptions::default())
    }

    pub fn load_with_options(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (bytes, kb, conflicts) = read_document(&path)?;
        info!(
            path = %path.display(),
            fields = kb.len(),
            erps = kb.erp_names().len(),
            conflicts = conflicts.len(),
            "loaded knowledge base"
        );
        Ok(Self::from_state(path, options, kb, Some(fingerprint_bytes(&bytes))))
    }

    /// Write `kb` to `path` and return a store over it.
    ///
    /// Overwrites any existing file.
    pub fn create(path: impl AsRef<Path>, kb: KnowledgeBase) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let options = StoreOptions::default();
        let bytes = render_document(&kb)?;
        {
            let _lock = StoreLock::acquire(&path, options.lock)?;
            write_atomic(&path, &bytes)?;
        }
        info!(path = %path.display(), fields = kb.len(), "created knowledge base");
        Ok(Self::from_state(path, options, kb, Some(fingerprint_bytes(&bytes))))
    }

    fn from_state(
        path: PathBuf,
        options: StoreOptions,
        kb: KnowledgeBase,
        fingerprint: Option<String>,
    ) -> Self {
        Self {
            path,
            options,
            state: RwLock::new(Arc::new(kb)),
            fingerprint: Mutex::new(fingerprint),
            write_guard: Mutex::new(()),
            dirty: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current immutable snapshot.
    pub fn snapshot(&self) -> Arc<KnowledgeBase> {
        Arc::clone(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// All field definitions of the current snapshot.
    pub fn get_definitions(&self) -> Vec<FieldDefinition> {
        self.snapshot().definitions().cloned().collect()
    }

    /// Synonyms under `erp` whose text normalizes like `text`.
    pub fn find_synonyms(&self, erp: &str, text: &str) -> Vec<(FieldId, SynonymEntry)> {
        self.snapshot()
            .find_synonyms(erp, text)
            .into_iter()
            .map(|(id, entry)| (id, entry.clone()))
            .collect()
    }

    /// True when in-memory edits have not been persisted.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Apply a synonym upsert to the in-memory state only.
    ///
    /// On error the state is unchanged.
    pub fn upsert_synonym(&self, field: FieldId, entry: SynonymEntry) -> Result<UpsertOutcome> {
        let _writer = self.lock_writers();
        let mut next = (*self.snapshot()).clone();
        let outcome = next.upsert_synonym(field, entry)?;
        self.swap(next);
        self.dirty.store(true, Ordering::Release);
        Ok(outcome)
    }

    /// Durably write the current state.
    ///
    /// Fails with `WriteConflict` if another process changed the file since
    /// this store last read or wrote it; call [`ConfigStore::reload`] first
    /// to discard local edits, or use [`ConfigStore::update_synonym`], which
    /// merges against the fresh file.
    pub fn persist(&self) -> Result<()> {
        let _writer = self.lock_writers();
        let _lock = StoreLock::acquire(&self.path, self.options.lock)?;
        let on_disk = fingerprint_file(&self.path)?;
        if on_disk.is_some() && on_disk != self.known_fingerprint() {
            return Err(ConfigError::WriteConflict {
                path: self.path.clone(),
                attempts: 1,
            });
        }
        let bytes = render_document(&self.snapshot())?;
        write_atomic(&self.path, &bytes)?;
        self.set_fingerprint(Some(fingerprint_bytes(&bytes)));
        self.dirty.store(false, Ordering::Release);
        info!(path = %self.path.display(), "persisted knowledge base");
        Ok(())
    }

    /// Re-read the backing file, discarding unpersisted edits.
    pub fn reload(&self) -> Result<()> {
        let _writer = self.lock_writers();
        self.reload_locked()
    }

    /// Reload only if the file changed since it was last read or written.
    ///
    /// Returns whether a reload happened.
    pub fn reload_if_changed(&self) -> Result<bool> {
        let _writer = self.lock_writers();
        let on_disk = fingerprint_file(&self.path)?;
        if on_disk.is_none() || on_disk == self.known_fingerprint() {
            return Ok(false);
        }
        self.reload_locked()?;
        Ok(true)
    }

    /// Atomic read-modify-write of one synonym, persisted before returning.
    ///
    /// `update` receives the entry currently stored under `field` for
    /// (`erp`, `raw_text`) in the freshest available state and returns the
    /// replacement, or `None` to leave everything unchanged. The whole cycle
    /// runs under the store lock; if the file is changed by a writer that
    /// ignores the lock, the cycle is retried against the new content.
    pub fn update_synonym<F>(
        &self,
        field: FieldId,
        erp: &str,
        raw_text: &str,
        mut update: F,
    ) -> Result<Option<UpsertOutcome>>
    where
        F: FnMut(Option<&SynonymEntry>) -> Option<SynonymEntry>,
    {
        let key = header_key(raw_text);
        let _writer = self.lock_writers();

        for attempt in 1..=self.options.max_write_attempts {
            let _lock = StoreLock::acquire(&self.path, self.options.lock)?;
            let on_disk = fingerprint_file(&self.path)?;
            if on_disk.is_some() && on_disk != self.known_fingerprint() {
                warn!(
                    path = %self.path.display(),
                    attempt,
                    "knowledge base changed on disk, refreshing before write"
                );
                self.reload_locked()?;
            }

            let mut next = (*self.snapshot()).clone();
            let current = next
                .definition(field)
                .and_then(|def| def.synonyms.iter().find(|s| s.matches(erp, &key)));
            let Some(entry) = update(current) else {
                return Ok(None);
            };
            let outcome = next.upsert_synonym(field, entry)?;
            let bytes = render_document(&next)?;

            if fingerprint_file(&self.path)? != on_disk {
                warn!(
                    path = %self.path.display(),
                    attempt,
                    "knowledge base changed during update, retrying"
                );
                continue;
            }
            write_atomic(&self.path, &bytes)?;
            self.set_fingerprint(Some(fingerprint_bytes(&bytes)));
            self.swap(next);
            self.dirty.store(false, Ordering::Release);
            return Ok(Some(outcome));
        }

        Err(ConfigError::WriteConflict {
            path: self.path.clone(),
            attempts: self.options.max_write_attempts,
        })
    }

    fn reload_locked(&self) -> Result<()> {
        let (bytes, kb, _conflicts) = read_document(&self.path)?;
        if self.dirty.swap(false, Ordering::AcqRel) {
            warn!(path = %self.path.display(), "discarding unpersisted knowledge base edits");
        }
        self.set_fingerprint(Some(fingerprint_bytes(&bytes)));
        self.swap(kb);
        info!(path = %self.path.display(), "reloaded knowledge base");
        Ok(())
    }

    fn swap(&self, next: KnowledgeBase) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
    }

    fn lock_writers(&self) -> MutexGuard<'_, ()> {
        self.write_guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn known_fingerprint(&self) -> Option<String> {
        self.fingerprint
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_fingerprint(&self, value: Option<String>) {
        *self
            .fingerprint
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = value;
    }
}

//! Persistent storage for the header-mapping knowledge base.
//!
//! The knowledge base is a YAML document with a `system` section of
//! thresholds and a `field_definitions` section holding the canonical
//! catalog and per-ERP synonym lists. Unknown keys anywhere in the document
//! are carried through a load/persist round trip.
//!
//! # Features
//!
//! - **Atomic writes** via temp file, fsync and rename
//! - **Snapshot reads**: matching works on an `Arc` that later writes never touch
//! - **Multi-process safety**: a `.lock` file guards read-modify-write cycles and
//!   SHA-256 fingerprints detect writers that bypass it
//!
//! # Example
//!
//! ```ignore
//! use ledger_config::ConfigStore;
//! use ledger_model::{FieldId, SynonymEntry};
//!
//! let store = ConfigStore::load("config/dynamic_fields_config.yaml")?;
//! store.update_synonym(FieldId::Amount, "SAP", "WRBTR", |current| {
//!     Some(current.cloned().unwrap_or_else(|| SynonymEntry::new("SAP", "WRBTR", 0.5)))
//! })?;
//! ```

mod document;
mod error;
mod io;
mod store;

pub use document::{ConfigDocument, FieldSection, SynonymRecord, SystemSection};
pub use error::{ConfigError, Result};
pub use io::{LockOptions, StoreLock, fingerprint_file, render_document};
pub use store::{ConfigStore, StoreOptions};

/// Default location of the knowledge base, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/dynamic_fields_config.yaml";

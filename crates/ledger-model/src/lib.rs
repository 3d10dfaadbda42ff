//! Data model for accounting header mapping.
//!
//! This crate holds the plain types shared by the rest of the workspace:
//!
//! - [`FieldId`] and [`FieldDefinition`]: the closed catalog of seventeen
//!   canonical accounting fields
//! - [`SynonymEntry`]: a learned, ERP-scoped alternate header for a field
//! - [`KnowledgeBase`]: catalog, synonyms and system thresholds, with the
//!   uniqueness rule for (ERP, header) pairs
//! - [`MatchCandidate`] and [`DetectionSummary`]: ephemeral match output
//!
//! No I/O happens here; persistence lives in `ledger-config`.

mod candidate;
mod catalog;
mod error;
mod field;
mod knowledge;
pub mod normalize;
mod summary;
mod synonym;

pub use candidate::{ConfidenceLevel, MatchCandidate, MatchKind};
pub use error::{ModelError, Result};
pub use field::{DataType, FieldDefinition, FieldId};
pub use knowledge::{
    Extensions, GENERIC_ERP, KnowledgeBase, SynonymConflict, SystemSettings, UpsertOutcome,
    is_generic_erp,
};
pub use normalize::{header_key, normalize_header};
pub use summary::DetectionSummary;
pub use synonym::SynonymEntry;

//! Header scoring and ERP detection.
//!
//! [`FieldMatcher`] turns one raw header into ranked [`MatchCandidate`]s
//! against a [`KnowledgeBase`] snapshot; [`ErpDetector`] aggregates matcher
//! results over a header row to infer the source ERP. Both are pure
//! functions of the snapshot they borrow.
//!
//! [`MatchCandidate`]: ledger_model::MatchCandidate
//! [`KnowledgeBase`]: ledger_model::KnowledgeBase

mod detector;
mod matcher;
pub mod score;

pub use detector::{ErpDetection, ErpDetector, ErpScore};
pub use matcher::{AmbiguousMatch, ColumnAssignment, FieldMatcher, HeaderMapping, ambiguity};

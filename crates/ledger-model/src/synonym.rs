//! Learned header synonyms.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::knowledge::Extensions;
use crate::normalize::header_key;

/// A known alternate header for a canonical field, scoped to one ERP.
///
/// The entry belongs to exactly one [`crate::FieldDefinition`]; the owning
/// field is the definition whose `synonyms` list contains it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynonymEntry {
    /// Source ERP, e.g. `SAP`, `ContaPlus` or `generic`.
    pub erp_name: String,
    /// Header text as first seen.
    pub raw_text: String,
    /// Confidence added on top of the base match score, within [0, 1].
    pub confidence_boost: f64,
    /// Number of confirmations recorded for this entry.
    pub usage_count: u32,
    pub last_confirmed: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub extensions: Extensions,
}

impl SynonymEntry {
    pub fn new(erp_name: impl Into<String>, raw_text: impl Into<String>, boost: f64) -> Self {
        Self {
            erp_name: erp_name.into(),
            raw_text: raw_text.into(),
            confidence_boost: boost,
            usage_count: 0,
            last_confirmed: None,
            extensions: Extensions::new(),
        }
    }

    /// Separator-free comparison key of the raw header text.
    pub fn key(&self) -> String {
        header_key(&self.raw_text)
    }

    /// True when this entry is for `erp` and its text normalizes to `key`.
    pub fn matches(&self, erp: &str, key: &str) -> bool {
        self.erp_name.eq_ignore_ascii_case(erp) && self.key() == key
    }
}

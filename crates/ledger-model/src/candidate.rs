//! Match candidates produced per header query.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::field::FieldId;

/// How a candidate was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Header equals a canonical name or a synonym in scope for the ERP hint.
    Exact,
    /// Header equals a synonym registered under a different ERP.
    Synonym,
    /// Header is similar to, but not equal to, a known name.
    Partial,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Synonym => "synonym",
            Self::Partial => "partial",
        }
    }

    /// Exact and synonym matches count as ERP evidence.
    pub fn is_equality(&self) -> bool {
        matches!(self, Self::Exact | Self::Synonym)
    }
}

/// A scored mapping of one header onto one canonical field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub header_text: String,
    pub field_id: FieldId,
    /// Confidence in [0, 1].
    pub confidence: f64,
    pub match_kind: MatchKind,
    /// Boost of the synonym that produced the candidate (0 for canonical names).
    pub confidence_boost: f64,
    /// The canonical name or synonym text the header was compared with.
    pub matched_text: String,
    /// ERP of the synonym that produced the candidate, `None` for canonical names.
    pub source_erp: Option<String>,
}

impl MatchCandidate {
    /// Ranking order: confidence descending, then exact before synonym before
    /// partial, then higher boost, then field id lexically.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .confidence
            .total_cmp(&self.confidence)
            .then_with(|| self.match_kind.cmp(&other.match_kind))
            .then_with(|| other.confidence_boost.total_cmp(&self.confidence_boost))
            .then_with(|| self.field_id.as_str().cmp(other.field_id.as_str()))
    }
}

/// Confidence level categories for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    /// High at or above 0.95, medium at or above 0.80, low otherwise.
    pub fn categorize(confidence: f64) -> Self {
        if confidence >= 0.95 {
            Self::High
        } else if confidence >= 0.80 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::High => "high confidence - likely correct",
            Self::Medium => "medium confidence - should review",
            Self::Low => "low confidence - needs verification",
        }
    }
}

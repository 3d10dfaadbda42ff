//! Per-header decision log of one training session.

use chrono::{DateTime, Utc};
use ledger_map::ErpDetection;
use ledger_model::{DetectionSummary, FieldId, MatchCandidate};
use ledger_validate::BalanceReport;
use serde::Serialize;

use crate::policy::TrainerMode;

/// Where a header stands in the learning state machine.
///
/// ```text
/// Unmapped -> Suggested -> Confirmed -> Learned
///                       -> Rejected  -> Discarded
///                       -> Skipped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderState {
    Unmapped,
    Suggested,
    Confirmed,
    Rejected,
    Skipped,
    Learned,
    Discarded,
}

impl HeaderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unmapped => "unmapped",
            Self::Suggested => "suggested",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
            Self::Skipped => "skipped",
            Self::Learned => "learned",
            Self::Discarded => "discarded",
        }
    }

    pub fn can_become(&self, next: HeaderState) -> bool {
        use HeaderState as S;
        matches!(
            (self, next),
            (S::Unmapped, S::Suggested)
                | (S::Suggested, S::Confirmed | S::Rejected | S::Skipped)
                | (S::Confirmed, S::Learned)
                | (S::Rejected, S::Discarded)
        )
    }
}

/// Synonym write made on behalf of a header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearnedSynonym {
    pub field_id: FieldId,
    pub erp_name: String,
    pub raw_text: String,
    /// Boost before the update; `None` when the entry was created.
    pub previous_boost: Option<f64>,
    pub confidence_boost: f64,
    pub usage_count: u32,
}

impl LearnedSynonym {
    pub fn created(&self) -> bool {
        self.previous_boost.is_none()
    }
}

/// Everything that happened to one header.
#[derive(Debug, Clone, Serialize)]
pub struct HeaderDecision {
    /// Column position in the input.
    pub index: usize,
    pub header: String,
    /// Ranked candidates from the session snapshot.
    pub candidates: Vec<MatchCandidate>,
    /// Visited states, oldest first; the last one is current.
    pub history: Vec<HeaderState>,
    /// Field this header maps to after the session, if any.
    pub field_id: Option<FieldId>,
    pub confidence: Option<f64>,
    /// Field chosen by the user in place of the suggestion.
    pub correction: Option<FieldId>,
    pub learned: Vec<LearnedSynonym>,
    /// Why the header ended where it did (skip reason, learning error).
    pub note: Option<String>,
}

impl HeaderDecision {
    pub(crate) fn new(index: usize, header: &str) -> Self {
        Self {
            index,
            header: header.to_string(),
            candidates: Vec::new(),
            history: vec![HeaderState::Unmapped],
            field_id: None,
            confidence: None,
            correction: None,
            learned: Vec::new(),
            note: None,
        }
    }

    pub fn state(&self) -> HeaderState {
        self.history
            .last()
            .copied()
            .unwrap_or(HeaderState::Unmapped)
    }

    pub fn top(&self) -> Option<&MatchCandidate> {
        self.candidates.first()
    }

    /// True when the header contributes a field to the file mapping.
    pub fn is_mapped(&self) -> bool {
        self.field_id.is_some()
    }

    pub(crate) fn advance(&mut self, next: HeaderState) {
        debug_assert!(
            self.state().can_become(next),
            "invalid transition {:?} -> {next:?}",
            self.state()
        );
        self.history.push(next);
    }

    pub(crate) fn note(&mut self, text: impl Into<String>) {
        self.note = Some(text.into());
    }
}

/// Result of [`crate::LearningEngine::run`].
#[derive(Debug, Clone, Serialize)]
pub struct TrainingSession {
    pub mode: TrainerMode,
    pub confidence_threshold: f64,
    pub batch: bool,
    /// ERP the session learned under.
    pub erp_name: String,
    /// Present when the ERP was inferred.
    pub erp_detection: Option<ErpDetection>,
    pub decisions: Vec<HeaderDecision>,
    pub summary: DetectionSummary,
    /// Complete mode only, and only when amounts could be mapped.
    pub balance: Option<BalanceReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl TrainingSession {
    pub fn count(&self, state: HeaderState) -> usize {
        self.decisions.iter().filter(|d| d.state() == state).count()
    }

    pub fn decision(&self, header: &str) -> Option<&HeaderDecision> {
        self.decisions.iter().find(|d| d.header == header)
    }

    /// Final (column, field) pairs in column order.
    pub fn mapping(&self) -> Vec<(usize, FieldId)> {
        self.decisions
            .iter()
            .filter_map(|d| d.field_id.map(|f| (d.index, f)))
            .collect()
    }

    /// Headers left for a later session.
    pub fn follow_up(&self) -> impl Iterator<Item = &HeaderDecision> {
        self.decisions.iter().filter(|d| {
            matches!(d.state(), HeaderState::Skipped | HeaderState::Confirmed)
        })
    }

    pub fn learned_count(&self) -> usize {
        self.decisions.iter().map(|d| d.learned.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_follow_the_state_machine() {
        use HeaderState as S;
        assert!(S::Unmapped.can_become(S::Suggested));
        assert!(S::Suggested.can_become(S::Skipped));
        assert!(S::Rejected.can_become(S::Discarded));
        assert!(!S::Unmapped.can_become(S::Confirmed));
        assert!(!S::Confirmed.can_become(S::Skipped));
        assert!(!S::Skipped.can_become(S::Learned));
        assert!(!S::Learned.can_become(S::Discarded));
    }

    #[test]
    fn decision_tracks_current_state() {
        let mut decision = HeaderDecision::new(0, "Fecha");
        assert_eq!(decision.state(), HeaderState::Unmapped);
        decision.advance(HeaderState::Suggested);
        decision.advance(HeaderState::Confirmed);
        assert_eq!(decision.state(), HeaderState::Confirmed);
        assert_eq!(decision.history.len(), 3);
    }
}

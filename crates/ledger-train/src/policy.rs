//! Trainer parameters supplied by the caller.

use std::fmt;
use std::str::FromStr;

use ledger_model::{FieldId, MatchCandidate};
use serde::Serialize;

use crate::error::TrainError;

/// Threshold used by automatic sessions when none is given.
pub const DEFAULT_AUTOMATIC_THRESHOLD: f64 = 0.75;

/// How a suggested header is turned into a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainerMode {
    /// Every suggestion needs an external confirmation.
    Manual,
    /// Suggestions at or above the threshold are accepted without asking.
    Automatic,
    /// Automatic, followed by a balance check of the mapped rows.
    Complete,
}

impl TrainerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Automatic => "automatic",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for TrainerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrainerMode {
    type Err = TrainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manual" => Ok(Self::Manual),
            "automatic" | "auto" => Ok(Self::Automatic),
            "complete" | "enhanced" => Ok(Self::Complete),
            other => Err(TrainError::UnknownMode(other.to_string())),
        }
    }
}

/// Mode plus the knobs that parameterize it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrainerPolicy {
    pub mode: TrainerMode,
    /// Auto-accept bound for automatic and complete modes (inclusive).
    pub confidence_threshold: f64,
    /// Never ask for confirmation; undecided headers become `Skipped`.
    pub batch: bool,
}

impl TrainerPolicy {
    pub fn manual() -> Self {
        Self {
            mode: TrainerMode::Manual,
            confidence_threshold: DEFAULT_AUTOMATIC_THRESHOLD,
            batch: false,
        }
    }

    pub fn automatic() -> Self {
        Self {
            mode: TrainerMode::Automatic,
            confidence_threshold: DEFAULT_AUTOMATIC_THRESHOLD,
            batch: false,
        }
    }

    pub fn complete(confidence_threshold: f64) -> Self {
        Self {
            mode: TrainerMode::Complete,
            confidence_threshold,
            batch: false,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_batch(mut self, batch: bool) -> Self {
        self.batch = batch;
        self
    }

    pub fn validate(&self) -> Result<(), TrainError> {
        if (0.0..=1.0).contains(&self.confidence_threshold) {
            Ok(())
        } else {
            Err(TrainError::InvalidThreshold(self.confidence_threshold))
        }
    }
}

/// Which ERP a session learns under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErpSelector {
    /// Infer from the headers.
    Auto,
    Named(String),
}

impl FromStr for ErpSelector {
    type Err = TrainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            Err(TrainError::EmptyErpName)
        } else if s.eq_ignore_ascii_case("auto") {
            Ok(Self::Auto)
        } else {
            Ok(Self::Named(s.to_string()))
        }
    }
}

/// Answer to a confirmation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Take the top candidate.
    Accept,
    /// Map the header onto this field instead.
    Choose(FieldId),
    /// The top candidate is wrong.
    Reject,
    /// No answer for now.
    Skip,
}

/// External confirmation step used by manual sessions.
///
/// Implementations may block (a terminal prompt) or answer from a script.
pub trait Confirmer {
    /// Decide on `header`, given its ranked candidates (never empty).
    fn confirm(&mut self, header: &str, candidates: &[MatchCandidate]) -> Decision;
}

impl<F> Confirmer for F
where
    F: FnMut(&str, &[MatchCandidate]) -> Decision,
{
    fn confirm(&mut self, header: &str, candidates: &[MatchCandidate]) -> Decision {
        self(header, candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mode_and_erp() {
        assert_eq!("Enhanced".parse::<TrainerMode>().unwrap(), TrainerMode::Complete);
        assert!("guided".parse::<TrainerMode>().is_err());
        assert_eq!("AUTO".parse::<ErpSelector>().unwrap(), ErpSelector::Auto);
        assert_eq!(
            " SAP ".parse::<ErpSelector>().unwrap(),
            ErpSelector::Named("SAP".into())
        );
        assert!("".parse::<ErpSelector>().is_err());
    }

    #[test]
    fn threshold_must_be_a_probability() {
        assert!(TrainerPolicy::complete(0.9).validate().is_ok());
        assert!(TrainerPolicy::automatic().with_threshold(1.2).validate().is_err());
    }
}

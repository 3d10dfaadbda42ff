//! Training sessions that turn confirmed header mappings into synonyms.
//!
//! A session walks each header of one file through
//! `Unmapped -> Suggested -> {Confirmed, Rejected, Skipped} -> {Learned, Discarded}`.
//! The three trainer modes only differ in how a suggestion is decided:
//!
//! - **manual**: every suggestion goes to a [`Confirmer`]
//! - **automatic**: suggestions at or above the threshold are accepted
//! - **complete**: automatic, plus a balance check of the mapped rows
//!
//! Learning writes are shared by all modes and go through
//! [`ledger_config::ConfigStore::update_synonym`], with boost changes
//! governed by [`BoostPolicy`].

mod boost;
mod engine;
mod error;
mod policy;
mod session;

pub use boost::BoostPolicy;
pub use engine::LearningEngine;
pub use error::{Result, TrainError};
pub use policy::{
    Confirmer, DEFAULT_AUTOMATIC_THRESHOLD, Decision, ErpSelector, TrainerMode, TrainerPolicy,
};
pub use session::{HeaderDecision, HeaderState, LearnedSynonym, TrainingSession};

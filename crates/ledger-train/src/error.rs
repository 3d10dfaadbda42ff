use ledger_config::ConfigError;
use thiserror::Error;

/// Errors that stop a training session before any header is decided.
///
/// Failures while learning a single header are recorded on that header's
/// decision instead.
#[derive(Debug, Error)]
pub enum TrainError {
    #[error("unknown trainer mode '{0}' (expected manual, automatic or complete)")]
    UnknownMode(String),

    #[error("confidence threshold {0} is outside [0, 1]")]
    InvalidThreshold(f64),

    #[error("ERP name must not be empty")]
    EmptyErpName,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, TrainError>;

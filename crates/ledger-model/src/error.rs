use thiserror::Error;

use crate::field::FieldId;

/// Errors raised when building or editing a knowledge base.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("unknown canonical field: {0}")]
    UnknownField(String),
    #[error("unknown data type: {0}")]
    UnknownDataType(String),
    #[error("field {0} is not defined in this knowledge base")]
    UndefinedField(FieldId),
    #[error("synonym text '{0}' is empty after normalization")]
    EmptySynonym(String),
    #[error("ERP name must not be empty (synonym '{0}')")]
    EmptyErpName(String),
    #[error("confidence boost {boost} for synonym '{raw_text}' is outside [0, 1]")]
    InvalidBoost { raw_text: String, boost: f64 },
    #[error("threshold {name} = {value} is outside [0, 1]")]
    InvalidThreshold { name: &'static str, value: f64 },
}

pub type Result<T> = std::result::Result<T, ModelError>;

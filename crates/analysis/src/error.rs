use thiserror::Error;
use tradeflow_core::{DomainError, Field, ParseError};

/// Errors from the analysis stages.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Input extract or reference table could not be read.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A log transform saw a non-positive value.
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("field '{0}' is not available on this table")]
    UnknownField(Field),

    #[error("metric '{0}' is not available on this table")]
    UnknownMetric(String),

    /// The reference side of a many-to-one join repeats a key.
    #[error("reference table '{table}' has duplicate key {key}")]
    DuplicateReferenceKey { table: String, key: String },

    #[error("{model}: {observations} observations cannot identify {parameters} parameters")]
    InsufficientObservations {
        model: String,
        observations: usize,
        parameters: usize,
    },

    #[error("{model}: cross-product matrix is singular")]
    Singular { model: String },

    #[error("panel is empty after loading")]
    EmptyPanel,
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

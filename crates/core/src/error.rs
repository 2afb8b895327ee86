//! Error taxonomy for the pipeline.
//!
//! Whole-table failures (`ParseError`, `ConfigError`) abort the run.
//! Row-level problems are not errors: they are recorded as
//! [`crate::diagnostics::DataQualityWarning`]s or join statistics.

use std::path::PathBuf;
use thiserror::Error;

/// Malformed input: schema mismatch, unparseable value, unreadable file.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("{}: line {line}: expected {expected} columns, found {found}", .path.display())]
    Schema {
        path: PathBuf,
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("{}: line {line}: column '{column}' is not numeric: '{value}'", .path.display())]
    InvalidNumber {
        path: PathBuf,
        line: u64,
        column: String,
        value: String,
    },

    #[error("{}: line {line}: unknown trade flow '{value}'", .path.display())]
    InvalidFlow {
        path: PathBuf,
        line: u64,
        value: String,
    },

    #[error("{}: line {line}: missing required value in column '{column}'", .path.display())]
    MissingValue {
        path: PathBuf,
        line: u64,
        column: String,
    },

    #[error("{}: line {line}: column '{column}' is not valid UTF-8", .path.display())]
    InvalidEncoding {
        path: PathBuf,
        line: u64,
        column: String,
    },

    #[error("{}: CSV error: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}: IO error: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A non-positive value reached a log transform.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("cannot take log of non-positive value {value} in column '{column}'")]
pub struct DomainError {
    pub column: String,
    pub value: f64,
}

/// Takes the natural log of a strictly positive value.
///
/// # Errors
///
/// Returns `DomainError` for zero, negative or NaN input.
pub fn checked_ln(column: &str, value: f64) -> Result<f64, DomainError> {
    if value > 0.0 && value.is_finite() {
        Ok(value.ln())
    } else {
        Err(DomainError {
            column: column.to_string(),
            value,
        })
    }
}

/// Configuration could not be loaded or is inconsistent.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Extract(#[from] Box<figment::Error>),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Extract(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_ln_accepts_positive() {
        let v = checked_ln("trade_value", std::f64::consts::E).unwrap();
        assert!((v - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_checked_ln_rejects_zero_and_negative() {
        assert_eq!(
            checked_ln("gdp", 0.0),
            Err(DomainError {
                column: "gdp".to_string(),
                value: 0.0
            })
        );
        assert!(checked_ln("gdp", -3.5).is_err());
        assert!(checked_ln("gdp", f64::NAN).is_err());
    }

    #[test]
    fn test_schema_error_message_names_location() {
        let err = ParseError::Schema {
            path: PathBuf::from("ROM_2011.csv"),
            line: 4,
            expected: 9,
            found: 7,
        };
        assert_eq!(
            err.to_string(),
            "ROM_2011.csv: line 4: expected 9 columns, found 7"
        );
    }
}

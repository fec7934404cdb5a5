//! Error types for krigeo

use std::fmt::Display;

use thiserror::Error;

/// Main error type for krigeo operations.
///
/// Only configuration-level problems are errors. Conditions local to a
/// single target (too few neighbors, singular systems, numerical anomalies)
/// are reported through the per-target estimation status instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid variogram model: {0}")]
    InvalidModel(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Size mismatch: expected {expected} values, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for [`Error::InvalidParameter`].
    pub fn invalid_parameter(
        name: &'static str,
        value: impl Display,
        reason: impl Into<String>,
    ) -> Self {
        Error::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for krigeo operations
pub type Result<T> = std::result::Result<T, Error>;

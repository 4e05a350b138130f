//! Engine error types
//!
//! `InvalidInput` is the only failure the scoring engine itself produces.
//! Everything it rejects is detectable by the caller before invocation.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SoilError {
    /// Out-of-domain or non-finite measurement. Never clamped.
    #[error("invalid {field} ({value}): {reason}")]
    InvalidInput {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("invalid scoring configuration: {0}")]
    Config(String),
}

impl SoilError {
    pub fn invalid(field: &'static str, value: f64, reason: &'static str) -> Self {
        SoilError::InvalidInput { field, value, reason }
    }
}

pub type SoilResult<T> = std::result::Result<T, SoilError>;

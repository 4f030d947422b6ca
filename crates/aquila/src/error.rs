//! Error types for reward payload handling
//!
//! Everything in this crate is pure, so the only errors are about data that
//! came back from a reward provider and templates that cannot be rendered.

use thiserror::Error;

/// Errors raised while validating or preparing a reward payload
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RewardError {
    #[error("Reward payload is not valid JSON: {reason}")]
    InvalidJson { reason: String },

    #[error("Reward payload must be a JSON object")]
    NotAnObject,

    #[error("Reward payload is missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("Reward field '{field}' must be a scalar value")]
    NonScalarField { field: String },

    #[error("Reward field '{field}' must be a string")]
    NotAString { field: &'static str },

    #[error("Invalid expiry date '{value}': {reason}")]
    InvalidExpiryDate { value: String, reason: String },

    #[error("Failed to render template: {reason}")]
    Render { reason: String },
}

/// Result type for reward payload operations
pub type Result<T> = std::result::Result<T, RewardError>;

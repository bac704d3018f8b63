//! Error types for the motivation coach

use std::time::Duration;
use thiserror::Error;

/// Result type alias for coach operations
pub type Result<T> = std::result::Result<T, CoachError>;

#[derive(Error, Debug)]
pub enum CoachError {

    // =============================
    // Recoverable Turn Errors
    // =============================

    /// Any failure of the text-completion service (network, HTTP status, empty answer).
    #[error("Completion service error: {0}")]
    ExternalService(String),

    #[error("Completion call timed out after {0:?}")]
    Timeout(Duration),

    /// The completion answered, but not with the JSON shape we asked for.
    #[error("Malformed extraction: {0}")]
    MalformedExtraction(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    // =============================
    // Harness Errors
    // =============================

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CoachError {
    /// True for failures that a deterministic fallback is expected to absorb.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CoachError::ExternalService(_)
                | CoachError::Timeout(_)
                | CoachError::MalformedExtraction(_)
                | CoachError::SerializationError(_)
                | CoachError::HttpError(_)
        )
    }
}

//! Error types for the generation boundary.

use std::time::Duration;
use thiserror::Error;

/// Result type alias using the generation error type.
pub type Result<T> = std::result::Result<T, GenerationError>;

/// Error type for generation operations.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Network-level failure talking to the backend.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend returned an error status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The call exceeded its bounded timeout.
    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),

    /// The backend returned something that is not the expected shape.
    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),

    /// A structured payload failed to parse. Fatal for the turn.
    #[error("Structured output parse failed: {0}")]
    StructuredParse(String),

    /// Backend misconfiguration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl GenerationError {
    /// Create a malformed-response error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Create a structured-parse error.
    pub fn structured(msg: impl Into<String>) -> Self {
        Self::StructuredParse(msg.into())
    }
}

//! Error types for turn processing.

use quill_llm::GenerationError;
use quill_session::SessionError;

/// Generic fallback shown to the user when a turn fails for any reason
/// other than a policy refusal or a session failure. Internal detail is
/// logged server-side and never reaches the client.
pub const FALLBACK_MESSAGE: &str =
    "Sorry, something went wrong while processing your message. Please try again.";

/// Error type for turn processing.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// Session validation failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The request is missing required input.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The message failed the safety filter. Carries the localized
    /// refusal text; the only category whose specific message is shown
    /// to the user.
    #[error("Message rejected by content filter")]
    ContentPolicy {
        /// Localized refusal naming the violated policy.
        refusal: String,
    },

    /// A generation call failed, timed out, or returned an unusable
    /// structured payload.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Unexpected failure inside the pipeline.
    #[error("Turn processing failed: {0}")]
    Processing(String),

    /// Benign race between token issuance completing and first use.
    /// The handler retries the turn exactly once on this variant.
    #[error("Transient session race: {0}")]
    SessionRace(String),
}

impl FlowError {
    /// Short machine-readable category for response bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            FlowError::Session(_) => "session",
            FlowError::Validation(_) => "validation",
            FlowError::ContentPolicy { .. } => "content_policy",
            FlowError::Generation(_) => "generation",
            FlowError::Processing(_) => "processing",
            FlowError::SessionRace(_) => "session_race",
        }
    }
}

/// Result type for turn processing.
pub type Result<T> = std::result::Result<T, FlowError>;

//! Error types for session operations.

/// The uniform message shown to end users for every session failure.
///
/// The individual variants exist for server-side logs only; exposing
/// which check failed would hand an attacker a probe.
pub const USER_FACING_SESSION_MESSAGE: &str = "Invalid or expired session";

/// Error type for session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Token is malformed or its signature does not verify.
    #[error("Invalid session token: {0}")]
    Invalid(String),

    /// Token is past its expiry window.
    #[error("Session token expired")]
    Expired,

    /// No live registry entry for this token (evicted, or replayed
    /// after a restart — the registry is not persisted).
    #[error("Unknown session token")]
    Unknown,

    /// The request's IP hash differs from the bound one.
    #[error("Session IP mismatch")]
    IpMismatch,

    /// The recomputed device fingerprint differs from the bound one.
    #[error("Session device mismatch")]
    DeviceMismatch,
}

impl SessionError {
    /// The collapsed, user-safe message for any session failure.
    pub fn user_message(&self) -> &'static str {
        USER_FACING_SESSION_MESSAGE
    }
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_variants_collapse_to_one_user_message() {
        let errors = [
            SessionError::Invalid("bad".to_string()),
            SessionError::Expired,
            SessionError::Unknown,
            SessionError::IpMismatch,
            SessionError::DeviceMismatch,
        ];
        for err in errors {
            assert_eq!(err.user_message(), USER_FACING_SESSION_MESSAGE);
        }
    }

    #[test]
    fn test_internal_messages_stay_distinct() {
        assert_ne!(
            SessionError::IpMismatch.to_string(),
            SessionError::DeviceMismatch.to_string()
        );
    }
}

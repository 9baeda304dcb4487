//! Configuration for the session layer.

use std::time::Duration;

use rand::RngCore;

/// Default lifetime of an issued token (1 hour).
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);

/// Default minimum interval between opportunistic registry sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Configuration for token issuance and the session registry.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// HMAC signing secret for session tokens.
    pub secret: Vec<u8>,

    /// How long an issued token stays valid.
    pub token_ttl: Duration,

    /// Minimum interval between opportunistic registry sweeps.
    pub sweep_interval: Duration,
}

impl SessionConfig {
    /// Create a config with the given signing secret and default windows.
    pub fn new(secret: Vec<u8>) -> Self {
        Self {
            secret,
            token_ttl: DEFAULT_TOKEN_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    /// Generate a fresh random 32-byte signing secret.
    ///
    /// Sessions are disposable, so a per-process secret is acceptable:
    /// a restart invalidates outstanding tokens anyway because the
    /// registry is not persisted.
    pub fn generate_secret() -> Vec<u8> {
        let mut secret = vec![0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        secret
    }

    /// Set the token lifetime.
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Set the minimum interval between opportunistic sweeps.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

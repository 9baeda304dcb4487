//! Signed, fingerprint-bound session tokens.
//!
//! A token is `base64url(payload_json).hex(hmac_sha256(payload_b64))`.
//! The payload embeds the device fingerprint and IP hash computed at
//! issuance; validation recomputes both from the live request and
//! rejects any drift. Neither hash is a secret — they exist for
//! anomaly detection, not authentication, and the plaintext IP is
//! never stored.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::registry::{SessionBinding, SessionRegistry};

type HmacSha256 = Hmac<Sha256>;

/// The `kind` claim embedded in every session token.
pub const TOKEN_KIND: &str = "agent-session";

/// Ambient client identity extracted from a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Client IP as presented to the server.
    pub ip: String,
    /// Client user-agent string.
    pub user_agent: String,
}

impl RequestContext {
    /// Build a request context.
    pub fn new(ip: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            user_agent: user_agent.into(),
        }
    }
}

/// Derive the stable device fingerprint for a client.
///
/// One-way hash over user-agent and IP; deterministic so the same
/// client always produces the same value.
pub fn derive_fingerprint(user_agent: &str, ip: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_agent.as_bytes());
    hasher.update(b"|");
    hasher.update(ip.as_bytes());
    hex::encode(hasher.finalize())
}

/// One-way hash of a raw IP so the plaintext address is never stored.
pub fn hash_ip(ip: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ip.as_bytes());
    hex::encode(hasher.finalize())
}

/// Claims embedded in a session token.
#[derive(Debug, Serialize, Deserialize)]
struct TokenPayload {
    kind: String,
    /// Milliseconds since the Unix epoch.
    issued_at: i64,
    fingerprint: String,
    ip_hash: String,
}

/// Issues and validates signed session tokens bound to client identity.
pub struct TokenService {
    config: SessionConfig,
    registry: Arc<SessionRegistry>,
}

impl TokenService {
    /// Create a token service with a fresh registry.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            registry: Arc::new(SessionRegistry::new()),
        }
    }

    /// Create a token service sharing an existing registry.
    pub fn with_registry(config: SessionConfig, registry: Arc<SessionRegistry>) -> Self {
        Self { config, registry }
    }

    /// The registry this service writes to.
    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.registry)
    }

    /// The session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Issue a new token for the requesting client.
    ///
    /// Computes the binding, signs the token, and registers the binding.
    /// A new token is a new identity — there is no refresh.
    pub async fn issue(&self, ctx: &RequestContext) -> String {
        let now = Utc::now();
        let fingerprint = derive_fingerprint(&ctx.user_agent, &ctx.ip);
        let ip_hash = hash_ip(&ctx.ip);

        let payload = TokenPayload {
            kind: TOKEN_KIND.to_string(),
            issued_at: now.timestamp_millis(),
            fingerprint: fingerprint.clone(),
            ip_hash: ip_hash.clone(),
        };

        let token = self.sign(&payload);

        self.registry
            .insert(
                &token,
                SessionBinding {
                    fingerprint,
                    ip_hash,
                    created_at: now,
                },
            )
            .await;

        debug!(
            token_prefix = %token_prefix(&token),
            "Session token issued"
        );
        token
    }

    /// Validate a token against its signature and the live binding.
    ///
    /// Opportunistically sweeps the registry first. The distinct error
    /// variants are for logs; callers must collapse them into one
    /// uniform user-facing message.
    pub async fn validate(&self, token: &str, ctx: &RequestContext) -> Result<SessionBinding> {
        self.registry
            .maybe_sweep(self.config.token_ttl, self.config.sweep_interval)
            .await;

        let payload = self.verify(token)?;

        if payload.kind != TOKEN_KIND {
            return Err(SessionError::Invalid(format!(
                "unexpected token kind '{}'",
                payload.kind
            )));
        }

        // Inclusive bound at millisecond precision: a token is already
        // invalid at exactly issued_at + ttl.
        let age_ms = Utc::now().timestamp_millis() - payload.issued_at;
        if age_ms < 0 || age_ms as u128 >= self.config.token_ttl.as_millis() {
            warn!(token_prefix = %token_prefix(token), age_ms, "Expired session token");
            return Err(SessionError::Expired);
        }

        let binding = self
            .registry
            .get(token)
            .await
            .ok_or(SessionError::Unknown)?;

        if hash_ip(&ctx.ip) != binding.ip_hash {
            warn!(token_prefix = %token_prefix(token), "Session IP hash mismatch");
            return Err(SessionError::IpMismatch);
        }

        if derive_fingerprint(&ctx.user_agent, &ctx.ip) != binding.fingerprint {
            warn!(token_prefix = %token_prefix(token), "Session fingerprint mismatch");
            return Err(SessionError::DeviceMismatch);
        }

        Ok(binding)
    }

    /// Sweep the registry now, returning the number of entries evicted.
    pub async fn cleanup(&self) -> usize {
        self.registry.sweep(self.config.token_ttl).await
    }

    fn sign(&self, payload: &TokenPayload) -> String {
        // Serialization of a plain struct with string/int fields cannot fail.
        let json = serde_json::to_string(payload).unwrap_or_default();
        let encoded = URL_SAFE_NO_PAD.encode(json.as_bytes());

        let mut mac = HmacSha256::new_from_slice(&self.config.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(encoded.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        format!("{encoded}.{signature}")
    }

    fn verify(&self, token: &str) -> Result<TokenPayload> {
        let (encoded, signature_hex) = token
            .split_once('.')
            .ok_or_else(|| SessionError::Invalid("missing signature separator".to_string()))?;

        let signature = hex::decode(signature_hex)
            .map_err(|_| SessionError::Invalid("signature is not hex".to_string()))?;

        let mut mac = HmacSha256::new_from_slice(&self.config.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(encoded.as_bytes());
        // verify_slice is constant-time.
        mac.verify_slice(&signature)
            .map_err(|_| SessionError::Invalid("signature mismatch".to_string()))?;

        let json = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| SessionError::Invalid("payload is not base64url".to_string()))?;

        serde_json::from_slice(&json)
            .map_err(|e| SessionError::Invalid(format!("payload parse failed: {e}")))
    }
}

/// First few characters of a token, safe to log.
fn token_prefix(token: &str) -> &str {
    &token[..token.len().min(12)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn service() -> TokenService {
        TokenService::new(SessionConfig::new(b"test-secret".to_vec()))
    }

    fn ctx() -> RequestContext {
        RequestContext::new("203.0.113.7", "Mozilla/5.0 (X11; Linux x86_64)")
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = derive_fingerprint("agent", "1.2.3.4");
        let b = derive_fingerprint("agent", "1.2.3.4");
        assert_eq!(a, b);
        assert_ne!(a, derive_fingerprint("agent", "1.2.3.5"));
        assert_ne!(a, derive_fingerprint("other-agent", "1.2.3.4"));
    }

    #[test]
    fn test_ip_hash_hides_plaintext() {
        let hash = hash_ip("203.0.113.7");
        assert!(!hash.contains("203"));
        assert_eq!(hash.len(), 64);
    }

    #[tokio::test]
    async fn test_issue_then_validate() {
        let service = service();
        let ctx = ctx();

        let token = service.issue(&ctx).await;
        let binding = service.validate(&token, &ctx).await.unwrap();
        assert_eq!(binding.ip_hash, hash_ip(&ctx.ip));
        assert_eq!(binding.fingerprint, derive_fingerprint(&ctx.user_agent, &ctx.ip));
    }

    #[tokio::test]
    async fn test_issue_registers_binding() {
        let service = service();
        let token = service.issue(&ctx()).await;
        assert_eq!(service.registry().len().await, 1);
        assert!(service.registry().get(&token).await.is_some());
    }

    #[tokio::test]
    async fn test_validate_rejects_different_ip() {
        let service = service();
        let token = service.issue(&ctx()).await;

        let other = RequestContext::new("198.51.100.9", ctx().user_agent);
        let err = service.validate(&token, &other).await.unwrap_err();
        assert!(matches!(err, SessionError::IpMismatch));
    }

    #[tokio::test]
    async fn test_validate_rejects_different_user_agent() {
        let service = service();
        let token = service.issue(&ctx()).await;

        let other = RequestContext::new(ctx().ip, "curl/8.0");
        let err = service.validate(&token, &other).await.unwrap_err();
        assert!(matches!(err, SessionError::DeviceMismatch));
    }

    #[tokio::test]
    async fn test_validate_rejects_tampered_token() {
        let service = service();
        let token = service.issue(&ctx()).await;

        let mut tampered = token.clone();
        tampered.insert(0, 'x');
        let err = service.validate(&tampered, &ctx()).await.unwrap_err();
        assert!(matches!(err, SessionError::Invalid(_)));

        let err = service.validate("not-a-token", &ctx()).await.unwrap_err();
        assert!(matches!(err, SessionError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_validate_rejects_foreign_signature() {
        let issuing = service();
        let token = issuing.issue(&ctx()).await;

        let other = TokenService::new(SessionConfig::new(b"other-secret".to_vec()));
        let err = other.validate(&token, &ctx()).await.unwrap_err();
        assert!(matches!(err, SessionError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_expired_token_fails_even_with_correct_binding() {
        let config = SessionConfig::new(b"test-secret".to_vec())
            .with_token_ttl(Duration::from_millis(30))
            .with_sweep_interval(Duration::from_secs(3600));
        let service = TokenService::new(config);

        let token = service.issue(&ctx()).await;
        tokio::time::sleep(Duration::from_millis(60)).await;

        let err = service.validate(&token, &ctx()).await.unwrap_err();
        assert!(matches!(err, SessionError::Expired));
    }

    #[tokio::test]
    async fn test_expiry_bound_is_inclusive() {
        // With a zero window the token must be invalid immediately and
        // stay invalid; no grace from clock truncation.
        let config = SessionConfig::new(b"test-secret".to_vec())
            .with_token_ttl(Duration::ZERO)
            .with_sweep_interval(Duration::from_secs(3600));
        let service = TokenService::new(config);

        let token = service.issue(&ctx()).await;
        let err = service.validate(&token, &ctx()).await.unwrap_err();
        assert!(matches!(err, SessionError::Expired));

        tokio::time::sleep(Duration::from_millis(300)).await;
        let err = service.validate(&token, &ctx()).await.unwrap_err();
        assert!(matches!(err, SessionError::Expired));
    }

    #[tokio::test]
    async fn test_unknown_after_registry_eviction() {
        let service = service();
        let token = service.issue(&ctx()).await;

        // Simulate a restart: registry loses the entry, token itself is
        // still validly signed and unexpired.
        service.registry().remove(&token).await;

        let err = service.validate(&token, &ctx()).await.unwrap_err();
        assert!(matches!(err, SessionError::Unknown));
    }

    #[tokio::test]
    async fn test_cleanup_counts_evictions() {
        let config = SessionConfig::new(b"test-secret".to_vec()).with_token_ttl(Duration::ZERO);
        let service = TokenService::new(config);

        service.issue(&ctx()).await;
        service.issue(&RequestContext::new("198.51.100.9", "curl/8.0")).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(service.cleanup().await, 2);
        assert_eq!(service.cleanup().await, 0);
    }

    #[tokio::test]
    async fn test_tokens_are_unique_per_issue() {
        let service = service();
        let a = service.issue(&ctx()).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        let b = service.issue(&ctx()).await;
        // issued_at has millisecond resolution, so the tokens differ.
        assert_ne!(a, b);
    }
}

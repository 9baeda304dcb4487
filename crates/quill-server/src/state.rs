//! Application state shared across handlers.

use std::sync::Arc;

use axum::http::HeaderMap;
use quill_flow::TurnHandler;
use quill_session::RequestContext;

use crate::config::ServerConfig;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The turn handler composing session, store, and pipeline.
    pub handler: Arc<TurnHandler>,

    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(handler: TurnHandler, config: ServerConfig) -> Self {
        Self {
            handler: Arc::new(handler),
            config: Arc::new(config),
        }
    }
}

/// Extract the client identity from request headers.
///
/// Prefers `x-forwarded-for` (first hop) then `x-real-ip`, as the
/// server is expected to sit behind a reverse proxy. The values feed
/// the fingerprint hash only; absent headers degrade to placeholders
/// rather than rejecting the request.
pub fn client_context(headers: &HeaderMap) -> RequestContext {
    let ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .unwrap_or("unknown");

    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    RequestContext::new(ip, user_agent)
}

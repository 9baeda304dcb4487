//! HTTP transport for the Quill assistant session layer.
//!
//! Exposes the session and turn operations over a small REST surface:
//!
//! - `POST /api/v1/assistant/session` — issue a session token
//! - `GET  /api/v1/assistant/session` — read-only status / resume state
//! - `POST /api/v1/assistant/message` — process one turn
//! - `POST /api/v1/assistant/cleanup` — evict expired sessions
//! - `GET  /health`
//!
//! # Example
//!
//! ```ignore
//! use quill_server::{Server, ServerConfig};
//!
//! let handler = /* TurnHandler wired with generator + session config */;
//! let server = Server::new(handler, ServerConfig::new());
//! server.run().await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::{ErrorResponse, Result, ServerError};
pub use state::{AppState, client_context};

use axum::Router;
use axum::http::HeaderValue;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use quill_flow::TurnHandler;

/// The Quill HTTP server.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a new server over the given turn handler.
    pub fn new(handler: TurnHandler, config: ServerConfig) -> Self {
        Self {
            state: AppState::new(handler, config),
        }
    }

    /// Create a server from a pre-built application state.
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .merge(routes::health_routes())
            .nest("/api/v1/assistant", routes::assistant_routes());

        if self.state.config.request_logging {
            router = router.layer(axum::middleware::from_fn(
                middleware::request_logging_middleware,
            ));
        }
        if let Some(cors) = cors_layer(&self.state.config.cors_origins) {
            router = router.layer(cors);
        }

        router
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the server until shutdown.
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.bind_address;
        let router = self.router();

        info!("Starting server on {}", addr);

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind: {e}")))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {e}")))?;

        Ok(())
    }
}

/// Build the CORS layer when origins are configured.
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }
    let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    Some(
        CorsLayer::new()
            .allow_origin(parsed)
            .allow_methods(Any)
            .allow_headers(Any),
    )
}

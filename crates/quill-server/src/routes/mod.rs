//! Route handlers.

mod assistant;
mod health;

pub use assistant::{
    CleanupResponse, SessionStatusResponse, TokenResponse, assistant_routes, cleanup_handler,
    issue_session_handler, message_handler, session_status_handler,
};
pub use health::{HealthResponse, health, health_routes};

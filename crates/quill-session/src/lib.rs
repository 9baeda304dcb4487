//! Session layer for the Quill assistant.
//!
//! This crate binds a disposable conversation identity to a requesting
//! client without requiring an account:
//!
//! - [`TokenService`]: issues and validates signed, time-limited tokens
//!   bound to a device fingerprint and IP hash
//! - [`SessionRegistry`]: the process-local source of truth for which
//!   tokens are still alive, with sweep-based expiry
//! - [`ConversationStore`]: per-token append-only history with per-token
//!   turn serialization
//!
//! # Example
//!
//! ```rust,ignore
//! use quill_session::{SessionConfig, TokenService, RequestContext};
//!
//! let config = SessionConfig::new(SessionConfig::generate_secret());
//! let service = TokenService::new(config);
//!
//! let ctx = RequestContext::new("203.0.113.7", "Mozilla/5.0");
//! let token = service.issue(&ctx).await;
//! let binding = service.validate(&token, &ctx).await?;
//! ```

mod config;
mod error;
mod registry;
mod store;
mod token;

pub use config::SessionConfig;
pub use error::{Result, SessionError};
pub use registry::{SessionBinding, SessionRegistry};
pub use store::{ConversationStore, SessionResume, StoreConfig};
pub use token::{RequestContext, TOKEN_KIND, TokenService, derive_fingerprint, hash_ip};

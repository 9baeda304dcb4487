//! Shared types for the Quill assistant session layer.
//!
//! This crate holds the data model threaded through the session and
//! pipeline crates:
//!
//! - [`ConversationTurn`]: one message in a session's append-only history
//! - [`DraftDocument`]: the article draft built collaboratively across turns,
//!   with the deterministic merge rules for partial updates
//! - [`TaskOrder`]: the analysis flags that drive branch dispatch

pub mod draft;
pub mod message;
pub mod task;

pub use draft::{DraftDocument, DraftStatus, DraftUpdate, merge};
pub use message::{Attachment, ConversationTurn, Role};
pub use task::{DEFAULT_MAX_ITERATIONS, TaskOrder};

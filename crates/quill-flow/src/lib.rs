//! Turn processing for the Quill assistant.
//!
//! One turn flows through a fixed pipeline: content-safety filter,
//! combined task analysis, code-owned branch dispatch, draft merge,
//! localized response. The [`TurnHandler`] wraps the pipeline with the
//! session checks, per-token turn ordering, a single bounded retry, and
//! user-safe failure containment.
//!
//! - [`FlowOrchestrator`]: the pipeline state machine
//! - [`TurnHandler`]: the request-level entry point
//! - [`TurnRequest`] / [`TurnReply`]: the external turn contract

mod error;
mod filter;
mod handler;
mod language;
mod pipeline;
mod prompts;
mod types;

pub use error::{FALLBACK_MESSAGE, FlowError, Result};
pub use filter::SafetyVerdict;
pub use handler::{CleanupReport, DEFAULT_RETRY_DELAY, TurnHandler};
pub use language::LanguageProfile;
pub use pipeline::{DEFAULT_CALL_TIMEOUT, FlowOrchestrator};
pub use types::{BranchAction, TaskState, TurnError, TurnOutcome, TurnReply, TurnRequest};

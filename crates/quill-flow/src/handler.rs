//! Request-level composition: validate, serialize, run, contain.
//!
//! The handler is the only entry point that touches all the shared
//! state. It validates the token, takes the per-token turn lock around
//! load → pipeline → append, retries exactly once on the transient
//! session race, and converts every other failure into a user-safe
//! reply. Nothing below it leaks a raw error to the transport layer.

use std::time::Duration;

use quill_session::{ConversationStore, RequestContext, SessionError, SessionResume, TokenService};
use quill_types::ConversationTurn;
use tracing::{debug, error, info, warn};

use crate::error::{FALLBACK_MESSAGE, FlowError, Result};
use crate::pipeline::FlowOrchestrator;
use crate::types::{TaskState, TurnOutcome, TurnReply, TurnRequest};

/// Delay before the single automatic retry on a session race.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(150);

/// User-safe message for an empty turn submission.
const EMPTY_MESSAGE: &str = "Please enter a message.";

/// Counts from one cleanup pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    /// Registry entries evicted.
    pub sessions_removed: usize,
    /// Conversations dropped from the store.
    pub conversations_removed: usize,
}

/// Composes token service, conversation store, and pipeline per turn.
pub struct TurnHandler {
    tokens: TokenService,
    store: ConversationStore,
    orchestrator: FlowOrchestrator,
    retry_delay: Duration,
}

impl TurnHandler {
    /// Create a handler over the given components.
    pub fn new(
        tokens: TokenService,
        store: ConversationStore,
        orchestrator: FlowOrchestrator,
    ) -> Self {
        Self {
            tokens,
            store,
            orchestrator,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Set the delay before the single automatic retry.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Issue a fresh session token for the requesting client.
    pub async fn issue_session(&self, ctx: &RequestContext) -> String {
        self.tokens.issue(ctx).await
    }

    /// Read-only session check, returning the last stored draft and
    /// response for session resume.
    pub async fn session_status(
        &self,
        token: &str,
        ctx: &RequestContext,
    ) -> std::result::Result<SessionResume, SessionError> {
        self.tokens.validate(token, ctx).await?;
        Ok(self.store.resume(token).await.unwrap_or_default())
    }

    /// Number of sessions currently in the registry.
    pub async fn active_sessions(&self) -> usize {
        self.tokens.registry().len().await
    }

    /// Evict expired registry entries and conversations. Idempotent.
    pub async fn cleanup(&self) -> CleanupReport {
        let report = CleanupReport {
            sessions_removed: self.tokens.cleanup().await,
            conversations_removed: self.store.cleanup_expired().await,
        };
        info!(
            sessions = report.sessions_removed,
            conversations = report.conversations_removed,
            "Cleanup pass completed"
        );
        report
    }

    /// Process one turn. Always returns a well-formed reply.
    pub async fn handle(&self, ctx: &RequestContext, request: TurnRequest) -> TurnReply {
        if request.message.trim().is_empty() {
            return TurnReply::failure("validation", EMPTY_MESSAGE, false);
        }

        if let Err(err) = self.tokens.validate(&request.session_token, ctx).await {
            warn!(error = %err, "Turn rejected: session validation failed");
            return TurnReply::failure("session", err.user_message(), true);
        }

        // Explicit bounded retry: at most one extra attempt, only for
        // the transient session race.
        let mut retried = false;
        loop {
            match self.run_turn(&request).await {
                Ok(outcome) => {
                    return TurnReply::success(outcome.answer, outcome.draft);
                }
                Err(FlowError::SessionRace(reason)) if !retried => {
                    warn!(%reason, "Transient session race, retrying turn once");
                    retried = true;
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(err) => {
                    error!(error = %err, kind = err.kind(), "Turn failed");
                    return TurnReply::failure(err.kind(), FALLBACK_MESSAGE, false);
                }
            }
        }
    }

    /// One attempt at a turn, under the per-token lock.
    async fn run_turn(&self, request: &TurnRequest) -> Result<TurnOutcome> {
        let token = &request.session_token;

        let lock = self.store.turn_lock(token).await;
        let _guard = lock.lock().await;

        // The registry entry can vanish between validation and this
        // point (a sweep racing first use). Transient; the caller
        // retries once.
        if self.tokens.registry().get(token).await.is_none() {
            return Err(FlowError::SessionRace(
                "registry entry missing after validation".to_string(),
            ));
        }

        let mut history = self.store.get_or_create(token).await;
        if history.is_empty() && !request.message_history.is_empty() {
            // Resume: reseed the server copy from the client's history.
            debug!(
                turns = request.message_history.len(),
                "Seeding conversation from client-supplied history"
            );
            for turn in &request.message_history {
                self.store.append(token, turn.clone()).await;
            }
            history = request.message_history.clone();
        }

        let draft = match self.store.resume(token).await.and_then(|r| r.draft) {
            Some(stored) => Some(stored),
            None => request.article_draft.clone(),
        };

        let state = TaskState::new(request.message.as_str(), history, draft);
        let outcome = self.orchestrator.run(state).await?;

        let user_turn = if request.images.is_empty() {
            ConversationTurn::user(request.message.as_str())
        } else {
            ConversationTurn::user_with_attachments(
                request.message.as_str(),
                request.images.clone(),
            )
        };
        self.store.append(token, user_turn).await;
        self.store
            .append(token, ConversationTurn::assistant(outcome.answer.as_str()))
            .await;
        self.store
            .set_resume(token, outcome.draft.clone(), Some(outcome.answer.clone()))
            .await;

        Ok(outcome)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

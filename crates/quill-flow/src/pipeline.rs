//! The turn pipeline.
//!
//! A fixed directed graph, not a generic engine:
//!
//! ```text
//! Start → InputFilter → TaskAnalysis → branch dispatch → End
//! ```
//!
//! An unclean message short-circuits to End with a localized refusal
//! and the draft untouched. Otherwise one structured analysis call
//! proposes the reply, the task flags, and an optional partial draft
//! update; the update is folded through the merge rules, the reply is
//! localized, and the branch selected by the code-owned priority runs.
//! The model's own `nextAction` hint is never trusted for routing.

use std::time::Duration;

use quill_llm::{SharedGenerator, generate_with_timeout, parse_structured};
use quill_types::{DraftUpdate, TaskOrder, merge};
use serde::Deserialize;
use tracing::{debug, info, trace, warn};

use crate::error::{FlowError, Result};
use crate::filter;
use crate::language;
use crate::prompts;
use crate::types::{BranchAction, TaskState, TurnOutcome};

/// Default bound on each generation call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(45);

/// Structured payload of the analysis call.
///
/// Untrusted oracle output: every field defaults when omitted.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Analysis {
    #[serde(default)]
    reply: String,

    #[serde(default)]
    task_order: TaskOrder,

    #[serde(default)]
    schema: Option<DraftUpdate>,

    #[serde(default)]
    clarification: Option<String>,

    #[serde(default)]
    feature_info: Option<String>,

    #[serde(default)]
    next_action: Option<String>,
}

/// Runs the pipeline for one turn.
pub struct FlowOrchestrator {
    generator: SharedGenerator,
    call_timeout: Duration,
}

impl FlowOrchestrator {
    /// Create an orchestrator over the given generator.
    pub fn new(generator: SharedGenerator) -> Self {
        Self {
            generator,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Set the per-call generation timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Run one turn through the graph.
    ///
    /// A policy refusal comes back as a normal outcome with
    /// [`TurnOutcome::refusal`] set, not as an error; every other
    /// failure propagates for the handler to contain.
    pub async fn run(&self, mut state: TaskState) -> Result<TurnOutcome> {
        match self.input_filter(&state).await {
            Ok(()) => {}
            Err(FlowError::ContentPolicy { refusal }) => {
                return Ok(TurnOutcome {
                    answer: refusal,
                    draft: state.draft,
                    task_order: TaskOrder::default(),
                    refusal: true,
                });
            }
            Err(err) => return Err(err),
        }

        let profile =
            language::detect_language(self.generator.as_ref(), self.call_timeout, &state.message)
                .await;
        let analysis = self.analyze(&state).await?;

        if let Some(ref hint) = analysis.next_action {
            trace!(%hint, "Ignoring model-proposed next action");
        }

        if let Some(ref update) = analysis.schema {
            if !update.is_empty() {
                debug!("Folding partial draft update into the draft");
                state.draft = Some(merge(state.draft.as_ref(), update));
            }
        }
        state.task_order = analysis.task_order;
        state.clarification = analysis.clarification;
        state.feature_info = analysis.feature_info;

        state.response = language::localize_response(
            self.generator.as_ref(),
            self.call_timeout,
            &analysis.reply,
            &profile,
        )
        .await?;

        let branch = BranchAction::from_order(&state.task_order);
        debug!(%branch, "Dispatching turn branch");
        self.dispatch(branch, &mut state);

        Ok(TurnOutcome {
            answer: state.response,
            draft: state.draft,
            task_order: state.task_order,
            refusal: false,
        })
    }

    /// Safety gate. Returns `ContentPolicy` with a localized refusal
    /// when the message is rejected.
    async fn input_filter(&self, state: &TaskState) -> Result<()> {
        let verdict =
            filter::check_message(self.generator.as_ref(), self.call_timeout, &state.message)
                .await?;
        if verdict.is_clean {
            return Ok(());
        }

        warn!(
            policy = verdict.violated_policy.as_deref().unwrap_or("unspecified"),
            rationale = %verdict.message,
            "Message rejected by safety filter"
        );

        let profile =
            language::detect_language(self.generator.as_ref(), self.call_timeout, &state.message)
                .await;
        let prompt = prompts::refusal(verdict.violated_policy.as_deref(), &profile);
        let refusal =
            generate_with_timeout(self.generator.as_ref(), &prompt, self.call_timeout).await?;

        Err(FlowError::ContentPolicy {
            refusal: refusal.trim().to_string(),
        })
    }

    /// The single combined analysis call.
    async fn analyze(&self, state: &TaskState) -> Result<Analysis> {
        let draft_json = state
            .draft
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| FlowError::Processing(format!("draft serialization failed: {e}")))?;

        let prompt = prompts::analysis(
            &state.message,
            &state.conversation_context,
            draft_json.as_deref(),
        );
        let raw =
            generate_with_timeout(self.generator.as_ref(), &prompt, self.call_timeout).await?;
        Ok(parse_structured(&raw)?)
    }

    /// Run the selected branch. Every branch reaches End.
    fn dispatch(&self, branch: BranchAction, state: &mut TaskState) {
        match branch {
            // Integration seams to external retrieval services;
            // logged pass-throughs until populated.
            BranchAction::SearchWeb => {
                info!("Web search requested; passing through");
            }
            BranchAction::SearchKnowledgeBase => {
                info!("Knowledge-base search requested; passing through");
            }
            BranchAction::UserClarification => {
                if let Some(ref question) = state.clarification {
                    if !state.response.is_empty() {
                        state.response.push_str("\n\n");
                    }
                    state.response.push_str(question);
                }
            }
            BranchAction::FeatureInfo => {
                if let Some(ref info) = state.feature_info {
                    if !state.response.is_empty() {
                        state.response.push_str("\n\n");
                    }
                    state.response.push_str(info);
                }
            }
            BranchAction::UpdateArticle => {
                // Any proposed update is already merged; make sure a
                // draft exists for later turns to build on.
                if state.draft.is_none() {
                    state.draft = Some(merge(None, &DraftUpdate::default()));
                }
            }
            BranchAction::End => {}
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

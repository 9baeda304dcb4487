//! Per-turn request, working state, and outcome types.

use quill_types::{Attachment, ConversationTurn, DraftDocument, TaskOrder};
use serde::{Deserialize, Serialize};

/// How many trailing turns feed the conversation context string handed
/// to the analysis step.
const CONTEXT_WINDOW_TURNS: usize = 12;

/// One turn submission as received from the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    /// Bearer session token, resent with every turn.
    pub session_token: String,

    /// The user's message.
    pub message: String,

    /// Client-side draft, used only when the server holds none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_draft: Option<DraftDocument>,

    /// Inline image attachments for this turn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<Attachment>,

    /// Client-side history, used to reseed the server copy after an
    /// eviction (session resume).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub message_history: Vec<ConversationTurn>,
}

/// Working state threaded through one pipeline run.
///
/// Created fresh per turn from the current draft and history; discarded
/// after. Its only durable side effects are the updated draft and the
/// appended history, both applied by the handler.
#[derive(Debug, Clone)]
pub struct TaskState {
    /// The user's message for this turn.
    pub message: String,

    /// Rendered tail of the history, for prompt context.
    pub conversation_context: String,

    /// Full history at the start of the turn.
    pub history: Vec<ConversationTurn>,

    /// Draft at the start of the turn; mutated by the merge step.
    pub draft: Option<DraftDocument>,

    /// The localized reply accumulated so far.
    pub response: String,

    /// Flags proposed by the analysis step.
    pub task_order: TaskOrder,

    /// Clarifying question proposed by the analysis step, if any.
    pub clarification: Option<String>,

    /// Product/feature explanation proposed by the analysis step.
    pub feature_info: Option<String>,
}

impl TaskState {
    /// Build the working state for one turn.
    pub fn new(
        message: impl Into<String>,
        history: Vec<ConversationTurn>,
        draft: Option<DraftDocument>,
    ) -> Self {
        let conversation_context = render_context(&history);
        Self {
            message: message.into(),
            conversation_context,
            history,
            draft,
            response: String::new(),
            task_order: TaskOrder::default(),
            clarification: None,
            feature_info: None,
        }
    }
}

/// Render the trailing turns as `role: content` lines for prompts.
fn render_context(history: &[ConversationTurn]) -> String {
    let start = history.len().saturating_sub(CONTEXT_WINDOW_TURNS);
    history[start..]
        .iter()
        .map(|turn| format!("{}: {}", turn.role, turn.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The result of one pipeline run.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Final localized answer; never raw structured data.
    pub answer: String,

    /// Draft after any merge this turn performed.
    pub draft: Option<DraftDocument>,

    /// The flags that drove dispatch, for logging and diagnostics.
    pub task_order: TaskOrder,

    /// True when the answer is a content-policy refusal.
    pub refusal: bool,
}

/// The auxiliary step selected for a turn.
///
/// Priority over the flags is fixed here, in code. The model proposes
/// flags; it never chooses the route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchAction {
    /// External web-lookup step (integration seam).
    SearchWeb,
    /// External knowledge-base retrieval step (integration seam).
    SearchKnowledgeBase,
    /// Surface a clarifying question in the response.
    UserClarification,
    /// Surface product/feature explanation text.
    FeatureInfo,
    /// Apply any further draft mutation from the analysis.
    UpdateArticle,
    /// No auxiliary step.
    End,
}

impl BranchAction {
    /// Select the branch for a set of flags: first true flag wins, in
    /// the fixed priority order below.
    pub fn from_order(order: &TaskOrder) -> Self {
        if order.search_web {
            BranchAction::SearchWeb
        } else if order.search_knowledge_base {
            BranchAction::SearchKnowledgeBase
        } else if order.need_user_clarification {
            BranchAction::UserClarification
        } else if order.need_feature_info {
            BranchAction::FeatureInfo
        } else if order.update_article {
            BranchAction::UpdateArticle
        } else {
            BranchAction::End
        }
    }
}

impl std::fmt::Display for BranchAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BranchAction::SearchWeb => "search_web",
            BranchAction::SearchKnowledgeBase => "search_knowledge_base",
            BranchAction::UserClarification => "user_clarification",
            BranchAction::FeatureInfo => "feature_info",
            BranchAction::UpdateArticle => "update_article",
            BranchAction::End => "end",
        };
        write!(f, "{name}")
    }
}

/// The response body for one turn, always well-formed.
///
/// On failure `answer` carries the user-safe message and `error`
/// carries the category; raw internal errors never appear here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnReply {
    /// The assistant's answer or a user-safe failure message.
    pub answer: String,

    /// Draft after this turn, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<DraftDocument>,

    /// Present only on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TurnError>,
}

impl TurnReply {
    /// A successful reply.
    pub fn success(answer: impl Into<String>, schema: Option<DraftDocument>) -> Self {
        Self {
            answer: answer.into(),
            schema,
            error: None,
        }
    }

    /// A failure reply; `message` doubles as the answer text.
    pub fn failure(kind: impl Into<String>, message: impl Into<String>, should_reset: bool) -> Self {
        let message = message.into();
        Self {
            answer: message.clone(),
            schema: None,
            error: Some(TurnError {
                kind: kind.into(),
                message,
                should_reset,
            }),
        }
    }
}

/// Failure detail carried in a [`TurnReply`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnError {
    /// Machine-readable category.
    #[serde(rename = "type")]
    pub kind: String,

    /// User-safe message.
    pub message: String,

    /// True when the client should discard its token and re-issue.
    pub should_reset: bool,
}

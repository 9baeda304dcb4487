//! Task-order flags proposed by the analysis step.

use serde::{Deserialize, Serialize};

/// Default cap on auxiliary iterations within one turn.
pub const DEFAULT_MAX_ITERATIONS: u32 = 3;

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

/// Boolean flags the analysis step proposes for the rest of the turn.
///
/// These come from an untrusted generation call: every field defaults
/// when omitted, and the fixed dispatch priority over them is owned by
/// the pipeline code, never by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskOrder {
    /// Introduce the assistant's capabilities to a new user.
    pub show_introduction: bool,

    /// Analyze the supplied text in depth.
    pub analyze_text: bool,

    /// A web lookup would ground the reply.
    pub search_web: bool,

    /// A knowledge-base lookup would ground the reply.
    pub search_knowledge_base: bool,

    /// The message is ambiguous; ask the user before proceeding.
    pub need_user_clarification: bool,

    /// The user asked about the product itself.
    pub need_feature_info: bool,

    /// The draft should be mutated this turn.
    pub update_article: bool,

    /// Cap on auxiliary iterations.
    pub max_iterations: u32,
}

impl Default for TaskOrder {
    fn default() -> Self {
        Self {
            show_introduction: false,
            analyze_text: false,
            search_web: false,
            search_knowledge_base: false,
            need_user_clarification: false,
            need_feature_info: false,
            update_article: false,
            max_iterations: default_max_iterations(),
        }
    }
}

impl TaskOrder {
    /// True if no branch flag is set.
    pub fn is_terminal(&self) -> bool {
        !(self.search_web
            || self.search_knowledge_base
            || self.need_user_clarification
            || self.need_feature_info
            || self.update_article)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_fields_omitted() {
        let order: TaskOrder = serde_json::from_str(r#"{"searchWeb": true}"#).unwrap();
        assert!(order.search_web);
        assert!(!order.update_article);
        assert_eq!(order.max_iterations, DEFAULT_MAX_ITERATIONS);
    }

    #[test]
    fn test_empty_object_is_terminal() {
        let order: TaskOrder = serde_json::from_str("{}").unwrap();
        assert!(order.is_terminal());
    }

    #[test]
    fn test_not_terminal_with_any_branch_flag() {
        let order = TaskOrder {
            need_feature_info: true,
            ..Default::default()
        };
        assert!(!order.is_terminal());
    }

    #[test]
    fn test_camel_case_wire_format() {
        let order = TaskOrder {
            need_user_clarification: true,
            ..Default::default()
        };
        let json = serde_json::to_string(&order).unwrap();
        assert!(json.contains("needUserClarification"));
        assert!(json.contains("maxIterations"));
    }
}

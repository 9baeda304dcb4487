//! Content-safety gate over incoming messages.

use std::time::Duration;

use quill_llm::{GenerationError, TextGenerator, generate_with_timeout, parse_structured};
use serde::Deserialize;

use crate::prompts;

/// Structured verdict from the safety classification call.
///
/// The classifier is an untrusted oracle: `is_clean` fails closed when
/// omitted, and the other fields default rather than erroring.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyVerdict {
    /// True when the message passes all policies.
    #[serde(default)]
    pub is_clean: bool,

    /// One-line classifier rationale, for logs.
    #[serde(default)]
    pub message: String,

    /// Name of the violated policy, when not clean.
    #[serde(default)]
    pub violated_policy: Option<String>,
}

/// Classify a message against the content policies.
///
/// A garbage payload from the classifier is a hard error for the turn,
/// the same as any structured parse failure.
pub async fn check_message(
    generator: &dyn TextGenerator,
    timeout: Duration,
    message: &str,
) -> Result<SafetyVerdict, GenerationError> {
    let prompt = prompts::safety(message);
    let raw = generate_with_timeout(generator, &prompt, timeout).await?;
    parse_structured(&raw)
}

//! Language detection and response localization.
//!
//! Detection is auxiliary: if the detection call fails or returns an
//! unusable payload, the turn proceeds in English rather than failing.
//! Localization of the actual reply is not auxiliary and propagates
//! errors like any other generation call.

use std::time::Duration;

use quill_llm::{GenerationError, TextGenerator, generate_with_timeout, parse_structured};
use serde::Deserialize;
use tracing::warn;

use crate::prompts;

fn default_primary() -> String {
    "English".to_string()
}

/// Detected language(s) of a user message.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LanguageProfile {
    /// Primary language of the message.
    #[serde(default = "default_primary")]
    pub primary: String,

    /// Secondary language for mixed-language input, if any.
    #[serde(default)]
    pub secondary: Option<String>,
}

impl Default for LanguageProfile {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            secondary: None,
        }
    }
}

impl LanguageProfile {
    /// True when the message mixed two languages.
    pub fn is_mixed(&self) -> bool {
        self.secondary.is_some()
    }
}

/// Detect the language of a message, defaulting to English on any
/// detection failure.
pub async fn detect_language(
    generator: &dyn TextGenerator,
    timeout: Duration,
    message: &str,
) -> LanguageProfile {
    let prompt = prompts::language(message);
    match generate_with_timeout(generator, &prompt, timeout).await {
        Ok(raw) => match parse_structured::<LanguageProfile>(&raw) {
            Ok(profile) => profile,
            Err(err) => {
                warn!(error = %err, "Language detection payload unusable, defaulting to English");
                LanguageProfile::default()
            }
        },
        Err(err) => {
            warn!(error = %err, "Language detection call failed, defaulting to English");
            LanguageProfile::default()
        }
    }
}

/// Re-render a reply in the detected language(s).
pub async fn localize_response(
    generator: &dyn TextGenerator,
    timeout: Duration,
    text: &str,
    profile: &LanguageProfile,
) -> Result<String, GenerationError> {
    if text.trim().is_empty() {
        return Ok(text.to_string());
    }
    let prompt = prompts::localize(text, profile);
    let localized = generate_with_timeout(generator, &prompt, timeout).await?;
    Ok(localized.trim().to_string())
}

//! Prompt builders for the pipeline's generation calls.
//!
//! Structured calls ask for JSON fenced in a code block; the exact key
//! names here must stay in sync with the deserialization structs in
//! `filter`, `language`, and `pipeline`.

use crate::language::LanguageProfile;

/// Content-safety classification prompt.
pub fn safety(message: &str) -> String {
    format!(
        "You are a content-safety classifier for a writing assistant.\n\
         Classify the user message below against these policies: hate speech, \
         harassment, sexual content involving minors, instructions for violence \
         or weapons, self-harm encouragement, spam.\n\n\
         User message:\n{message}\n\n\
         Respond with only a JSON object in a fenced code block:\n\
         ```json\n\
         {{\"isClean\": true|false, \"message\": \"<one-line rationale>\", \
         \"violatedPolicy\": \"<policy name or null>\"}}\n\
         ```"
    )
}

/// Language-detection prompt.
pub fn language(message: &str) -> String {
    format!(
        "Identify the language of the message below. If it mixes two \
         languages (for example technical terms in English inside another \
         language), report both.\n\n\
         Message:\n{message}\n\n\
         Respond with only a JSON object in a fenced code block:\n\
         ```json\n\
         {{\"primary\": \"<language name>\", \"secondary\": \"<language name or null>\"}}\n\
         ```"
    )
}

/// The single combined analysis prompt: reply, task flags, optional
/// partial draft update, next-action hint.
pub fn analysis(message: &str, context: &str, draft_json: Option<&str>) -> String {
    let draft_section = match draft_json {
        Some(json) => format!("Current article draft (JSON):\n{json}\n\n"),
        None => "There is no article draft yet.\n\n".to_string(),
    };

    format!(
        "You are a writing assistant helping the user develop an article \
         draft over a conversation.\n\n\
         Conversation so far:\n{context}\n\n\
         {draft_section}\
         Latest user message:\n{message}\n\n\
         Respond with only a JSON object in a fenced code block:\n\
         ```json\n\
         {{\n\
         \"reply\": \"<your natural-language reply to the user>\",\n\
         \"taskOrder\": {{\"showIntroduction\": bool, \"analyzeText\": bool, \
         \"searchWeb\": bool, \"searchKnowledgeBase\": bool, \
         \"needUserClarification\": bool, \"needFeatureInfo\": bool, \
         \"updateArticle\": bool, \"maxIterations\": int}},\n\
         \"schema\": {{<partial draft update: title, summary, body, category, \
         keywords, subject_areas; include only fields that should change>}} or null,\n\
         \"clarification\": \"<question to ask the user, if any>\" or null,\n\
         \"featureInfo\": \"<product explanation, if asked about the product>\" or null,\n\
         \"nextAction\": \"<suggested next step>\" or null\n\
         }}\n\
         ```"
    )
}

/// Localization prompt: re-render a reply in the user's language.
pub fn localize(text: &str, profile: &LanguageProfile) -> String {
    let term_note = match profile.secondary.as_deref() {
        Some(secondary) => format!(
            " Keep recognized technical terms in {secondary}, as the user mixed both languages."
        ),
        None => String::new(),
    };

    format!(
        "Rewrite the following assistant reply in natural, fluent {primary}.\
         {term_note} Output only the rewritten reply, as plain text with no \
         JSON and no code fences.\n\n\
         Reply:\n{text}",
        primary = profile.primary,
    )
}

/// Refusal prompt for a message that failed the safety filter.
pub fn refusal(violated_policy: Option<&str>, profile: &LanguageProfile) -> String {
    let policy = violated_policy.unwrap_or("our content policy");
    format!(
        "Write a short, polite refusal in {primary} explaining that the \
         user's message cannot be processed because it conflicts with {policy}. \
         Do not repeat the message content. Do not mention internal systems. \
         Output plain text only.",
        primary = profile.primary,
    )
}

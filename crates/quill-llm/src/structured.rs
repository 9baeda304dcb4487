//! Parsing helpers for structured generation responses.
//!
//! Backends are asked to return JSON fenced in a code block. The fence
//! markers must be stripped before parsing, and a parse failure is a
//! hard error for the turn — the pipeline never silently ignores a
//! malformed structured payload.

use serde::de::DeserializeOwned;

use crate::error::{GenerationError, Result};

/// Strip a surrounding fenced code block, if present.
///
/// Handles ```` ```json … ``` ```` and bare ```` ``` … ``` ```` fences;
/// text without fences passes through untouched.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();

    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop an optional language tag on the opening fence line.
    let body = match rest.split_once('\n') {
        Some((_lang, body)) => body,
        None => rest,
    };

    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parse a structured generation response into `T`.
///
/// Strips fence markers first. On failure, the raw head of the payload
/// is preserved in the error for server-side logs.
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let stripped = strip_code_fences(raw);
    serde_json::from_str(stripped).map_err(|e| {
        let head: String = stripped.chars().take(120).collect();
        GenerationError::structured(format!("{e} (payload head: {head:?})"))
    })
}

//! The `TextGenerator` trait and test doubles.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{GenerationError, Result};

/// The black-box text-completion boundary.
///
/// Implementations take a prompt and return text. Structured output is
/// still text at this boundary; callers parse it with
/// [`crate::parse_structured`].
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for the given prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Name of this generator, for logs.
    fn name(&self) -> &str;
}

/// A generator that can be shared across tasks.
pub type SharedGenerator = Arc<dyn TextGenerator>;

/// Run a generation call under a bounded timeout.
///
/// No turn may hold a per-session lock indefinitely, so every pipeline
/// call goes through this wrapper. A timeout surfaces as an error for
/// the turn, never a silent hang.
pub async fn generate_with_timeout(
    generator: &dyn TextGenerator,
    prompt: &str,
    timeout: Duration,
) -> Result<String> {
    match tokio::time::timeout(timeout, generator.generate(prompt)).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                generator = generator.name(),
                timeout_ms = timeout.as_millis() as u64,
                "Generation call timed out"
            );
            Err(GenerationError::Timeout(timeout))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mock Generator
// ─────────────────────────────────────────────────────────────────────────────

/// A mock generator for testing purposes.
///
/// Returns pre-configured responses in order and records every prompt,
/// so pipeline tests can assert both routing and prompt content.
#[derive(Debug)]
pub struct MockGenerator {
    responses: std::sync::Mutex<Vec<String>>,
    prompt_log: std::sync::Mutex<Vec<String>>,
}

impl MockGenerator {
    /// Create a mock with the given responses, returned in order.
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses),
            prompt_log: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that returns a single response.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self::new(vec![text.into()])
    }

    /// All prompts sent to this mock so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompt_log.lock().unwrap().clone()
    }

    /// Number of generation calls made.
    pub fn call_count(&self) -> usize {
        self.prompt_log.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompt_log.lock().unwrap().push(prompt.to_string());

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(GenerationError::malformed(
                "MockGenerator: no more responses available",
            ));
        }
        Ok(responses.remove(0))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A generator that never completes, for timeout tests.
#[derive(Debug, Default)]
pub struct HangingGenerator;

#[async_trait]
impl TextGenerator for HangingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        std::future::pending().await
    }

    fn name(&self) -> &str {
        "hanging"
    }
}

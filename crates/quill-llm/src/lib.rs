//! Text-generation boundary for Quill.
//!
//! The pipeline treats content generation as a black-box function from
//! prompt string to text. This crate defines that boundary:
//!
//! - [`TextGenerator`]: the trait the pipeline calls
//! - [`HttpGenerator`]: OpenAI-compatible chat-completions backend
//! - [`MockGenerator`]: scripted responses for deterministic tests
//! - [`parse_structured`]: fence-stripping JSON extraction for
//!   structured generation responses

mod error;
mod generator;
mod http;
mod structured;

pub use error::{GenerationError, Result};
pub use generator::{
    HangingGenerator, MockGenerator, SharedGenerator, TextGenerator, generate_with_timeout,
};
pub use http::{HttpGenerator, HttpGeneratorConfig};
pub use structured::{parse_structured, strip_code_fences};

//! AI provider abstraction and normalized request/response types.
//!
//! The [`AiBackend`] trait translates between a normalized
//! [`ChatRequest`]/[`ChatResponse`] pair and a provider's chat-completion
//! HTTP API. The built-in implementation is [`OpenAiBackend`]; tests use
//! [`MockBackend`].

pub mod mock;
pub mod openai;

pub use mock::MockBackend;
pub use openai::OpenAiBackend;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::Result;

/// A normalized chat-completion request, provider-agnostic.
///
/// Built by [`GenerationClient`](crate::generation::GenerationClient) from a
/// [`PromptSpec`](crate::generation::PromptSpec).
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model identifier (e.g. `"gpt-4o-mini"`).
    pub model: String,

    /// System instruction, omitted from the wire when empty.
    pub system: Option<String>,

    /// The user instruction text.
    pub prompt: String,

    /// Sampling temperature for this call.
    pub temperature: f64,

    /// Maximum tokens to generate.
    pub max_tokens: u32,

    /// Constrain the provider to return a single JSON object.
    pub json_mode: bool,
}

/// A normalized chat-completion response.
#[derive(Debug)]
pub struct ChatResponse {
    /// The generated text content.
    pub text: String,

    /// HTTP status code, for diagnostics.
    pub status: u16,

    /// Provider-specific metadata (token usage, model info), raw JSON.
    pub metadata: Option<serde_json::Value>,
}

/// Abstraction over AI chat-completion providers.
///
/// Implementors translate the normalized request into the provider's HTTP
/// API and classify provider failures into the crate error taxonomy:
/// credential and quota failures are non-retryable, everything else is
/// transient. Object-safe; used as `Arc<dyn AiBackend>`.
#[async_trait]
pub trait AiBackend: Send + Sync {
    /// Execute a single chat-completion call.
    async fn complete(
        &self,
        client: &Client,
        base_url: &str,
        request: &ChatRequest,
    ) -> Result<ChatResponse>;

    /// Human-readable name for logging and diagnostics.
    fn name(&self) -> &'static str;
}

//! Language-model access for the pipeline stages.
//! One chat-completion trait, an OpenRouter-backed client, and the
//! normalization helper that turns raw model text into a typed payload.

pub mod client;
pub mod normalize;

pub use client::OpenRouterClient;
pub use normalize::{normalize_response, LLMPayload};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LLMError {
    #[error("Request timeout - the API took too long to respond")]
    Timeout,

    #[error("Connection error - unable to reach the API")]
    Connect,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed - check your API key")]
    Auth,

    #[error("Access forbidden - insufficient permissions")]
    Forbidden,

    #[error("Rate limit exceeded - too many requests")]
    RateLimited,

    #[error("Server error ({status}): {body}")]
    Server { status: u16, body: String },

    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    #[error("API returned empty response")]
    Empty,

    #[error("Failed to parse API response as JSON: {0}")]
    Malformed(String),
}

impl LLMError {
    /// Distinguishes a bad response body from a transport-level failure.
    pub fn is_malformed(&self) -> bool {
        matches!(self, LLMError::Malformed(_) | LLMError::Empty)
    }
}

pub type LLMResult<T> = std::result::Result<T, LLMError>;

/// A chat-completion capability: one prompt in, one text response out.
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn complete(&self, prompt: &str) -> LLMResult<String>;
}

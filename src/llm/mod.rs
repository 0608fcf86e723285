// LLM client module
// Sends assembled prompts to a remote chat completion service


pub mod groq;

use std::time::Duration;

use thiserror::Error;

pub use groq::GroqClient;

/// Parameters sent with every completion request
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    /// Backend model identifier
    pub model: String,
    /// Sampling randomness in [0, 1]
    pub temperature: f32,
    /// Output length cap
    pub max_tokens: u32,
    /// Network timeout for one request
    pub timeout: Duration,
}

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("No API key configured for the language model")]
    MissingCredentials,

    #[error("Authentication failed (HTTP {status}): {message}")]
    Auth { status: u16, message: String },

    #[error("Rate limited after {attempts} attempt(s): {message}")]
    RateLimited { attempts: u32, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    /// Whether the failure is caused by throttling and may succeed later
    #[inline]
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// A remote text generation service
pub trait CompletionBackend {
    fn complete(&self, prompt: &str, config: &GenerationConfig) -> Result<String, LlmError>;
}

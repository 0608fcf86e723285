use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{CompletionBackend, GenerationConfig, LlmError};
use crate::config::LlmConfig;

const EXPONENTIAL_BACKOFF_BASE: u32 = 2;
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Client for Groq's OpenAI-compatible chat completion API
#[derive(Debug, Clone)]
pub struct GroqClient {
    base_url: String,
    api_key: Option<String>,
    agent: ureq::Agent,
    max_retries: u32,
    retry_base_delay: Duration,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Outcome of a single failed request
enum Failure {
    Throttled {
        message: String,
        retry_after: Option<Duration>,
    },
    Fatal(LlmError),
}

impl GroqClient {
    #[inline]
    pub fn new(config: &LlmConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            agent,
            max_retries: config.max_retries,
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
        }
    }

    #[inline]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[inline]
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn send_once(
        &self,
        api_key: &str,
        body: &str,
        config: &GenerationConfig,
    ) -> Result<String, Failure> {
        let mut response = self
            .agent
            .post(self.endpoint())
            .config()
            .timeout_global(Some(config.timeout))
            .build()
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", api_key))
            .send(body)
            .map_err(|e| Failure::Fatal(LlmError::Network(e.to_string())))?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| Failure::Fatal(LlmError::Network(e.to_string())))?;

        match status {
            200..=299 => Ok(text),
            401 | 403 => Err(Failure::Fatal(LlmError::Auth {
                status,
                message: error_message(&text),
            })),
            429 => Err(Failure::Throttled {
                message: error_message(&text),
                retry_after,
            }),
            _ => Err(Failure::Fatal(LlmError::Api {
                status,
                message: error_message(&text),
            })),
        }
    }

    fn backoff_delay(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        let exponential = self
            .retry_base_delay
            .saturating_mul(EXPONENTIAL_BACKOFF_BASE.saturating_pow(retry));
        retry_after.unwrap_or(exponential).min(MAX_RETRY_DELAY)
    }
}

impl CompletionBackend for GroqClient {
    #[inline]
    fn complete(&self, prompt: &str, config: &GenerationConfig) -> Result<String, LlmError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(LlmError::MissingCredentials)?;

        let request = ChatRequest {
            model: &config.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        };
        let body = serde_json::to_string(&request)
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to serialize request: {}", e)))?;

        let mut attempt = 0;
        let response_text = loop {
            attempt += 1;
            debug!(
                "Completion request attempt {}/{} to {}",
                attempt,
                self.max_retries + 1,
                self.base_url
            );

            match self.send_once(api_key, &body, config) {
                Ok(text) => break text,
                Err(Failure::Fatal(error)) => return Err(error),
                Err(Failure::Throttled {
                    message,
                    retry_after,
                }) => {
                    if attempt > self.max_retries {
                        warn!("Rate limit persisted after {} attempt(s)", attempt);
                        return Err(LlmError::RateLimited {
                            attempts: attempt,
                            message,
                        });
                    }

                    let delay = self.backoff_delay(attempt - 1, retry_after);
                    warn!(
                        "Rate limited by {}, retrying in {:?} ({}/{})",
                        self.base_url, delay, attempt, self.max_retries
                    );
                    std::thread::sleep(delay);
                }
            }
        };

        let response: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let answer = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("Response contained no choices".to_string()))?;

        info!(
            "Received completion of {} characters from {} after {} attempt(s)",
            answer.len(),
            config.model,
            attempt
        );

        Ok(answer)
    }
}

/// Extract the message from an OpenAI-style error body, falling back to the raw text
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|response| response.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

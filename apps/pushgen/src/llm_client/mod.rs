//! LLM Client: the single point of entry for all Anthropic API calls in pushgen.
//!
//! No other module talks to the API directly. Notification code depends on
//! the `TextGenerator` trait, so tests and the template backend never need a
//! network connection.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
/// Bounds for the reply token budget.
const MIN_TOKENS: u32 = 64;
const MAX_TOKENS: u32 = 1024;

/// Reply token budget for a message limited to `max_chars` characters,
/// two tokens per character.
pub fn max_tokens_for(max_chars: usize) -> u32 {
    u32::try_from(max_chars.saturating_mul(2))
        .unwrap_or(MAX_TOKENS)
        .clamp(MIN_TOKENS, MAX_TOKENS)
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation timed out")]
    Timeout,

    #[error("rate limited or out of quota after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("response parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("model returned empty content")]
    EmptyContent,

    #[error("policy violation: {}", .0.join("; "))]
    Policy(Vec<String>),
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GenerationError::Timeout
        } else {
            GenerationError::Http(e)
        }
    }
}

impl GenerationError {
    /// Short machine label used in logs and the exclusion report.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::Timeout => "timeout",
            GenerationError::RateLimited { .. } => "quota",
            GenerationError::Http(_) => "http",
            GenerationError::Api { .. } => "api",
            GenerationError::Parse(_) => "parse",
            GenerationError::EmptyContent => "empty",
            GenerationError::Policy(_) => "policy",
        }
    }
}

/// Per-call limits passed alongside the prompt.
#[derive(Debug, Clone, Copy)]
pub struct GenerationConstraints<'a> {
    pub system: &'a str,
    pub max_chars: usize,
}

/// External text generation capability.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        constraints: GenerationConstraints<'_>,
    ) -> Result<String, GenerationError>;

    /// Backend label for logs.
    fn name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// 429 and 5xx are worth another attempt; other failures are final.
fn is_retryable(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Exponential backoff: 1s, 2s, 4s, ...
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(1000 * (1u64 << (attempt.saturating_sub(1)).min(6)))
}

/// Wraps the Anthropic Messages API with timeout and retry handling.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    model: String,
    /// Retries after the first attempt.
    max_retries: u32,
}

impl LlmClient {
    pub fn new(
        api_key: String,
        model: String,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(GenerationError::Http)?;
        Ok(Self {
            client,
            api_key,
            model,
            max_retries,
        })
    }

    /// First attempt plus retries.
    fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Makes a raw call to the Messages API, returning the full response object.
    /// Retries on 429, 5xx, timeouts and transport errors with exponential backoff.
    pub async fn call(
        &self,
        prompt: &str,
        system: &str,
        max_tokens: u32,
    ) -> Result<LlmResponse, GenerationError> {
        let request_body = AnthropicRequest {
            model: &self.model,
            max_tokens,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut last_error: Option<GenerationError> = None;

        for attempt in 0..self.total_attempts() {
            if attempt > 0 {
                let delay = backoff_delay(attempt);
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(GenerationError::from(e));
                    continue;
                }
            };

            let status = response.status().as_u16();

            if is_retryable(status) {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(if status == 429 {
                    GenerationError::RateLimited { retries: attempt }
                } else {
                    GenerationError::Api {
                        status,
                        message: body,
                    }
                });
                continue;
            }

            if !response.status().is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<AnthropicError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(GenerationError::Api { status, message });
            }

            let body = response.text().await?;
            let llm_response: LlmResponse = serde_json::from_str(&body)?;

            debug!(
                "LLM call succeeded: input_tokens={}, output_tokens={}",
                llm_response.usage.input_tokens, llm_response.usage.output_tokens
            );

            return Ok(llm_response);
        }

        Err(last_error.unwrap_or(GenerationError::RateLimited {
            retries: self.max_retries,
        }))
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(
        &self,
        prompt: &str,
        constraints: GenerationConstraints<'_>,
    ) -> Result<String, GenerationError> {
        let max_tokens = max_tokens_for(constraints.max_chars);
        let response = self.call(prompt, constraints.system, max_tokens).await?;
        let text = response
            .text()
            .map(clean_reply)
            .filter(|t| !t.is_empty())
            .ok_or(GenerationError::EmptyContent)?;
        Ok(text)
    }

    fn name(&self) -> &str {
        "llm"
    }
}

/// Strips code fences and wrapping quotes, and joins lines into one paragraph.
fn clean_reply(text: &str) -> String {
    let text = text.trim();
    let text = text
        .strip_prefix("```")
        .and_then(|s| s.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(text);
    let text = text
        .strip_prefix(['"', '«'])
        .and_then(|s| s.strip_suffix(['"', '»']))
        .unwrap_or(text);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

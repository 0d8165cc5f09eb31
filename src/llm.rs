use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::LlmConfig;

/// Retries on a retryable status before giving up.
const MAX_RETRIES: u32 = 2;

/// Delay before the retry attempt.
const RETRY_DELAY_MS: u64 = 500;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Request failed: {0}")]
    Request(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Client for the text-completion capability (OpenAI-compatible wire format).
///
/// Constructed once at startup and injected through `AppState`.
#[derive(Clone)]
pub struct CompletionClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl CompletionClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Request(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Complete a prompt, retrying once on rate-limit or transient errors.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let mut delay = Duration::from_millis(RETRY_DELAY_MS);
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match self.call(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if Self::is_retryable(&e) && attempt < MAX_RETRIES - 1 => {
                    debug!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "retrying completion");
                    last_error = Some(e);
                    sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Llm("completion failed".into())))
    }

    fn is_retryable(error: &Error) -> bool {
        matches!(error, Error::RateLimitExceeded)
            || error.to_string().contains("503")
            || error.to_string().contains("timeout")
    }

    async fn call(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.max_tokens,
            temperature: 0.3,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Request(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(Error::RateLimitExceeded);
        }

        let text = response
            .text()
            .await
            .map_err(|e| Error::Request(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            warn!(%status, "completion backend returned error");
            return Err(Error::Llm(format!("Backend returned {}: {}", status, text)));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| Error::Llm(format!("Unexpected response shape: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Llm("Empty completion".into()))
    }
}

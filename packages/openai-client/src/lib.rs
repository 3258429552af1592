//! Pure OpenAI-compatible chat completions client
//!
//! A minimal client for the `/chat/completions` endpoint shared by OpenAI,
//! Mistral and most hosted model gateways. No domain-specific logic.
//!
//! # Example
//!
//! ```rust,ignore
//! use openai_client::OpenAIClient;
//!
//! let client = OpenAIClient::new(api_key).with_base_url("https://api.mistral.ai/v1");
//!
//! // JSON mode: the reply is a single JSON object as a string
//! let json = client
//!     .json_completion("mistral-large-latest", system_prompt, user_prompt)
//!     .await?;
//! ```
//!
//! HTTP 429 surfaces as [`OpenAIError::RateLimited`] so callers can apply
//! their own backoff policy.

pub mod error;
pub mod types;

pub use error::{OpenAIError, Result};
pub use types::*;

use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Pure chat completions client.
#[derive(Clone)]
pub struct OpenAIClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAIClient {
    /// Create a new client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| OpenAIError::Config("OPENAI_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Set a custom base URL (Mistral, Azure, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Chat completion.
    ///
    /// Send messages to the chat completion API and get a response.
    pub async fn chat_completion(&self, request: ChatRequest) -> Result<ChatResponse> {
        let start = std::time::Instant::now();

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Chat completion request failed");
                OpenAIError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, error_text));
        }

        let chat_response: types::ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| OpenAIError::Parse(e.to_string()))?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| OpenAIError::Parse("No content in completion".into()))?;

        debug!(
            model = %request.model,
            duration_ms = start.elapsed().as_millis(),
            total_tokens = chat_response.usage.as_ref().map(|u| u.total_tokens),
            "Chat completion"
        );

        Ok(ChatResponse {
            content,
            usage: chat_response.usage,
        })
    }

    /// JSON-mode completion with a system and a user message.
    ///
    /// Temperature is pinned to zero. The returned string is the raw reply
    /// with any markdown code fence removed; parsing is left to the caller.
    pub async fn json_completion(
        &self,
        model: &str,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
    ) -> Result<String> {
        let request = ChatRequest::new(model)
            .message(Message::system(system_prompt))
            .message(Message::user(user_prompt))
            .temperature(0.0)
            .json_mode();

        let response = self.chat_completion(request).await?;
        Ok(strip_code_blocks(&response.content).to_string())
    }
}

fn classify_failure(status: StatusCode, body: String) -> OpenAIError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        warn!(status = %status, "Chat completion rate limited");
        return OpenAIError::RateLimited(body);
    }
    warn!(status = %status, error = %body, "Chat completion API error");
    OpenAIError::Api {
        status: status.as_u16(),
        message: body,
    }
}

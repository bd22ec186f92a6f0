
pub mod prompts;

pub use prompts::{CHAT_PROMPT_TEMPLATE, ChatTurn, render_chat_prompt, render_history};

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::{DocativeError, Result};

/// Client for an OpenAI-compatible chat-completions endpoint. Fail-fast:
/// remote errors surface as [`DocativeError::Model`] with no retries.
#[derive(Debug, Clone)]
pub struct ChatClient {
    api_base: Url,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
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
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl ChatClient {
    #[inline]
    pub fn new(config: &Config, api_key: String) -> Result<Self> {
        let api_base = Url::parse(&config.openai.api_base)
            .map_err(|e| DocativeError::Config(format!("invalid API base URL: {}", e)))?;

        // Completions can take longer than embeddings; give the model room
        // beyond the generic remote-call timeout.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.openai.timeout_seconds.max(60)))
            .build()
            .map_err(|e| DocativeError::Model(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_base,
            api_key,
            model: config.openai.chat_model.clone(),
            temperature: config.openai.temperature,
            max_tokens: config.openai.max_tokens,
            client,
        })
    }

    /// Override the endpoint base, mainly for pointing tests at a mock server.
    #[inline]
    pub fn with_api_base(mut self, api_base: Url) -> Self {
        self.api_base = api_base;
        self
    }

    /// Send a single-prompt completion request and return the raw answer text.
    #[inline]
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        debug!(
            "Requesting completion from {} ({} prompt chars)",
            self.model,
            prompt.len()
        );

        let url = self
            .api_base
            .join("/v1/chat/completions")
            .map_err(|e| DocativeError::Model(format!("failed to build URL: {}", e)))?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| DocativeError::Model(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DocativeError::Model(format!(
                "provider returned {}: {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| DocativeError::Model(format!("invalid response body: {}", e)))?;

        let answer = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| DocativeError::Model("response carried no choices".to_string()))?;

        Ok(answer)
    }
}

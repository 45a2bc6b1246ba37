use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use log::error;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::app_config::ProviderConfig;
use crate::errors::ProviderError;

use super::{ChatRequest, ChatResponse, Provider, TokenUsage};

/// Client for any OpenAI-compatible chat-completions endpoint
#[derive(Debug)]
pub struct OpenAiCompatible {
    /// HTTP client for API requests
    client: Client,
    /// Base URL without the trailing slash
    base_url: String,
    /// API key for authentication
    api_key: String,
    /// Model identifier sent with each request
    model: String,
    /// Per-call timeout, echoed in timeout errors
    timeout_secs: u64,
}

/// Wire format of a chat message
#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

/// Wire format of a chat-completions request
#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize, Default)]
struct WirePromptDetails {
    #[serde(default)]
    cached_tokens: u64,
}

#[derive(Debug, Deserialize, Default)]
struct WireCompletionDetails {
    #[serde(default)]
    reasoning_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    prompt_tokens_details: Option<WirePromptDetails>,
    #[serde(default)]
    completion_tokens_details: Option<WireCompletionDetails>,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

impl OpenAiCompatible {
    /// Create a client from provider settings and a per-call timeout.
    ///
    /// The system proxy is honored only when `proxy_enable` is set;
    /// otherwise the client connects directly.
    pub fn new(config: &ProviderConfig, timeout_secs: u64) -> Result<Self> {
        let base_url = normalize_base_url(&config.base_url)?;

        let mut builder = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60));
        if !config.proxy_enable {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(OpenAiCompatible {
            client,
            base_url,
            api_key: config.api_key.trim().to_string(),
            model: config.model.trim().to_string(),
            timeout_secs,
        })
    }
}

/// Validate the endpoint and strip any trailing slash
fn normalize_base_url(base_url: &str) -> Result<String> {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(anyhow!("Endpoint cannot be empty"));
    }
    Url::parse(trimmed).map_err(|e| anyhow!("Invalid endpoint {}: {}", trimmed, e))?;
    Ok(trimmed.to_string())
}

#[async_trait]
impl Provider for OpenAiCompatible {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = WireRequest {
            model: self.model.clone(),
            messages: vec![
                WireMessage {
                    role: "system".to_string(),
                    content: request.system,
                },
                WireMessage {
                    role: "user".to_string(),
                    content: request.user,
                },
            ],
            temperature: request.temperature,
            top_p: 0.9,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    ProviderError::ConnectionError(e.to_string())
                } else {
                    ProviderError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Chat API error ({}): {}", status, message);
            return Err(match status.as_u16() {
                401 | 403 => ProviderError::AuthenticationError(message),
                429 => ProviderError::RateLimitExceeded(message),
                code => ProviderError::ApiError {
                    status_code: code,
                    message,
                },
            });
        }

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let text = wire
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| ProviderError::ParseError("Response contains no choices".to_string()))?;

        let usage = wire
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
                cached_tokens: u.prompt_tokens_details.unwrap_or_default().cached_tokens,
                reasoning_tokens: u
                    .completion_tokens_details
                    .unwrap_or_default()
                    .reasoning_tokens,
            })
            .unwrap_or_default();

        Ok(ChatResponse { text, usage })
    }

    fn name(&self) -> &str {
        "openai-compatible"
    }
}

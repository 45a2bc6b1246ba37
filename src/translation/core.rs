/*!
 * Core translation service implementation.
 *
 * This module contains the TranslationService, the chunk wire codec, and
 * token usage accounting. A chunk travels to the model as a JSON object
 * keyed by fragment id; the response is parsed leniently and aligned back
 * to fragment ids, falling back to positional alignment when the provider
 * deviates from the instructed shape.
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use log::warn;
use serde_json::Value;

use crate::app_config::TranslationConfig;
use crate::chunker::Chunk;
use crate::errors::{ProviderError, TranslationError};
use crate::formats::TranslatedMap;
use crate::glossary::Glossary;
use crate::providers::openai::OpenAiCompatible;
use crate::providers::{ChatRequest, ChatResponse, Provider, TokenUsage};

use super::prompts;

/// Token usage statistics for tracking API consumption
#[derive(Debug, Clone)]
pub struct TokenUsageStats {
    /// Accumulated token counters
    pub usage: TokenUsage,
    /// Number of completed API calls
    pub requests: u64,
    /// Start time of token tracking
    pub start_time: Instant,
    /// Total time spent inside API requests
    pub api_duration: Duration,
    /// Model name
    pub model: String,
}

impl Default for TokenUsageStats {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenUsageStats {
    /// Create a new empty token usage stats instance
    pub fn new() -> Self {
        Self {
            usage: TokenUsage::default(),
            requests: 0,
            start_time: Instant::now(),
            api_duration: Duration::from_secs(0),
            model: String::new(),
        }
    }

    /// Create stats tagged with the model in use
    pub fn for_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::new()
        }
    }

    /// Record one completed call
    pub fn record(&mut self, usage: &TokenUsage, duration: Duration) {
        self.usage.add(usage);
        self.requests += 1;
        self.api_duration += duration;
    }

    /// Total tokens across all counters
    pub fn total_tokens(&self) -> u64 {
        self.usage.input_tokens + self.usage.output_tokens
    }

    /// Tokens per minute over the API time actually spent
    pub fn tokens_per_minute(&self) -> f64 {
        let minutes = if self.api_duration.as_secs_f64() > 0.0 {
            self.api_duration.as_secs_f64() / 60.0
        } else {
            self.start_time.elapsed().as_secs_f64() / 60.0
        };
        if minutes > 0.0 {
            self.total_tokens() as f64 / minutes
        } else {
            0.0
        }
    }

    /// Human-readable summary for logs
    pub fn summary(&self) -> String {
        format!(
            "Token usage: model={} requests={} in={} out={} cached={} reasoning={} api_time={:.2}s tpm={:.1}",
            self.model,
            self.requests,
            self.usage.input_tokens,
            self.usage.output_tokens,
            self.usage.cached_tokens,
            self.usage.reasoning_tokens,
            self.api_duration.as_secs_f64(),
            self.tokens_per_minute()
        )
    }
}

/// Main translation service dispatching chunk payloads to a provider
pub struct TranslationService {
    /// Provider client
    provider: Arc<dyn Provider>,
    /// Configuration for the translation stage
    pub config: TranslationConfig,
}

impl TranslationService {
    /// Create a service backed by the configured OpenAI-compatible endpoint
    pub fn new(config: TranslationConfig) -> Result<Self> {
        config.validate()?;
        let provider = OpenAiCompatible::new(&config.provider, config.timeout_secs)?;
        Ok(Self {
            provider: Arc::new(provider),
            config,
        })
    }

    /// Create a service over an explicit provider (mock backends, tests)
    pub fn with_provider(config: TranslationConfig, provider: Arc<dyn Provider>) -> Self {
        Self { provider, config }
    }

    /// Provider name, for logs
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// One translation attempt for a chunk payload, bounded by the per-call
    /// timeout. Retry policy lives in the concurrent dispatcher.
    pub(crate) async fn call_chunk(
        &self,
        payload: &str,
        glossary: Option<&Glossary>,
    ) -> Result<ChatResponse, ProviderError> {
        let system = prompts::translation_prompt(
            &self.config.target_language,
            glossary,
            payload,
            self.config.custom_prompt.as_deref(),
        );
        let request = ChatRequest::new(system, payload).temperature(self.config.provider.temperature);
        self.call_with_timeout(request).await
    }

    /// One arbitrary prompt attempt with the same timeout envelope
    pub(crate) async fn call_with_timeout(
        &self,
        request: ChatRequest,
    ) -> Result<ChatResponse, ProviderError> {
        let timeout = Duration::from_secs(self.config.timeout_secs);
        match tokio::time::timeout(timeout, self.provider.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.config.timeout_secs)),
        }
    }
}

impl Clone for TranslationService {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            config: self.config.clone(),
        }
    }
}

/// Serialize a chunk as the JSON object the model is instructed to echo
pub fn encode_chunk(chunk: &Chunk) -> String {
    let mut map = serde_json::Map::new();
    for (id, text) in &chunk.fragments {
        map.insert(id.to_string(), Value::String(text.clone()));
    }
    Value::Object(map).to_string()
}

/// Strip a Markdown code fence wrapper some models insist on adding
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") up to the first newline
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parse a chunk response into ordered (key, text) pairs
pub fn decode_chunk(raw: &str) -> Result<Vec<(String, String)>, TranslationError> {
    let cleaned = strip_code_fences(raw);
    let value: Value = serde_json::from_str(cleaned)
        .map_err(|e| TranslationError::MalformedResponse(format!("invalid JSON: {}", e)))?;
    let Value::Object(map) = value else {
        return Err(TranslationError::MalformedResponse(
            "response is not a JSON object".to_string(),
        ));
    };
    Ok(map
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (key, text)
        })
        .collect())
}

/// Align one decoded response onto the chunk's fragment ids.
///
/// Keys that match the dispatched fragment ids win; when the provider
/// renumbered or dropped keys but returned the right count, values are
/// aligned positionally. Returns whether a discrepancy was observed —
/// fragments left unmatched simply keep their original text downstream.
pub fn align_chunk(chunk: &Chunk, decoded: &[(String, String)], out: &mut TranslatedMap) -> bool {
    let keyed: HashMap<&str, &str> = decoded
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();

    let all_keys_present = chunk
        .fragments
        .iter()
        .all(|(id, _)| keyed.contains_key(id.to_string().as_str()));

    if all_keys_present {
        for (id, _) in &chunk.fragments {
            if let Some(text) = keyed.get(id.to_string().as_str()) {
                out.insert(*id, (*text).to_string());
            }
        }
        return decoded.len() != chunk.fragments.len();
    }

    if decoded.len() == chunk.fragments.len() {
        // Same count, different keys: trust the order
        warn!(
            "Chunk {} returned mismatched keys; falling back to positional alignment",
            chunk.index
        );
        for ((id, _), (_, text)) in chunk.fragments.iter().zip(decoded.iter()) {
            out.insert(*id, text.clone());
        }
        return true;
    }

    // Partial response: keep whatever keys do match
    warn!(
        "Chunk {} returned {} segments for {} requested; unmatched fragments keep their original text",
        chunk.index,
        decoded.len(),
        chunk.fragments.len()
    );
    for (id, _) in &chunk.fragments {
        if let Some(text) = keyed.get(id.to_string().as_str()) {
            out.insert(*id, (*text).to_string());
        }
    }
    true
}

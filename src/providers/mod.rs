/*!
 * Provider implementations for LLM chat endpoints.
 *
 * This module contains the provider seam the translation core dispatches
 * through, plus the concrete clients:
 * - `openai`: any OpenAI-compatible /chat/completions endpoint
 * - `mock`: scriptable in-process provider for tests and dry runs
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// One chat completion request, provider-agnostic
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// System prompt guiding the model
    pub system: String,
    /// User content (a serialized chunk payload)
    pub user: String,
    /// Sampling temperature
    pub temperature: f32,
}

impl ChatRequest {
    /// Create a request from system and user content
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        ChatRequest {
            system: system.into(),
            user: user.into(),
            temperature: 0.7,
        }
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Token counters reported by a provider for one call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    /// Prompt tokens consumed
    pub input_tokens: u64,
    /// Completion tokens produced
    pub output_tokens: u64,
    /// Prompt tokens served from the provider's cache
    pub cached_tokens: u64,
    /// Reasoning tokens, for models that report them
    pub reasoning_tokens: u64,
}

impl TokenUsage {
    /// Accumulate another call's counters into this one
    pub fn add(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.cached_tokens += other.cached_tokens;
        self.reasoning_tokens += other.reasoning_tokens;
    }
}

/// One chat completion response, provider-agnostic
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Completion text
    pub text: String,
    /// Token counters, zeroed when the provider reports none
    pub usage: TokenUsage,
}

/// Common trait for all LLM providers
///
/// This trait defines the interface every provider client implements,
/// allowing the translation core to dispatch to them interchangeably.
/// Retry and timeout policy live in the caller; a provider performs exactly
/// one attempt per `complete` call.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Complete a single chat request
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError>;

    /// Provider name used in logs and error messages
    fn name(&self) -> &str;
}

pub mod mock;
pub mod openai;

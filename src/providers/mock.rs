/*!
 * Mock provider for testing.
 *
 * The mock is scripted per call: a behavior closure receives the call index
 * and the request, and returns the reply text or an error plus an artificial
 * delay. `MockProvider::echo()` answers every request with its own user
 * content, which for chunk payloads is exactly an identity translation.
 */

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::ProviderError;

use super::{ChatRequest, ChatResponse, Provider, TokenUsage};

/// Scripted outcome of one mock call
pub struct MockReply {
    /// Artificial latency before the reply is produced
    pub delay_ms: u64,
    /// Reply text or provider error
    pub result: Result<String, ProviderError>,
}

impl MockReply {
    /// Immediate successful reply
    pub fn text(text: impl Into<String>) -> Self {
        MockReply {
            delay_ms: 0,
            result: Ok(text.into()),
        }
    }

    /// Immediate failure
    pub fn error(error: ProviderError) -> Self {
        MockReply {
            delay_ms: 0,
            result: Err(error),
        }
    }

    /// Add latency to this reply
    pub fn after_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

type BehaviorFn = dyn Fn(usize, &ChatRequest) -> MockReply + Send + Sync;

/// Scriptable in-process provider
pub struct MockProvider {
    behavior: Arc<BehaviorFn>,
    calls: AtomicUsize,
}

impl fmt::Debug for MockProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockProvider")
            .field("calls", &self.calls.load(Ordering::SeqCst))
            .finish()
    }
}

impl MockProvider {
    /// Create a mock with a custom behavior closure.
    ///
    /// The closure receives the zero-based call index, so scripts like
    /// "fail twice then succeed" are one match away.
    pub fn new(behavior: impl Fn(usize, &ChatRequest) -> MockReply + Send + Sync + 'static) -> Self {
        MockProvider {
            behavior: Arc::new(behavior),
            calls: AtomicUsize::new(0),
        }
    }

    /// Mock that echoes the user content back — an identity translation
    pub fn echo() -> Self {
        Self::new(|_, request| MockReply::text(request.user.clone()))
    }

    /// Mock that always fails with a connection error
    pub fn failing() -> Self {
        Self::new(|_, _| {
            MockReply::error(ProviderError::ConnectionError("mock outage".to_string()))
        })
    }

    /// Number of completed `complete` calls so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = (self.behavior)(index, &request);
        if reply.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(reply.delay_ms)).await;
        }
        let text = reply.result?;
        let usage = TokenUsage {
            input_tokens: request.user.chars().count() as u64,
            output_tokens: text.chars().count() as u64,
            cached_tokens: 0,
            reasoning_tokens: 0,
        };
        Ok(ChatResponse { text, usage })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

//! Mock AI provider for tests and offline development.
//!
//! Replies are queued up front and consumed in order; once the queue is
//! empty a default reply is returned. Every request is recorded so tests can
//! assert on the history and system prompt that reached the provider.
//!
//! # Example
//!
//! ```ignore
//! let provider = MockAIProvider::new(ProviderKind::Google)
//!     .with_response("Hello, I'm the assistant!")
//!     .with_error(MockError::RateLimited { retry_after_secs: 5 });
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::domain::chat::ProviderKind;
use crate::ports::{
    AIError, AIProvider, CompletionRequest, CompletionResponse, FinishReason, TokenUsage,
};

#[derive(Debug, Clone)]
pub struct MockAIProvider {
    kind: ProviderKind,
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    calls: Arc<Mutex<Vec<CompletionRequest>>>,
}

#[derive(Debug, Clone)]
pub enum MockResponse {
    Success {
        content: String,
        prompt_tokens: u32,
        completion_tokens: u32,
        finish_reason: FinishReason,
    },
    Error(MockError),
}

/// Cloneable stand-ins for `AIError`.
#[derive(Debug, Clone)]
pub enum MockError {
    RateLimited { retry_after_secs: u32 },
    ContentFiltered { reason: String },
    Unavailable { message: String },
    AuthenticationFailed,
    Network { message: String },
    Timeout { timeout_secs: u32 },
}

impl From<MockError> for AIError {
    fn from(err: MockError) -> Self {
        match err {
            MockError::RateLimited { retry_after_secs } => AIError::rate_limited(retry_after_secs),
            MockError::ContentFiltered { reason } => AIError::content_filtered(reason),
            MockError::Unavailable { message } => AIError::unavailable(message),
            MockError::AuthenticationFailed => AIError::AuthenticationFailed,
            MockError::Network { message } => AIError::Network(message),
            MockError::Timeout { timeout_secs } => AIError::timeout(timeout_secs),
        }
    }
}

impl MockAIProvider {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            responses: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_response(self, content: impl Into<String>) -> Self {
        self.with_response_full(content, 10, 20, FinishReason::Stop)
    }

    pub fn with_response_full(
        self,
        content: impl Into<String>,
        prompt_tokens: u32,
        completion_tokens: u32,
        finish_reason: FinishReason,
    ) -> Self {
        self.responses.lock().unwrap().push_back(MockResponse::Success {
            content: content.into(),
            prompt_tokens,
            completion_tokens,
            finish_reason,
        });
        self
    }

    pub fn with_error(self, error: MockError) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(MockResponse::Error(error));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_call(&self) -> Option<CompletionRequest> {
        self.calls.lock().unwrap().last().cloned()
    }

    fn next_response(&self) -> MockResponse {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| MockResponse::Success {
                content: "Mock response".to_string(),
                prompt_tokens: 5,
                completion_tokens: 10,
                finish_reason: FinishReason::Stop,
            })
    }
}

#[async_trait]
impl AIProvider for MockAIProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError> {
        // Suspend once, like a network call, so joined requests overlap.
        tokio::task::yield_now().await;

        let model = request.model.clone();
        let pricing = request.pricing;
        self.calls.lock().unwrap().push(request);

        match self.next_response() {
            MockResponse::Success {
                content,
                prompt_tokens,
                completion_tokens,
                finish_reason,
            } => Ok(CompletionResponse {
                content,
                usage: TokenUsage::priced(prompt_tokens, completion_tokens, &pricing),
                model,
                finish_reason,
            }),
            MockResponse::Error(err) => Err(err.into()),
        }
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }
}

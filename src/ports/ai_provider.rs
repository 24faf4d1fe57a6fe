//! AI Provider Port - Interface for completion API integrations.
//!
//! Adapters translate a provider-neutral message list into one vendor's
//! request shape and report token usage with a cost estimate computed from
//! the pricing carried on the request.
//!
//! # Example
//!
//! ```ignore
//! let request = CompletionRequest::new("gemini-1.5-flash", api_key, pricing)
//!     .with_system_prompt("Be concise.")
//!     .with_message(MessageRole::User, "Hello");
//! let response = provider.complete(request).await?;
//! ```

use async_trait::async_trait;
use secrecy::Secret;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::catalog::ModelPricing;
use crate::domain::chat::{MessageRole, ProviderKind};

/// Port for completion providers.
#[async_trait]
pub trait AIProvider: Send + Sync {
    /// Generates a complete (non-streaming) response.
    ///
    /// # Errors
    ///
    /// - `RateLimited` when the provider throttles the key
    /// - `AuthenticationFailed` for a rejected key
    /// - `ContentFiltered` when the provider blocks the output
    /// - `Unavailable` / `Network` / `Timeout` for transport problems
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError>;

    fn kind(&self) -> ProviderKind;
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Provider-specific model identifier
    pub model: String,
    /// Conversation so far, oldest first
    pub messages: Vec<Message>,
    pub system_prompt: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Credential for this call
    pub api_key: Secret<String>,
    pub pricing: ModelPricing,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, api_key: Secret<String>, pricing: ModelPricing) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            system_prompt: None,
            max_tokens: None,
            temperature: None,
            api_key,
            pricing,
        }
    }

    pub fn with_message(mut self, role: MessageRole, content: impl Into<String>) -> Self {
        self.messages.push(Message::new(role, content));
        self
    }

    pub fn with_messages(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        self.messages.extend(messages);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    pub content: String,
    pub usage: TokenUsage,
    /// Model that actually served the request
    pub model: String,
    pub finish_reason: FinishReason,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub cost_usd: f64,
}

impl TokenUsage {
    /// Usage priced with `pricing`.
    pub fn priced(prompt_tokens: u32, completion_tokens: u32, pricing: &ModelPricing) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            cost_usd: pricing.cost(prompt_tokens, completion_tokens),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Other,
}

#[derive(Debug, thiserror::Error)]
pub enum AIError {
    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u32 },

    #[error("content filtered: {reason}")]
    ContentFiltered { reason: String },

    #[error("provider unavailable: {message}")]
    Unavailable { message: String },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u32 },

    #[error("no provider registered for {0}")]
    NotConfigured(ProviderKind),
}

impl AIError {
    pub fn rate_limited(retry_after_secs: u32) -> Self {
        Self::RateLimited { retry_after_secs }
    }

    pub fn content_filtered(reason: impl Into<String>) -> Self {
        Self::ContentFiltered {
            reason: reason.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn timeout(timeout_secs: u32) -> Self {
        Self::Timeout { timeout_secs }
    }

    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AIError::RateLimited { .. }
                | AIError::Unavailable { .. }
                | AIError::Network(_)
                | AIError::Timeout { .. }
        )
    }
}

/// Adapters keyed by provider.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn AIProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: Arc<dyn AIProvider>) -> Self {
        self.providers.insert(provider.kind(), provider);
        self
    }

    pub fn get(&self, kind: ProviderKind) -> Result<Arc<dyn AIProvider>, AIError> {
        self.providers
            .get(&kind)
            .cloned()
            .ok_or(AIError::NotConfigured(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    struct EchoProvider;

    #[async_trait]
    impl AIProvider for EchoProvider {
        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, AIError> {
            let last = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(CompletionResponse {
                content: last,
                usage: TokenUsage::priced(1, 1, &request.pricing),
                model: request.model,
                finish_reason: FinishReason::Stop,
            })
        }

        fn kind(&self) -> ProviderKind {
            ProviderKind::Google
        }
    }

    fn pricing() -> ModelPricing {
        ModelPricing::new(1.0, 2.0).unwrap()
    }

    #[test]
    fn builder_accumulates_messages() {
        let request = CompletionRequest::new("m", Secret::new("k".to_string()), pricing())
            .with_system_prompt("sys")
            .with_message(MessageRole::User, "one")
            .with_messages(vec![Message::new(MessageRole::Assistant, "two")])
            .with_max_tokens(100)
            .with_temperature(0.2);

        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.system_prompt.as_deref(), Some("sys"));
        assert_eq!(request.max_tokens, Some(100));
        assert_eq!(request.api_key.expose_secret(), "k");
    }

    #[test]
    fn priced_usage_totals_and_costs() {
        let usage = TokenUsage::priced(1_000_000, 500_000, &pricing());
        assert_eq!(usage.total_tokens, 1_500_000);
        assert!((usage.cost_usd - 2.0).abs() < 1e-9);
    }

    #[test]
    fn retryable_errors() {
        assert!(AIError::rate_limited(5).is_retryable());
        assert!(AIError::unavailable("503").is_retryable());
        assert!(AIError::Network("reset".into()).is_retryable());
        assert!(AIError::timeout(30).is_retryable());
        assert!(!AIError::AuthenticationFailed.is_retryable());
        assert!(!AIError::content_filtered("safety").is_retryable());
        assert!(!AIError::InvalidRequest("bad".into()).is_retryable());
    }

    #[tokio::test]
    async fn registry_dispatches_by_kind() {
        let registry = ProviderRegistry::new().with(Arc::new(EchoProvider));

        let provider = registry.get(ProviderKind::Google).unwrap();
        let response = provider
            .complete(
                CompletionRequest::new("gemini", Secret::new("k".into()), pricing())
                    .with_message(MessageRole::User, "ping"),
            )
            .await
            .unwrap();
        assert_eq!(response.content, "ping");

        assert!(matches!(
            registry.get(ProviderKind::OpenRouter),
            Err(AIError::NotConfigured(ProviderKind::OpenRouter))
        ));
    }
}

//! AI Provider Adapters.
//!
//! Implementations of the AIProvider port:
//!
//! - `GoogleProvider` - Google AI Studio (Gemini `generateContent`)
//! - `OpenRouterProvider` - OpenRouter's OpenAI-compatible endpoint
//! - `MockAIProvider` - Queued replies for tests and offline use
//!
//! Both HTTP adapters share status mapping and retry with backoff from
//! `http`.

mod google_provider;
mod http;
mod mock_provider;
mod openrouter_provider;

pub use google_provider::GoogleProvider;
pub use http::HttpSettings;
pub use mock_provider::{MockAIProvider, MockError, MockResponse};
pub use openrouter_provider::OpenRouterProvider;

use crate::config::AiConfig;
use crate::ports::{AIError, ProviderRegistry};
use std::sync::Arc;

/// Registry holding both HTTP providers configured from `config`.
pub fn registry_from_config(config: &AiConfig) -> Result<ProviderRegistry, AIError> {
    Ok(ProviderRegistry::new()
        .with(Arc::new(GoogleProvider::from_config(config)?))
        .with(Arc::new(OpenRouterProvider::from_config(config)?)))
}

#[cfg(test)]
pub(crate) mod test_server {
    use axum::Router;
    use tokio::net::TcpListener;

    /// Serves `router` on an ephemeral local port and returns its base URL.
    pub async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }
}

//! OpenRouter provider.
//!
//! OpenRouter speaks the OpenAI chat completions protocol. Requests carry
//! the app's URL and name in `HTTP-Referer` / `X-Title` so usage shows up
//! under the app on openrouter.ai.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::config::AiConfig;
use crate::domain::chat::{estimate_tokens, ProviderKind};
use crate::ports::{
    AIError, AIProvider, CompletionRequest, CompletionResponse, FinishReason, TokenUsage,
};

use super::http::{check_status, send_error, with_retries, HttpSettings};

pub struct OpenRouterProvider {
    settings: HttpSettings,
    client: Client,
    app_url: String,
    app_name: String,
}

impl OpenRouterProvider {
    pub fn new(
        settings: HttpSettings,
        app_url: impl Into<String>,
        app_name: impl Into<String>,
    ) -> Result<Self, AIError> {
        let client = settings.build_client()?;
        Ok(Self {
            settings,
            client,
            app_url: app_url.into(),
            app_name: app_name.into(),
        })
    }

    pub fn from_config(config: &AiConfig) -> Result<Self, AIError> {
        Self::new(
            HttpSettings::new(&config.openrouter_base_url)
                .with_timeout(config.timeout())
                .with_max_retries(config.max_retries),
            &config.app_url,
            &config.app_name,
        )
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.settings.base_url)
    }

    async fn attempt(&self, request: &CompletionRequest) -> Result<CompletionResponse, AIError> {
        let body = to_chat_request(request);

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(request.api_key.expose_secret())
            .header("HTTP-Referer", &self.app_url)
            .header("X-Title", &self.app_name)
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(e, &self.settings))?;

        let response = check_status(response).await?;
        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AIError::Parse(format!("failed to parse OpenRouter response: {}", e)))?;

        from_chat_response(parsed, request)
    }
}

#[async_trait]
impl AIProvider for OpenRouterProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError> {
        with_retries(&self.settings, "openrouter", || self.attempt(&request)).await
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenRouter
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Wire types
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
    /// OpenRouter reports some upstream failures in a 200 body.
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: String,
}

fn to_chat_request(request: &CompletionRequest) -> ChatRequest {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);

    if let Some(prompt) = &request.system_prompt {
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: Some(prompt.clone()),
        });
    }

    for message in &request.messages {
        messages.push(ChatMessage {
            role: message.role.as_str().to_string(),
            content: Some(message.content.clone()),
        });
    }

    ChatRequest {
        model: request.model.clone(),
        messages,
        max_tokens: request.max_tokens,
        temperature: request.temperature,
    }
}

fn finish_reason(raw: Option<&str>) -> FinishReason {
    match raw {
        Some("stop") | None => FinishReason::Stop,
        Some("length") => FinishReason::Length,
        Some("content_filter") => FinishReason::ContentFilter,
        Some(_) => FinishReason::Other,
    }
}

fn from_chat_response(
    response: ChatResponse,
    request: &CompletionRequest,
) -> Result<CompletionResponse, AIError> {
    if let Some(error) = response.error {
        return Err(super::http::status_error(
            error.code.unwrap_or(502),
            None,
            error.message,
        ));
    }

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AIError::Parse("no choices in OpenRouter response".into()))?;

    let content = choice.message.content.unwrap_or_default();
    let finish = finish_reason(choice.finish_reason.as_deref());

    if content.is_empty() && finish == FinishReason::ContentFilter {
        return Err(AIError::content_filtered("content_filter"));
    }

    let (prompt_tokens, completion_tokens) = match response.usage {
        Some(usage) => (usage.prompt_tokens, usage.completion_tokens),
        None => {
            let prompt: u32 = request.messages.iter().map(|m| estimate_tokens(&m.content)).sum();
            (prompt, estimate_tokens(&content))
        }
    };

    Ok(CompletionResponse {
        content,
        usage: TokenUsage::priced(prompt_tokens, completion_tokens, &request.pricing),
        model: response.model.unwrap_or_else(|| request.model.clone()),
        finish_reason: finish,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::test_server::serve;
    use crate::domain::catalog::ModelPricing;
    use crate::domain::chat::MessageRole;
    use axum::{
        http::{HeaderMap, StatusCode},
        response::IntoResponse,
        routing::post,
        Json, Router,
    };
    use secrecy::Secret;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn request() -> CompletionRequest {
        CompletionRequest::new(
            "openai/gpt-4o-mini",
            Secret::new("or-key".to_string()),
            ModelPricing::new(0.15, 0.6).unwrap(),
        )
        .with_system_prompt("Be brief.")
        .with_message(MessageRole::User, "Hi")
        .with_max_tokens(128)
    }

    fn parse(value: Value) -> ChatResponse {
        serde_json::from_value(value).unwrap()
    }

    fn provider(base: String, retries: u32) -> OpenRouterProvider {
        OpenRouterProvider::new(
            HttpSettings::new(base)
                .with_max_retries(retries)
                .with_backoff_base(Duration::from_millis(1)),
            "https://chat.example.com",
            "Chat Portal",
        )
        .unwrap()
    }

    #[test]
    fn request_prepends_system_prompt() {
        let body = serde_json::to_value(to_chat_request(&request())).unwrap();

        assert_eq!(body["model"], "openai/gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Hi");
        assert_eq!(body["max_tokens"], 128);
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn response_is_priced_from_request_pricing() {
        let response = parse(json!({
            "model": "openai/gpt-4o-mini-2024-07-18",
            "choices": [{
                "message": {"role": "assistant", "content": "Hello"},
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": 2000000,
                "completion_tokens": 1000000,
                "total_tokens": 3000000
            }
        }));

        let completion = from_chat_response(response, &request()).unwrap();
        assert_eq!(completion.content, "Hello");
        assert_eq!(completion.model, "openai/gpt-4o-mini-2024-07-18");
        assert_eq!(completion.usage.total_tokens, 3_000_000);
        assert!((completion.usage.cost_usd - 0.9).abs() < 1e-9);
    }

    #[test]
    fn finish_reasons() {
        assert_eq!(finish_reason(Some("length")), FinishReason::Length);
        assert_eq!(finish_reason(Some("tool_calls")), FinishReason::Other);
        assert_eq!(finish_reason(None), FinishReason::Stop);
    }

    #[test]
    fn error_in_ok_body_is_mapped() {
        let response = parse(json!({"error": {"code": 429, "message": "slow down"}}));
        assert!(matches!(
            from_chat_response(response, &request()),
            Err(AIError::RateLimited { retry_after_secs: 30 })
        ));
    }

    #[test]
    fn empty_choices_is_a_parse_error() {
        let response = parse(json!({"choices": []}));
        assert!(matches!(from_chat_response(response, &request()), Err(AIError::Parse(_))));
    }

    #[tokio::test]
    async fn sends_auth_and_app_headers() {
        let router = Router::new().route(
            "/chat/completions",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(headers.get("authorization").unwrap(), "Bearer or-key");
                assert_eq!(headers.get("http-referer").unwrap(), "https://chat.example.com");
                assert_eq!(headers.get("x-title").unwrap(), "Chat Portal");
                assert_eq!(body["messages"][1]["content"], "Hi");
                Json(json!({
                    "choices": [{
                        "message": {"role": "assistant", "content": "Hey"},
                        "finish_reason": "stop"
                    }],
                    "usage": {"prompt_tokens": 5, "completion_tokens": 1}
                }))
            }),
        );
        let base = serve(router).await;

        let completion = provider(base, 0).complete(request()).await.unwrap();
        assert_eq!(completion.content, "Hey");
        assert_eq!(completion.usage.prompt_tokens, 5);
    }

    #[tokio::test]
    async fn retries_server_errors() {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/chat/completions",
            post(move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        (StatusCode::SERVICE_UNAVAILABLE, "busy").into_response()
                    } else {
                        Json(json!({
                            "choices": [{
                                "message": {"role": "assistant", "content": "ok"},
                                "finish_reason": "stop"
                            }]
                        }))
                        .into_response()
                    }
                }
            }),
        );
        let base = serve(router).await;

        let completion = provider(base, 2).complete(request()).await.unwrap();
        assert_eq!(completion.content, "ok");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn rate_limit_uses_retry_after_header() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, [("retry-after", "12")], "limited") }),
        );
        let base = serve(router).await;

        assert!(matches!(
            provider(base, 0).complete(request()).await,
            Err(AIError::RateLimited { retry_after_secs: 12 })
        ));
    }
}

//! Google AI Studio (Gemini) provider.
//!
//! Calls `POST {base}/v1beta/models/{model}:generateContent` with the key in
//! the `x-goog-api-key` header. The model is percent-encoded as a single
//! path segment. Gemini has no system role inside `contents`,
//! so system messages are folded into `systemInstruction`, and assistant
//! turns use the `model` role.

use async_trait::async_trait;
use reqwest::{Client, Url};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::config::AiConfig;
use crate::domain::chat::{estimate_tokens, MessageRole, ProviderKind};
use crate::ports::{
    AIError, AIProvider, CompletionRequest, CompletionResponse, FinishReason, TokenUsage,
};

use super::http::{check_status, send_error, with_retries, HttpSettings};

pub struct GoogleProvider {
    settings: HttpSettings,
    client: Client,
}

impl GoogleProvider {
    pub fn new(settings: HttpSettings) -> Result<Self, AIError> {
        let client = settings.build_client()?;
        Ok(Self { settings, client })
    }

    pub fn from_config(config: &AiConfig) -> Result<Self, AIError> {
        Self::new(
            HttpSettings::new(&config.google_base_url)
                .with_timeout(config.timeout())
                .with_max_retries(config.max_retries),
        )
    }

    fn endpoint(&self, model: &str) -> Result<Url, AIError> {
        let invalid = || {
            AIError::InvalidRequest(format!("bad Google base URL: {}", self.settings.base_url))
        };
        let mut url = Url::parse(&self.settings.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(["v1beta", "models", &format!("{}:generateContent", model)]);
        Ok(url)
    }

    async fn attempt(&self, request: &CompletionRequest) -> Result<CompletionResponse, AIError> {
        let body = to_gemini_request(request);

        let response = self
            .client
            .post(self.endpoint(&request.model)?)
            .header("x-goog-api-key", request.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(e, &self.settings))?;

        let response = check_status(response).await?;
        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| AIError::Parse(format!("failed to parse Gemini response: {}", e)))?;

        from_gemini_response(parsed, request)
    }
}

#[async_trait]
impl AIProvider for GoogleProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError> {
        with_retries(&self.settings, "google", || self.attempt(&request)).await
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Wire types
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<UsageMetadata>,
    prompt_feedback: Option<PromptFeedback>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

fn text_content(role: Option<&str>, text: &str) -> GeminiContent {
    GeminiContent {
        role: role.map(str::to_string),
        parts: vec![GeminiPart {
            text: text.to_string(),
        }],
    }
}

fn to_gemini_request(request: &CompletionRequest) -> GeminiRequest {
    let mut system_parts: Vec<&str> = request.system_prompt.iter().map(String::as_str).collect();
    let mut contents = Vec::with_capacity(request.messages.len());

    for message in &request.messages {
        match message.role {
            MessageRole::System => system_parts.push(&message.content),
            MessageRole::User => contents.push(text_content(Some("user"), &message.content)),
            MessageRole::Assistant => contents.push(text_content(Some("model"), &message.content)),
        }
    }

    let system_instruction = if system_parts.is_empty() {
        None
    } else {
        Some(text_content(None, &system_parts.join("\n\n")))
    };

    let generation_config = if request.max_tokens.is_some() || request.temperature.is_some() {
        Some(GenerationConfig {
            max_output_tokens: request.max_tokens,
            temperature: request.temperature,
        })
    } else {
        None
    };

    GeminiRequest {
        contents,
        system_instruction,
        generation_config,
    }
}

fn finish_reason(raw: Option<&str>) -> FinishReason {
    match raw {
        Some("STOP") | None => FinishReason::Stop,
        Some("MAX_TOKENS") => FinishReason::Length,
        Some("SAFETY") | Some("RECITATION") | Some("BLOCKLIST") | Some("PROHIBITED_CONTENT") => {
            FinishReason::ContentFilter
        }
        Some(_) => FinishReason::Other,
    }
}

fn from_gemini_response(
    response: GeminiResponse,
    request: &CompletionRequest,
) -> Result<CompletionResponse, AIError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .map(|r| format!("prompt blocked: {}", r));
        return match reason {
            Some(reason) => Err(AIError::content_filtered(reason)),
            None => Err(AIError::Parse("no candidates in Gemini response".into())),
        };
    };

    let content: String = candidate
        .content
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();
    let finish = finish_reason(candidate.finish_reason.as_deref());

    if content.is_empty() && finish == FinishReason::ContentFilter {
        return Err(AIError::content_filtered(
            candidate.finish_reason.unwrap_or_else(|| "SAFETY".to_string()),
        ));
    }

    let (prompt_tokens, completion_tokens) = match response.usage_metadata {
        Some(usage) => (usage.prompt_token_count, usage.candidates_token_count),
        None => {
            let prompt: u32 = request.messages.iter().map(|m| estimate_tokens(&m.content)).sum();
            (prompt, estimate_tokens(&content))
        }
    };

    Ok(CompletionResponse {
        content,
        usage: TokenUsage::priced(prompt_tokens, completion_tokens, &request.pricing),
        model: response.model_version.unwrap_or_else(|| request.model.clone()),
        finish_reason: finish,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::test_server::serve;
    use crate::domain::catalog::ModelPricing;
    use axum::{http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use secrecy::Secret;
    use serde_json::{json, Value};
    use std::time::Duration;

    fn request() -> CompletionRequest {
        CompletionRequest::new(
            "gemini-1.5-flash",
            Secret::new("g-key".to_string()),
            ModelPricing::new(1.0, 2.0).unwrap(),
        )
        .with_system_prompt("Be brief.")
        .with_message(MessageRole::User, "Hi")
        .with_message(MessageRole::Assistant, "Hello!")
        .with_message(MessageRole::User, "How are you?")
        .with_max_tokens(256)
        .with_temperature(0.5)
    }

    fn parse(value: Value) -> GeminiResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn request_maps_roles_and_system_instruction() {
        let body = serde_json::to_value(to_gemini_request(&request())).unwrap();

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be brief.");
        assert!(body["systemInstruction"].get("role").is_none());
        assert_eq!(body["contents"].as_array().unwrap().len(), 3);
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][2]["parts"][0]["text"], "How are you?");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 256);
    }

    #[test]
    fn system_messages_in_history_join_the_instruction() {
        let pricing = ModelPricing::new(0.0, 0.0).unwrap();
        let req = CompletionRequest::new("m", Secret::new("k".into()), pricing)
            .with_message(MessageRole::System, "Rule two.")
            .with_message(MessageRole::User, "Go");
        let body = serde_json::to_value(to_gemini_request(&req)).unwrap();

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Rule two.");
        assert_eq!(body["contents"].as_array().unwrap().len(), 1);
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn response_concatenates_parts_and_prices_usage() {
        let response = parse(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Fine, "}, {"text": "thanks."}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 1000000, "candidatesTokenCount": 500000},
            "modelVersion": "gemini-1.5-flash-002"
        }));

        let completion = from_gemini_response(response, &request()).unwrap();
        assert_eq!(completion.content, "Fine, thanks.");
        assert_eq!(completion.finish_reason, FinishReason::Stop);
        assert_eq!(completion.model, "gemini-1.5-flash-002");
        assert_eq!(completion.usage.total_tokens, 1_500_000);
        assert!((completion.usage.cost_usd - 2.0).abs() < 1e-9);
    }

    #[test]
    fn max_tokens_maps_to_length() {
        let response = parse(json!({
            "candidates": [{"content": {"parts": [{"text": "cut"}]}, "finishReason": "MAX_TOKENS"}]
        }));
        let completion = from_gemini_response(response, &request()).unwrap();
        assert_eq!(completion.finish_reason, FinishReason::Length);
        assert_eq!(completion.model, "gemini-1.5-flash");
    }

    #[test]
    fn safety_block_without_text_is_content_filtered() {
        let response = parse(json!({"candidates": [{"finishReason": "SAFETY"}]}));
        assert!(matches!(
            from_gemini_response(response, &request()),
            Err(AIError::ContentFiltered { .. })
        ));

        let blocked = parse(json!({"promptFeedback": {"blockReason": "SAFETY"}}));
        assert!(matches!(
            from_gemini_response(blocked, &request()),
            Err(AIError::ContentFiltered { .. })
        ));
    }

    #[test]
    fn missing_usage_is_estimated() {
        let response = parse(json!({
            "candidates": [{"content": {"parts": [{"text": "12345678"}]}, "finishReason": "STOP"}]
        }));
        let completion = from_gemini_response(response, &request()).unwrap();
        assert_eq!(completion.usage.completion_tokens, 2);
        assert!(completion.usage.prompt_tokens > 0);
    }

    #[test]
    fn model_is_a_single_escaped_path_segment() {
        let provider = GoogleProvider::new(HttpSettings::new("https://example.test/")).unwrap();

        let url = provider.endpoint("gemini-1.5-flash").unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.test/v1beta/models/gemini-1.5-flash:generateContent"
        );

        let url = provider.endpoint("../files?key=x#frag").unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.test/v1beta/models/..%2Ffiles%3Fkey=x%23frag:generateContent"
        );
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[tokio::test]
    async fn calls_generate_content_endpoint() {
        let router = Router::new().route(
            "/v1beta/models/:model_action",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(headers.get("x-goog-api-key").unwrap(), "g-key");
                assert_eq!(body["contents"][0]["parts"][0]["text"], "Hi");
                Json(json!({
                    "candidates": [{
                        "content": {"parts": [{"text": "pong"}]},
                        "finishReason": "STOP"
                    }],
                    "usageMetadata": {"promptTokenCount": 3, "candidatesTokenCount": 1}
                }))
            }),
        );
        let base = serve(router).await;
        let provider = GoogleProvider::new(HttpSettings::new(base).with_max_retries(0)).unwrap();

        let completion = provider.complete(request()).await.unwrap();
        assert_eq!(completion.content, "pong");
        assert_eq!(completion.usage.prompt_tokens, 3);
    }

    #[tokio::test]
    async fn upstream_errors_are_mapped() {
        let router = Router::new().route(
            "/v1beta/models/:model_action",
            post(|| async { (StatusCode::FORBIDDEN, "API key not valid") }),
        );
        let base = serve(router).await;
        let provider = GoogleProvider::new(
            HttpSettings::new(base)
                .with_max_retries(2)
                .with_backoff_base(Duration::from_millis(1)),
        )
        .unwrap();

        assert!(matches!(
            provider.complete(request()).await,
            Err(AIError::AuthenticationFailed)
        ));
    }
}

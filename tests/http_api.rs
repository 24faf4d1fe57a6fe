//! End-to-end tests for the HTTP API.
//!
//! The full router runs against in-memory stores, a token-table session
//! validator and queued AI replies, exercising the same middleware stack
//! the binary serves.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use hmac::{Hmac, Mac};
use secrecy::Secret;
use serde_json::{json, Value};
use sha2::Sha256;
use std::sync::Arc;
use tower::ServiceExt;

use chat_portal::adapters::ai::{MockAIProvider, MockError};
use chat_portal::adapters::auth::MockSessionValidator;
use chat_portal::adapters::http::{api_router, AppState};
use chat_portal::adapters::memory::{
    InMemoryAnalyticsReader, InMemoryApiKeyRepository, InMemoryBillingRepository,
    InMemoryConversationRepository, InMemoryModelRegistry, InMemorySettingRepository,
    InMemoryUsageRepository, InMemoryUserRepository,
};
use chat_portal::adapters::rate_limiter::InMemoryRateLimiter;
use chat_portal::config::{AiConfig, LimitsConfig, ServerConfig};
use chat_portal::domain::account::User;
use chat_portal::domain::chat::ProviderKind;
use chat_portal::domain::foundation::{UserId, UserRole};
use chat_portal::ports::{ProviderRegistry, UserRepository};

const WEBHOOK_SECRET: &str = "whsec_integration";

// =============================================================================
// Test Infrastructure
// =============================================================================

struct TestApp {
    router: Router,
    users: InMemoryUserRepository,
    validator: Arc<MockSessionValidator>,
    google: MockAIProvider,
}

impl TestApp {
    fn new() -> Self {
        let users = InMemoryUserRepository::new();
        let conversations = InMemoryConversationRepository::new();
        let usage = InMemoryUsageRepository::new();
        let validator = Arc::new(MockSessionValidator::new());
        let google = MockAIProvider::new(ProviderKind::Google);

        let state = AppState {
            users: Arc::new(users.clone()),
            conversations: Arc::new(conversations.clone()),
            usage: Arc::new(usage.clone()),
            models: Arc::new(InMemoryModelRegistry::new()),
            api_keys: Arc::new(InMemoryApiKeyRepository::new()),
            settings: Arc::new(InMemorySettingRepository::new()),
            billing: Arc::new(InMemoryBillingRepository::new()),
            analytics: Arc::new(InMemoryAnalyticsReader::new(users.clone(), conversations, usage)),
            providers: ProviderRegistry::new().with(Arc::new(google.clone())),
            session_validator: validator.clone(),
            rate_limiter: Arc::new(InMemoryRateLimiter::with_defaults()),
            ai: Arc::new(AiConfig {
                google_api_key: Some(Secret::new("config-google-key".to_string())),
                ..AiConfig::default()
            }),
            limits: LimitsConfig::default(),
            webhook_secret: Some(WEBHOOK_SECRET.to_string()),
        };

        Self {
            router: api_router(state, &ServerConfig::default()),
            users,
            validator,
            google,
        }
    }

    async fn user(&self, email: &str, role: UserRole) -> (UserId, String) {
        let user = User::new(email, None, role).unwrap();
        self.users.create(&user).await.unwrap();
        let token = format!("token-{}", user.id);
        self.validator.add_token(token.clone(), user.id);
        (user.id, token)
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str, token: &str) -> Response {
        self.send(
            Request::builder()
                .uri(uri)
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    async fn json(&self, method: &str, uri: &str, token: &str, body: Value) -> Response {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("Authorization", format!("Bearer {}", token))
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn webhook(&self, event_id: &str, event_type: &str, object: Value) -> Response {
        let payload = json!({
            "id": event_id,
            "type": event_type,
            "created": chrono::Utc::now().timestamp(),
            "data": { "object": object },
        })
        .to_string();
        let signature = sign(&payload);

        self.send(
            Request::builder()
                .method("POST")
                .uri("/api/billing/webhook")
                .header("Stripe-Signature", signature)
                .header("Content-Type", "application/json")
                .body(Body::from(payload))
                .unwrap(),
        )
        .await
    }
}

fn sign(payload: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    let mut mac = Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()).unwrap();
    mac.update(format!("{}.{}", timestamp, payload).as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

async fn body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// =============================================================================
// Chat
// =============================================================================

#[tokio::test]
async fn conversation_continues_and_stays_private() {
    let app = TestApp::new();
    let (_, alice) = app.user("alice@example.com", UserRole::User).await;
    let (_, bob) = app.user("bob@example.com", UserRole::User).await;

    let first = app.json("POST", "/api/chat", &alice, json!({ "content": "Hello" })).await;
    assert_eq!(first.status(), StatusCode::CREATED);
    let conversation_id = body(first).await["conversation_id"].as_str().unwrap().to_string();

    let follow_up = app
        .json(
            "POST",
            "/api/chat",
            &alice,
            json!({ "conversation_id": conversation_id, "content": "And again" }),
        )
        .await;
    assert_eq!(follow_up.status(), StatusCode::OK);

    let detail = app.get(&format!("/api/conversations/{}", conversation_id), &alice).await;
    assert_eq!(detail.status(), StatusCode::OK);
    assert_eq!(body(detail).await["messages"].as_array().unwrap().len(), 4);

    let stranger = app.get(&format!("/api/conversations/{}", conversation_id), &bob).await;
    assert_eq!(stranger.status(), StatusCode::NOT_FOUND);

    let renamed = app
        .json(
            "PATCH",
            &format!("/api/conversations/{}", conversation_id),
            &alice,
            json!({ "title": "Greetings" }),
        )
        .await;
    assert_eq!(renamed.status(), StatusCode::OK);

    let deleted = app
        .send(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/conversations/{}", conversation_id))
                .header("Authorization", format!("Bearer {}", alice))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn daily_limit_set_by_admin_is_enforced() {
    let app = TestApp::new();
    let (_, admin) = app.user("admin@example.com", UserRole::Admin).await;
    let (_, member) = app.user("member@example.com", UserRole::User).await;

    let set = app
        .json("PUT", "/api/admin/settings/daily_message_limit", &admin, json!({ "value": "2" }))
        .await;
    assert_eq!(set.status(), StatusCode::OK);

    for _ in 0..2 {
        let sent = app.json("POST", "/api/chat", &member, json!({ "content": "hi" })).await;
        assert!(sent.status().is_success());
    }

    let blocked = app.json("POST", "/api/chat", &member, json!({ "content": "hi" })).await;
    assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);
    let error = body(blocked).await;
    assert_eq!(error["code"], "DAILY_LIMIT_REACHED");
    assert_eq!(error["details"]["limit"], 2);

    let account = body(app.get("/api/me", &member).await).await;
    assert_eq!(account["quota"]["used"], 2);
}

#[tokio::test]
async fn provider_failure_is_a_bad_gateway() {
    let app = TestApp::new();
    let (_, member) = app.user("member@example.com", UserRole::User).await;
    let _ = app.google.clone().with_error(MockError::Network {
        message: "connection reset".into(),
    });

    let response = app.json("POST", "/api/chat", &member, json!({ "content": "hi" })).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let error = body(response).await;
    assert_eq!(error["code"], "PROVIDER_ERROR");
    assert!(!error["error"].as_str().unwrap().contains("connection reset"));
}

// =============================================================================
// Administration
// =============================================================================

#[tokio::test]
async fn admin_cannot_delete_self_but_can_disable_others() {
    let app = TestApp::new();
    let (admin_id, admin) = app.user("admin@example.com", UserRole::Admin).await;
    let (member_id, member) = app.user("member@example.com", UserRole::User).await;

    let own = app
        .send(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/admin/users/{}", admin_id))
                .header("Authorization", format!("Bearer {}", admin))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(own.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(own).await["code"], "SELF_MODIFICATION");

    let disabled = app
        .json(
            "PATCH",
            &format!("/api/admin/users/{}", member_id),
            &admin,
            json!({ "is_active": false }),
        )
        .await;
    assert_eq!(disabled.status(), StatusCode::OK);

    let locked_out = app.get("/api/me", &member).await;
    assert_eq!(locked_out.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn api_keys_never_expose_secrets() {
    let app = TestApp::new();
    let (_, admin) = app.user("admin@example.com", UserRole::Admin).await;

    let created = app
        .json(
            "POST",
            "/api/admin/api-keys",
            &admin,
            json!({ "provider": "google", "name": "primary", "secret": "AIzaSuperSecretValue" }),
        )
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let text = body(created).await.to_string();
    assert!(!text.contains("AIzaSuperSecretValue"));

    let listed = body(app.get("/api/admin/api-keys?provider=google", &admin).await).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

// =============================================================================
// Billing
// =============================================================================

#[tokio::test]
async fn credit_checkout_webhook_is_applied_once() {
    let app = TestApp::new();
    let (user_id, member) = app.user("buyer@example.com", UserRole::User).await;
    let session = json!({
        "id": "cs_credit_1",
        "object": "checkout.session",
        "amount_total": 500,
        "currency": "usd",
        "metadata": { "user_id": user_id.to_string(), "credits": "100" }
    });

    let first = app.webhook("evt_1", "checkout.session.completed", session.clone()).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(body(first).await["received"], true);

    let replay = app.webhook("evt_1", "checkout.session.completed", session).await;
    assert_eq!(replay.status(), StatusCode::OK);

    let credits = body(app.get("/api/billing/credits", &member).await).await;
    assert_eq!(credits["balance"], 100);

    let history = body(app.get("/api/billing/transactions", &member).await).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn forged_webhook_is_rejected() {
    let app = TestApp::new();
    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/api/billing/webhook")
                .header("Stripe-Signature", "t=1,v1=deadbeef")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

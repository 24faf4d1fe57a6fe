//! Assembles the full HTTP surface.

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use super::admin::admin_routes;
use super::billing::billing_routes;
use super::chat::chat_routes;
use super::error::ApiError;
use super::middleware::{auth_middleware, rate_limit_middleware};
use super::state::AppState;
use crate::config::ServerConfig;

/// # Routes
///
/// - `GET /health` - Liveness, outside auth and rate limiting
/// - `/api/...` - Chat, conversations and account
/// - `/api/billing/...` - Plans, credits and the Stripe webhook
/// - `/api/admin/...` - Back office, admin role required
///
/// Authentication runs before the general rate limit so signed-in users
/// are limited per account rather than per address.
pub fn api_router(state: AppState, server: &ServerConfig) -> Router {
    let api = Router::new()
        .nest("/api", chat_routes(&state))
        .nest("/api/billing", billing_routes())
        .nest("/api/admin", admin_routes())
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.auth_state(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .fallback(not_found)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(server.request_timeout()))
        .layer(cors_layer(&server.cors_origins_list()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Route not found")
}

/// Without configured origins any origin is allowed.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origins.is_empty() {
        return layer.allow_origin(AllowOrigin::any());
    }

    let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}

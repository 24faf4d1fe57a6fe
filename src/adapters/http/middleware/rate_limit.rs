//! Rate limiting middleware for axum.
//!
//! Requests are keyed by user when the auth middleware attached one, by
//! client IP otherwise. The chat send route stacks a stricter per-user
//! `chat` resource limit on top.
//!
//! Rate limit status is returned in standard HTTP headers:
//! - `X-RateLimit-Limit`: Maximum requests allowed in the window
//! - `X-RateLimit-Remaining`: Requests remaining in the current window
//! - `X-RateLimit-Reset`: Unix timestamp when the window resets
//! - `Retry-After`: Seconds to wait (only on 429 response)
//!
//! A failing backend lets requests through and logs a warning.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::adapters::http::error::ApiError;
use crate::adapters::rate_limiter::CHAT_RESOURCE;
use crate::domain::foundation::AuthenticatedUser;
use crate::ports::{RateLimitDenied, RateLimitKey, RateLimitResult, RateLimitStatus, RateLimiter};

/// Rate limiter middleware state.
pub type RateLimiterState = Arc<dyn RateLimiter>;

/// Standard rate limit header names.
pub mod headers {
    use super::HeaderName;

    pub static X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
    pub static X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
    pub static X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");
}

/// General request limit, per user or per client IP.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiterState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let key = match request.extensions().get::<AuthenticatedUser>() {
        Some(user) => Some(RateLimitKey::user(&user.id)),
        None => extract_client_ip(&request, connect_info.as_ref()).map(|ip| RateLimitKey::ip(&ip)),
    };
    let Some(key) = key else {
        return next.run(request).await;
    };

    limited(limiter.as_ref(), key, request, next).await
}

/// Per-user limit on the chat send route. Anonymous requests pass through
/// to be rejected by the handler's auth extractor.
pub async fn chat_rate_limit_middleware(
    State(limiter): State<RateLimiterState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(user) = request.extensions().get::<AuthenticatedUser>() else {
        return next.run(request).await;
    };
    let key = RateLimitKey::user(&user.id).with_resource(CHAT_RESOURCE);

    limited(limiter.as_ref(), key, request, next).await
}

async fn limited(
    limiter: &dyn RateLimiter,
    key: RateLimitKey,
    request: Request,
    next: Next,
) -> Response {
    let status = match limiter.check(key.clone()).await {
        Ok(RateLimitResult::Allowed(status)) => Some(status),
        Ok(RateLimitResult::Denied(denied)) => {
            tracing::debug!(
                key = %key.storage_key(),
                retry_after = denied.retry_after_secs,
                "rate limited"
            );
            return rate_limit_response(&denied);
        }
        Err(e) => {
            tracing::warn!(error = %e, "rate limiter unavailable");
            None
        }
    };

    let mut response = next.run(request).await;
    if let Some(status) = status {
        add_rate_limit_headers(&mut response, &status);
    }
    response
}

/// Extract client IP from request, checking forwarded headers first.
///
/// Order of precedence:
/// 1. X-Forwarded-For header (first IP in list)
/// 2. X-Real-IP header
/// 3. ConnectInfo socket address
fn extract_client_ip<B>(
    request: &axum::http::Request<B>,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
) -> Option<String> {
    let header = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(first) = header("X-Forwarded-For").and_then(|f| f.split(',').next()) {
        return Some(first.trim().to_string());
    }
    if let Some(real_ip) = header("X-Real-IP") {
        return Some(real_ip.to_string());
    }
    connect_info.map(|ci| ci.0.ip().to_string())
}

/// 429 Too Many Requests with `Retry-After` and limit headers.
fn rate_limit_response(denied: &RateLimitDenied) -> Response {
    let mut response = ApiError::new(
        StatusCode::TOO_MANY_REQUESTS,
        "RATE_LIMIT_EXCEEDED",
        denied.message.clone(),
    )
    .with_details(serde_json::json!({ "retry_after_secs": denied.retry_after_secs }))
    .retry_after(denied.retry_after_secs)
    .into_response();

    let headers = response.headers_mut();
    headers.insert(headers::X_RATELIMIT_LIMIT.clone(), HeaderValue::from(denied.limit));
    headers.insert(headers::X_RATELIMIT_REMAINING.clone(), HeaderValue::from(0u32));
    headers.insert(
        headers::X_RATELIMIT_RESET.clone(),
        HeaderValue::from(denied.reset_at.as_unix_secs()),
    );
    response
}

fn add_rate_limit_headers(response: &mut Response, status: &RateLimitStatus) {
    let headers = response.headers_mut();
    headers.insert(headers::X_RATELIMIT_LIMIT.clone(), HeaderValue::from(status.limit));
    headers.insert(headers::X_RATELIMIT_REMAINING.clone(), HeaderValue::from(status.remaining));
    headers.insert(
        headers::X_RATELIMIT_RESET.clone(),
        HeaderValue::from(status.reset_at.as_unix_secs()),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::rate_limiter::{InMemoryRateLimiter, RateLimitConfig};
    use crate::domain::foundation::{UserId, UserRole};
    use crate::ports::RateLimitError;
    use async_trait::async_trait;
    use axum::{body::Body, middleware, routing::get, Router};
    use std::collections::HashMap;
    use tower::ServiceExt;

    fn limiter(general: u32, chat: u32) -> RateLimiterState {
        let mut resources = HashMap::new();
        resources.insert(CHAT_RESOURCE.to_string(), chat);
        Arc::new(InMemoryRateLimiter::new(RateLimitConfig {
            window_secs: 60,
            requests_per_window: general,
            resources,
        }))
    }

    fn app(limiter: RateLimiterState) -> Router {
        Router::new()
            .route(
                "/chat",
                get(|| async { "sent" }).route_layer(middleware::from_fn_with_state(
                    limiter.clone(),
                    chat_rate_limit_middleware,
                )),
            )
            .route("/other", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
    }

    fn request(uri: &str, ip: &str, user: Option<&AuthenticatedUser>) -> axum::http::Request<Body> {
        let mut request = axum::http::Request::builder()
            .uri(uri)
            .header("X-Forwarded-For", ip)
            .body(Body::empty())
            .unwrap();
        if let Some(user) = user {
            request.extensions_mut().insert(user.clone());
        }
        request
    }

    struct BrokenLimiter;

    #[async_trait]
    impl RateLimiter for BrokenLimiter {
        async fn check(&self, _key: RateLimitKey) -> Result<RateLimitResult, RateLimitError> {
            Err(RateLimitError::Unavailable("redis down".into()))
        }

        async fn status(&self, _key: RateLimitKey) -> Result<RateLimitStatus, RateLimitError> {
            Err(RateLimitError::Unavailable("redis down".into()))
        }

        async fn reset(&self, _key: RateLimitKey) -> Result<(), RateLimitError> {
            Ok(())
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // IP Extraction Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn extract_ip_prefers_x_forwarded_for() {
        let request = axum::http::Request::builder()
            .header("X-Forwarded-For", "1.2.3.4, 5.6.7.8")
            .header("X-Real-IP", "9.8.7.6")
            .body(())
            .unwrap();
        assert_eq!(extract_client_ip(&request, None).as_deref(), Some("1.2.3.4"));
    }

    #[test]
    fn extract_ip_falls_back_to_real_ip_then_socket() {
        let request = axum::http::Request::builder()
            .header("X-Real-IP", "9.8.7.6")
            .body(())
            .unwrap();
        assert_eq!(extract_client_ip(&request, None).as_deref(), Some("9.8.7.6"));

        let request = axum::http::Request::builder().body(()).unwrap();
        let socket = ConnectInfo(SocketAddr::from(([10, 0, 0, 7], 4000)));
        assert_eq!(extract_client_ip(&request, Some(&socket)).as_deref(), Some("10.0.0.7"));
        assert_eq!(extract_client_ip(&request, None), None);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Middleware Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn anonymous_requests_are_limited_per_ip() {
        let app = app(limiter(2, 10));

        for _ in 0..2 {
            let response = app.clone().oneshot(request("/other", "1.1.1.1", None)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert!(response.headers().contains_key("x-ratelimit-remaining"));
        }

        let denied = app.clone().oneshot(request("/other", "1.1.1.1", None)).await.unwrap();
        assert_eq!(denied.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(denied.headers().contains_key("retry-after"));
        assert_eq!(denied.headers()["x-ratelimit-limit"], "2");
        assert_eq!(denied.headers()["x-ratelimit-remaining"], "0");
        let reset: i64 = denied.headers()["x-ratelimit-reset"].to_str().unwrap().parse().unwrap();
        assert!(reset > chrono::Utc::now().timestamp());

        let other_ip = app.oneshot(request("/other", "2.2.2.2", None)).await.unwrap();
        assert_eq!(other_ip.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn authenticated_requests_are_limited_per_user() {
        let app = app(limiter(1, 10));
        let user = AuthenticatedUser::new(UserId::new(), "u@example.com", None, UserRole::User);

        let first = app.clone().oneshot(request("/other", "1.1.1.1", Some(&user))).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        // Changing IP does not help a signed-in user.
        let second = app.oneshot(request("/other", "3.3.3.3", Some(&user))).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn chat_route_has_its_own_limit() {
        let app = app(limiter(100, 1));
        let user = AuthenticatedUser::new(UserId::new(), "u@example.com", None, UserRole::User);

        let first = app.clone().oneshot(request("/chat", "1.1.1.1", Some(&user))).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app.clone().oneshot(request("/chat", "1.1.1.1", Some(&user))).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

        let elsewhere = app.oneshot(request("/other", "1.1.1.1", Some(&user))).await.unwrap();
        assert_eq!(elsewhere.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn backend_failure_fails_open() {
        let app = app(Arc::new(BrokenLimiter));
        let response = app.oneshot(request("/other", "1.1.1.1", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key("x-ratelimit-limit"));
    }

    #[test]
    fn rate_limiter_state_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RateLimiterState>();
    }
}

//! JSON error envelope and the mapping from application errors to HTTP.
//!
//! Every error leaves the service as `{ "error": message, "code": CODE }`
//! with optional `details`.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::application::handlers::admin::AdminError;
use crate::application::handlers::chat::SendMessageError;
use crate::domain::billing::WebhookError;
use crate::domain::foundation::{AuthError, DomainError, ErrorCode};

/// Standard error body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Human-readable message.
    pub error: String,
    /// Stable code for programmatic handling.
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }
}

/// Error returned by every route handler.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
    retry_after_secs: Option<u32>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse::new(code, message),
            retry_after_secs: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.body.details = Some(details);
        self
    }

    /// Adds a `Retry-After` header.
    pub fn retry_after(mut self, secs: u32) -> Self {
        self.retry_after_secs = Some(secs);
        self
    }

    fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "Internal server error",
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.body.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();
        if let Some(secs) = self.retry_after_secs {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

fn domain_status(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::ValidationFailed => StatusCode::BAD_REQUEST,
        code if code.is_not_found() => StatusCode::NOT_FOUND,
        ErrorCode::AlreadyExists => StatusCode::CONFLICT,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        let status = domain_status(err.code);
        if status.is_server_error() {
            tracing::error!(code = %err.code, error = %err, "request failed");
            return ApiError::internal();
        }

        let api = ApiError::new(status, err.code.to_string(), err.message);
        if err.details.is_empty() {
            api
        } else {
            api.with_details(json!(err.details))
        }
    }
}

impl From<SendMessageError> for ApiError {
    fn from(err: SendMessageError) -> Self {
        let code = err.code();
        let message = err.to_string();
        match err {
            SendMessageError::EmptyMessage => ApiError::new(StatusCode::BAD_REQUEST, code, message),
            SendMessageError::MessageTooLong { max, actual } => {
                ApiError::new(StatusCode::BAD_REQUEST, code, message)
                    .with_details(json!({ "max": max, "actual": actual }))
            }
            SendMessageError::ConversationNotFound => {
                ApiError::new(StatusCode::NOT_FOUND, code, message)
            }
            SendMessageError::ModelNotAvailable { .. } => {
                ApiError::new(StatusCode::BAD_REQUEST, code, message)
            }
            SendMessageError::ModelRequiresPlan(_) => {
                ApiError::new(StatusCode::FORBIDDEN, code, message)
            }
            SendMessageError::DailyLimitReached { used, limit } => {
                ApiError::new(StatusCode::TOO_MANY_REQUESTS, code, message)
                    .with_details(json!({ "used": used, "limit": limit }))
            }
            SendMessageError::InsufficientCredits { balance, required } => {
                ApiError::new(StatusCode::PAYMENT_REQUIRED, code, message)
                    .with_details(json!({ "balance": balance, "required": required }))
            }
            SendMessageError::ProviderNotConfigured(_) => {
                ApiError::new(StatusCode::SERVICE_UNAVAILABLE, code, message)
            }
            SendMessageError::ProviderRateLimited { retry_after_secs } => {
                ApiError::new(StatusCode::TOO_MANY_REQUESTS, code, message)
                    .retry_after(retry_after_secs)
            }
            SendMessageError::Provider(detail) => {
                tracing::warn!(error = %detail, "provider call failed");
                ApiError::new(StatusCode::BAD_GATEWAY, code, "AI provider request failed")
            }
            SendMessageError::Domain(err) => err.into(),
        }
    }
}

impl From<AdminError> for ApiError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::SelfModification(_) => {
                ApiError::new(StatusCode::BAD_REQUEST, "SELF_MODIFICATION", err.to_string())
            }
            AdminError::Domain(err) => err.into(),
        }
    }
}

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        let status = err.status_code();
        if err.is_retryable() {
            tracing::error!(error = %err, "stripe webhook failed");
        } else {
            tracing::warn!(error = %err, "stripe webhook rejected");
        }
        ApiError::new(status, err.code(), err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let message = err.to_string();
        match err {
            AuthError::InvalidToken => {
                ApiError::new(StatusCode::UNAUTHORIZED, "INVALID_TOKEN", message)
            }
            AuthError::TokenExpired => {
                ApiError::new(StatusCode::UNAUTHORIZED, "TOKEN_EXPIRED", message)
            }
            AuthError::UserNotFound => {
                ApiError::new(StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", message)
            }
            AuthError::AccountDisabled => {
                ApiError::new(StatusCode::FORBIDDEN, "ACCOUNT_DISABLED", message)
            }
            AuthError::InsufficientPermissions => {
                ApiError::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
            }
            AuthError::ServiceUnavailable(detail) => {
                tracing::error!(error = %detail, "auth service unavailable");
                ApiError::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "AUTH_UNAVAILABLE",
                    "Authentication service unavailable",
                )
            }
        }
    }
}

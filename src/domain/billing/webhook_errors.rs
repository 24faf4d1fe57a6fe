//! Errors raised while verifying and applying Stripe webhooks.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::DomainError;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Webhook secret not configured")]
    NotConfigured,

    #[error("Invalid signature")]
    InvalidSignature,

    /// Older than the five minute tolerance.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// In the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Missing metadata: {0}")]
    MissingMetadata(&'static str),

    #[error("Invalid metadata: {0}")]
    InvalidMetadata(&'static str),

    #[error("User not found")]
    UserNotFound,

    #[error("Plan not found")]
    PlanNotFound,

    #[error("Database error: {0}")]
    Database(String),
}

impl WebhookError {
    /// Whether Stripe should redeliver the event.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WebhookError::Database(_) | WebhookError::NotConfigured | WebhookError::UserNotFound
        )
    }

    /// Stripe retries on 5xx and gives up on 4xx.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidSignature | WebhookError::TimestampOutOfRange => {
                StatusCode::UNAUTHORIZED
            }
            WebhookError::InvalidTimestamp
            | WebhookError::ParseError(_)
            | WebhookError::MissingMetadata(_)
            | WebhookError::InvalidMetadata(_)
            | WebhookError::PlanNotFound => StatusCode::BAD_REQUEST,
            WebhookError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            WebhookError::UserNotFound | WebhookError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            WebhookError::NotConfigured => "WEBHOOK_NOT_CONFIGURED",
            WebhookError::InvalidSignature
            | WebhookError::TimestampOutOfRange
            | WebhookError::InvalidTimestamp => "INVALID_SIGNATURE",
            WebhookError::ParseError(_) => "INVALID_PAYLOAD",
            WebhookError::MissingMetadata(_) | WebhookError::InvalidMetadata(_) => {
                "INVALID_METADATA"
            }
            WebhookError::UserNotFound => "USER_NOT_FOUND",
            WebhookError::PlanNotFound => "PLAN_NOT_FOUND",
            WebhookError::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        WebhookError::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_failures_are_unauthorized_and_final() {
        for err in [WebhookError::InvalidSignature, WebhookError::TimestampOutOfRange] {
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn bad_payloads_are_not_retried() {
        let err = WebhookError::MissingMetadata("user_id");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_retryable());
        assert_eq!(format!("{}", err), "Missing metadata: user_id");
    }

    #[test]
    fn storage_failures_are_retried() {
        let err = WebhookError::Database("connection reset".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_retryable());
    }

    #[test]
    fn missing_secret_is_unavailable() {
        assert_eq!(WebhookError::NotConfigured.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }
}

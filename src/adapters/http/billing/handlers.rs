//! HTTP handlers for billing endpoints.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::adapters::http::error::ApiError;
use crate::adapters::http::middleware::RequireAuth;
use crate::adapters::http::state::AppState;
use crate::application::handlers::billing::ProcessWebhookCommand;
use crate::domain::billing::WebhookError;

#[derive(Debug, Default, Deserialize)]
pub struct TransactionsQuery {
    pub limit: Option<u32>,
}

/// GET /api/billing/plans
pub async fn list_plans(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.billing_queries().plans().await?))
}

/// GET /api/billing/subscription
pub async fn get_subscription(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.billing_queries().subscription(&user.id).await?))
}

/// GET /api/billing/credits
pub async fn get_credits(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.billing_queries().credits(&user.id).await?))
}

/// GET /api/billing/transactions
pub async fn list_transactions(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<TransactionsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let transactions = state
        .billing_queries()
        .transactions(&user.id, query.limit)
        .await?;
    Ok(Json(transactions))
}

/// POST /api/billing/webhook - Stripe events, authenticated by signature
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::InvalidSignature)?;

    let cmd = ProcessWebhookCommand {
        payload: body.to_vec(),
        signature: signature.to_string(),
    };
    state.webhook_handler().handle(cmd).await?;

    Ok(Json(serde_json::json!({ "received": true })))
}

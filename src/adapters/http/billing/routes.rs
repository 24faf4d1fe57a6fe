//! Router for billing endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{get_credits, get_subscription, list_plans, list_transactions, stripe_webhook};
use crate::adapters::http::state::AppState;

/// # Routes
///
/// ## User Endpoints (require authentication)
/// - `GET /plans` - Plans open for purchase
/// - `GET /subscription` - Current subscription and billing mode
/// - `GET /credits` - Prepaid balance
/// - `GET /transactions?limit=` - Payment history, newest first
///
/// ## Webhook Endpoints (no auth, signature verified)
/// - `POST /webhook` - Stripe events
pub fn billing_routes() -> Router<AppState> {
    Router::new()
        .route("/plans", get(list_plans))
        .route("/subscription", get(get_subscription))
        .route("/credits", get(get_credits))
        .route("/transactions", get(list_transactions))
        .route("/webhook", post(stripe_webhook))
}

//! Router for the chat endpoints.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use super::handlers::{
    delete_conversation, get_account, get_conversation, list_conversations, list_models,
    rename_conversation, send_message,
};
use crate::adapters::http::middleware::chat_rate_limit_middleware;
use crate::adapters::http::state::AppState;

/// # Routes (all require authentication)
///
/// - `GET /me` - Profile, usage, quota and billing state
/// - `GET /models` - Providers and models with availability
/// - `POST /chat` - Send a message (own `chat` rate limit)
/// - `GET /conversations` - Paginated, most recent first
/// - `GET|PATCH|DELETE /conversations/:id`
pub fn chat_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/me", get(get_account))
        .route("/models", get(list_models))
        .route(
            "/chat",
            post(send_message).route_layer(middleware::from_fn_with_state(
                state.rate_limiter.clone(),
                chat_rate_limit_middleware,
            )),
        )
        .route("/conversations", get(list_conversations))
        .route(
            "/conversations/:id",
            get(get_conversation)
                .patch(rename_conversation)
                .delete(delete_conversation),
        )
}

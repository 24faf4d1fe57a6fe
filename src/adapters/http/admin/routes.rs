//! Route table for the back office.

use axum::routing::{get, patch, post, put};
use axum::Router;

use super::handlers;
use crate::adapters::http::state::AppState;

/// Routes nested under `/api/admin`.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(handlers::list_users).post(handlers::create_user))
        .route(
            "/users/:id",
            get(handlers::get_user)
                .patch(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route("/users/:id/credits", post(handlers::adjust_credits))
        .route(
            "/api-keys",
            get(handlers::list_api_keys).post(handlers::create_api_key),
        )
        .route(
            "/api-keys/:id",
            patch(handlers::update_api_key).delete(handlers::delete_api_key),
        )
        .route("/api-keys/:id/reset", post(handlers::reset_api_key_usage))
        .route("/settings", get(handlers::list_settings))
        .route(
            "/settings/:key",
            put(handlers::upsert_setting).delete(handlers::delete_setting),
        )
        .route("/plans", get(handlers::list_plans).post(handlers::create_plan))
        .route(
            "/plans/:id",
            put(handlers::update_plan).delete(handlers::delete_plan),
        )
        .route("/models", get(handlers::list_models).post(handlers::create_model))
        .route(
            "/models/:id",
            patch(handlers::update_model).delete(handlers::delete_model),
        )
        .route("/analytics/overview", get(handlers::analytics_overview))
        .route("/analytics/daily", get(handlers::analytics_daily))
        .route("/analytics/top-users", get(handlers::analytics_top_users))
        .route("/analytics/models", get(handlers::analytics_models))
}

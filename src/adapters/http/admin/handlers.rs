//! HTTP handlers for the back office. Every handler requires the admin gate.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::application::handlers::admin::{
    AdjustCreditsCommand, AdminError, AnalyticsWindow, CreateApiKeyCommand, CreateModelCommand,
};
use crate::domain::billing::PlanDraft;
use crate::domain::catalog::ModelUpdate;
use crate::domain::foundation::{ApiKeyId, ModelId, PlanId, UserId};
use crate::ports::PlanRemoval;

use super::dto::{
    AdjustCreditsRequest, ApiKeyListQuery, CreateApiKeyRequest, CreateModelRequest,
    CreateUserRequest, UpdateApiKeyRequest, UpdateModelRequest, UpdateUserRequest,
    UpsertSettingRequest, UserListQuery,
};
use crate::adapters::http::error::ApiError;
use crate::adapters::http::extract::JsonBody;
use crate::adapters::http::middleware::RequireAdmin;
use crate::adapters::http::state::AppState;

// ════════════════════════════════════════════════════════════════════════════════
// Users
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<UserListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .user_admin()
        .list(query.page_request(), query.search())
        .await?;
    Ok(Json(page))
}

/// POST /api/admin/users
pub async fn create_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    JsonBody(req): JsonBody<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.user_admin().create(req.into()).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/admin/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.user_admin().get(&id).await?))
}

/// PATCH /api/admin/users/:id
pub async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
    JsonBody(req): JsonBody<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.user_admin().update(&admin, &id, req.into()).await?;
    Ok(Json(user))
}

/// DELETE /api/admin/users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    state.user_admin().delete(&admin, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/admin/users/:id/credits
pub async fn adjust_credits(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(user_id): Path<UserId>,
    JsonBody(req): JsonBody<AdjustCreditsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cmd = AdjustCreditsCommand {
        user_id,
        amount: req.amount,
    };
    let credits = state.credit_admin().handle(&admin, cmd).await?;
    Ok(Json(credits))
}

// ════════════════════════════════════════════════════════════════════════════════
// API keys
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/admin/api-keys
pub async fn list_api_keys(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<ApiKeyListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.api_key_admin().list(query.provider).await?))
}

/// POST /api/admin/api-keys
pub async fn create_api_key(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    JsonBody(req): JsonBody<CreateApiKeyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let key = state
        .api_key_admin()
        .create(CreateApiKeyCommand::from(req))
        .await?;
    Ok((StatusCode::CREATED, Json(key)))
}

/// PATCH /api/admin/api-keys/:id
pub async fn update_api_key(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ApiKeyId>,
    JsonBody(req): JsonBody<UpdateApiKeyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.api_key_admin().update(&id, req.into()).await?))
}

/// DELETE /api/admin/api-keys/:id
pub async fn delete_api_key(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ApiKeyId>,
) -> Result<impl IntoResponse, ApiError> {
    state.api_key_admin().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/admin/api-keys/:id/reset
pub async fn reset_api_key_usage(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ApiKeyId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.api_key_admin().reset_usage(&id).await?))
}

// ════════════════════════════════════════════════════════════════════════════════
// Settings
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/admin/settings
pub async fn list_settings(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.settings_admin().list().await?))
}

/// PUT /api/admin/settings/:key
pub async fn upsert_setting(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(key): Path<String>,
    JsonBody(req): JsonBody<UpsertSettingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.settings_admin().upsert(&key, &req.value).await?))
}

/// DELETE /api/admin/settings/:key
pub async fn delete_setting(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.settings_admin().delete(&key).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ════════════════════════════════════════════════════════════════════════════════
// Plans
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/admin/plans
pub async fn list_plans(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.plan_admin().list().await?))
}

/// POST /api/admin/plans
pub async fn create_plan(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    JsonBody(draft): JsonBody<PlanDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let plan = state.plan_admin().create(draft).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

/// PUT /api/admin/plans/:id
pub async fn update_plan(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<PlanId>,
    JsonBody(draft): JsonBody<PlanDraft>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.plan_admin().update(&id, draft).await?))
}

/// DELETE /api/admin/plans/:id
///
/// Plans still referenced by a subscription are deactivated instead.
pub async fn delete_plan(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<PlanId>,
) -> Result<impl IntoResponse, ApiError> {
    let result = match state.plan_admin().delete(&id).await? {
        PlanRemoval::Deleted => "deleted",
        PlanRemoval::Deactivated => "deactivated",
        PlanRemoval::NotFound => {
            return Err(ApiError::new(StatusCode::NOT_FOUND, "PLAN_NOT_FOUND", "Plan not found"))
        }
    };
    Ok(Json(json!({ "result": result })))
}

// ════════════════════════════════════════════════════════════════════════════════
// Models
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/admin/models
pub async fn list_models(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.model_admin().list().await?))
}

/// POST /api/admin/models
pub async fn create_model(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    JsonBody(req): JsonBody<CreateModelRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cmd = CreateModelCommand::try_from(req).map_err(AdminError::from)?;
    let model = state.model_admin().create(cmd).await?;
    Ok((StatusCode::CREATED, Json(model)))
}

/// PATCH /api/admin/models/:id
pub async fn update_model(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ModelId>,
    JsonBody(req): JsonBody<UpdateModelRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let update = ModelUpdate::try_from(req).map_err(AdminError::from)?;
    Ok(Json(state.model_admin().update(&id, update).await?))
}

/// DELETE /api/admin/models/:id
pub async fn delete_model(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ModelId>,
) -> Result<impl IntoResponse, ApiError> {
    state.model_admin().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ════════════════════════════════════════════════════════════════════════════════
// Analytics
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/admin/analytics/overview
pub async fn analytics_overview(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.analytics().overview().await?))
}

/// GET /api/admin/analytics/daily?days=
pub async fn analytics_daily(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(window): Query<AnalyticsWindow>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.analytics().daily_usage(window).await?))
}

/// GET /api/admin/analytics/top-users?days=&limit=
pub async fn analytics_top_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(window): Query<AnalyticsWindow>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.analytics().top_users(window).await?))
}

/// GET /api/admin/analytics/models?days=
pub async fn analytics_models(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(window): Query<AnalyticsWindow>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.analytics().usage_by_model(window).await?))
}

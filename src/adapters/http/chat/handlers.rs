//! HTTP handlers for the signed-in user's chat endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::application::handlers::chat::{
    DeleteConversationCommand, GetConversationQuery, ListConversationsQuery,
    RenameConversationCommand, SendMessageCommand,
};
use crate::domain::foundation::ConversationId;
use crate::ports::PageRequest;

use super::dto::{RenameConversationRequest, SendMessageRequest, SendMessageResponse};
use crate::adapters::http::error::ApiError;
use crate::adapters::http::extract::JsonBody;
use crate::adapters::http::middleware::RequireAuth;
use crate::adapters::http::state::AppState;

/// GET /api/me
pub async fn get_account(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let account = state.account_handler().handle(&user.id).await?;
    Ok(Json(account))
}

/// GET /api/models
pub async fn list_models(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let models = state.list_models_handler().handle(&user.id).await?;
    Ok(Json(models))
}

/// POST /api/chat
pub async fn send_message(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    JsonBody(req): JsonBody<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cmd = SendMessageCommand {
        user,
        conversation_id: req.conversation_id,
        content: req.content,
        provider: req.provider,
        model: req.model,
    };
    let result = state.send_message_handler().handle(cmd).await?;
    let status = if result.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(SendMessageResponse::from(result))))
}

/// GET /api/conversations
pub async fn list_conversations(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(page): Query<PageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let conversations = state
        .list_conversations_handler()
        .handle(ListConversationsQuery {
            user_id: user.id,
            page,
        })
        .await?;
    Ok(Json(conversations))
}

/// GET /api/conversations/:id
pub async fn get_conversation(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(conversation_id): Path<ConversationId>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state
        .get_conversation_handler()
        .handle(GetConversationQuery {
            user_id: user.id,
            conversation_id,
        })
        .await?;
    Ok(Json(view))
}

/// PATCH /api/conversations/:id
pub async fn rename_conversation(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(conversation_id): Path<ConversationId>,
    JsonBody(req): JsonBody<RenameConversationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let conversation = state
        .rename_conversation_handler()
        .handle(RenameConversationCommand {
            user_id: user.id,
            conversation_id,
            title: req.title,
        })
        .await?;
    Ok(Json(conversation))
}

/// DELETE /api/conversations/:id
pub async fn delete_conversation(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(conversation_id): Path<ConversationId>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .delete_conversation_handler()
        .handle(DeleteConversationCommand {
            user_id: user.id,
            conversation_id,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

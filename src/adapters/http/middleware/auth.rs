//! Authentication middleware and extractors for axum.
//!
//! - `auth_middleware` - validates Bearer tokens, loads the account and
//!   injects an `AuthenticatedUser` into request extensions
//! - `RequireAuth` - extractor that requires an authenticated user
//! - `RequireAdmin` - extractor that additionally requires the admin role
//!
//! ```text
//! Request → auth_middleware → injects AuthenticatedUser into extensions
//!                                      ↓
//!                    Handler → RequireAuth / RequireAdmin read from extensions
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::adapters::http::error::ApiError;
use crate::domain::foundation::{AuthError, AuthenticatedUser};
use crate::ports::{SessionValidator, UserRepository};

/// Dependencies of the auth middleware.
#[derive(Clone)]
pub struct AuthState {
    pub validator: Arc<dyn SessionValidator>,
    pub users: Arc<dyn UserRepository>,
}

/// Authentication middleware.
///
/// 1. Extracts the Bearer token from the Authorization header
/// 2. Without a token, continues unauthenticated
/// 3. Validates the token and loads the account
/// 4. Unknown accounts get 401, disabled accounts 403
/// 5. On success, injects `AuthenticatedUser` into request extensions
pub async fn auth_middleware(
    State(auth): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()) else {
        return next.run(request).await;
    };

    match authenticate(&auth, &token).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

async fn authenticate(auth: &AuthState, token: &str) -> Result<AuthenticatedUser, AuthError> {
    let user_id = auth.validator.validate(token).await?;
    let user = auth
        .users
        .find_by_id(&user_id)
        .await
        .map_err(|e| AuthError::service_unavailable(e.to_string()))?
        .ok_or(AuthError::UserNotFound)?;

    if !user.is_active {
        tracing::debug!(user_id = %user.id, "rejected disabled account");
        return Err(AuthError::AccountDisabled);
    }

    Ok(AuthenticatedUser::new(user.id, user.email, user.display_name, user.role))
}

/// Extractor that requires authentication.
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(RequireAuth)
            .ok_or(AuthRejection::Unauthenticated)
    }
}

/// Extractor that requires an authenticated admin.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AuthRejection::Forbidden);
        }
        Ok(RequireAdmin(user))
    }
}

/// Rejection type for the auth extractors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRejection {
    /// No valid authentication token was provided.
    Unauthenticated,
    /// Authenticated, but not an admin.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::Unauthenticated => ApiError::new(
                StatusCode::UNAUTHORIZED,
                "UNAUTHENTICATED",
                "Authentication required",
            ),
            AuthRejection::Forbidden => {
                ApiError::new(StatusCode::FORBIDDEN, "FORBIDDEN", "Admin access required")
            }
        }
        .into_response()
    }
}

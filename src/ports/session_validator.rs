//! Bearer token validation port.
//!
//! A validator only proves who the token was issued to. Loading the account
//! and checking that it is still active is the auth middleware's job.

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, UserId};

#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// Returns the subject of a valid token.
    ///
    /// # Errors
    ///
    /// - `InvalidToken` for malformed or badly signed tokens
    /// - `TokenExpired` when past `exp`
    /// - `ServiceUnavailable` when the validator itself cannot run
    async fn validate(&self, token: &str) -> Result<UserId, AuthError>;
}

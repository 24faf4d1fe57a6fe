use async_trait::async_trait;

use super::{Page, PageRequest};
use crate::domain::account::User;
use crate::domain::foundation::{DomainError, UserId};

/// Persistence for user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, DomainError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;

    /// Newest first; `search` matches email or display name, case-insensitive.
    async fn list(
        &self,
        page: PageRequest,
        search: Option<&str>,
    ) -> Result<Page<User>, DomainError>;

    /// # Errors
    ///
    /// `AlreadyExists` when the email is taken.
    async fn create(&self, user: &User) -> Result<(), DomainError>;

    /// # Errors
    ///
    /// `UserNotFound` when no row matches.
    async fn update(&self, user: &User) -> Result<(), DomainError>;

    /// Removes the account and everything it owns. Returns false if absent.
    async fn delete(&self, id: &UserId) -> Result<bool, DomainError>;
}

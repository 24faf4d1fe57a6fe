//! Conversation and message persistence.
//!
//! Every read on the user path is scoped by owner: a conversation that
//! belongs to someone else is indistinguishable from one that does not
//! exist.

use async_trait::async_trait;

use super::{Page, PageRequest};
use crate::domain::chat::{ChatMessage, Conversation};
use crate::domain::foundation::{ConversationId, DomainError, Timestamp, UserId};

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn create(&self, conversation: &Conversation) -> Result<(), DomainError>;

    /// Finds a conversation only if `owner` owns it.
    async fn find_for_user(
        &self,
        id: &ConversationId,
        owner: &UserId,
    ) -> Result<Option<Conversation>, DomainError>;

    /// Most recently updated first.
    async fn list_for_user(
        &self,
        owner: &UserId,
        page: PageRequest,
    ) -> Result<Page<Conversation>, DomainError>;

    /// Persists title changes.
    async fn update(&self, conversation: &Conversation) -> Result<(), DomainError>;

    /// Bumps `updated_at`.
    async fn touch(&self, id: &ConversationId, at: Timestamp) -> Result<(), DomainError>;

    /// Deletes the conversation and its messages. Returns false if absent or
    /// not owned by `owner`.
    async fn delete_for_user(
        &self,
        id: &ConversationId,
        owner: &UserId,
    ) -> Result<bool, DomainError>;

    async fn append_message(&self, message: &ChatMessage) -> Result<(), DomainError>;

    /// The last `limit` messages, oldest first.
    async fn recent_messages(
        &self,
        id: &ConversationId,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, DomainError>;

    /// All messages, oldest first.
    async fn messages(&self, id: &ConversationId) -> Result<Vec<ChatMessage>, DomainError>;
}

//! ListConversations query handler.

use std::sync::Arc;

use crate::domain::chat::Conversation;
use crate::domain::foundation::{DomainError, UserId};
use crate::ports::{ConversationRepository, Page, PageRequest};

#[derive(Debug, Clone)]
pub struct ListConversationsQuery {
    pub user_id: UserId,
    pub page: PageRequest,
}

/// Lists the caller's conversations, most recently active first.
pub struct ListConversationsHandler {
    conversations: Arc<dyn ConversationRepository>,
}

impl ListConversationsHandler {
    pub fn new(conversations: Arc<dyn ConversationRepository>) -> Self {
        Self { conversations }
    }

    pub async fn handle(
        &self,
        query: ListConversationsQuery,
    ) -> Result<Page<Conversation>, DomainError> {
        self.conversations
            .list_for_user(&query.user_id, query.page)
            .await
    }
}

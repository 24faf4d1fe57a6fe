//! GetConversation query handler.

use serde::Serialize;
use std::sync::Arc;

use crate::domain::chat::{ChatMessage, Conversation};
use crate::domain::foundation::{ConversationId, DomainError, ErrorCode, UserId};
use crate::ports::ConversationRepository;

#[derive(Debug, Clone)]
pub struct GetConversationQuery {
    pub user_id: UserId,
    pub conversation_id: ConversationId,
}

/// A conversation with its full message history, oldest first.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationView {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub messages: Vec<ChatMessage>,
}

pub struct GetConversationHandler {
    conversations: Arc<dyn ConversationRepository>,
}

impl GetConversationHandler {
    pub fn new(conversations: Arc<dyn ConversationRepository>) -> Self {
        Self { conversations }
    }

    pub async fn handle(
        &self,
        query: GetConversationQuery,
    ) -> Result<ConversationView, DomainError> {
        let conversation = self
            .conversations
            .find_for_user(&query.conversation_id, &query.user_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(ErrorCode::ConversationNotFound, "Conversation not found")
            })?;
        let messages = self.conversations.messages(&conversation.id).await?;
        Ok(ConversationView {
            conversation,
            messages,
        })
    }
}

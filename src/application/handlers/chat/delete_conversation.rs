//! DeleteConversation command handler.

use std::sync::Arc;
use tracing::info;

use crate::domain::foundation::{ConversationId, DomainError, ErrorCode, UserId};
use crate::ports::ConversationRepository;

#[derive(Debug, Clone)]
pub struct DeleteConversationCommand {
    pub user_id: UserId,
    pub conversation_id: ConversationId,
}

/// Removes a conversation together with its messages.
pub struct DeleteConversationHandler {
    conversations: Arc<dyn ConversationRepository>,
}

impl DeleteConversationHandler {
    pub fn new(conversations: Arc<dyn ConversationRepository>) -> Self {
        Self { conversations }
    }

    pub async fn handle(&self, cmd: DeleteConversationCommand) -> Result<(), DomainError> {
        let deleted = self
            .conversations
            .delete_for_user(&cmd.conversation_id, &cmd.user_id)
            .await?;
        if !deleted {
            return Err(DomainError::new(ErrorCode::ConversationNotFound, "Conversation not found"));
        }
        info!(
            user_id = %cmd.user_id,
            conversation_id = %cmd.conversation_id,
            "conversation deleted"
        );
        Ok(())
    }
}

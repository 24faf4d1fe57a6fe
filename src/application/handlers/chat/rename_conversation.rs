//! RenameConversation command handler.

use std::sync::Arc;

use crate::domain::chat::Conversation;
use crate::domain::foundation::{ConversationId, DomainError, ErrorCode, UserId};
use crate::ports::ConversationRepository;

#[derive(Debug, Clone)]
pub struct RenameConversationCommand {
    pub user_id: UserId,
    pub conversation_id: ConversationId,
    pub title: String,
}

pub struct RenameConversationHandler {
    conversations: Arc<dyn ConversationRepository>,
}

impl RenameConversationHandler {
    pub fn new(conversations: Arc<dyn ConversationRepository>) -> Self {
        Self { conversations }
    }

    pub async fn handle(
        &self,
        cmd: RenameConversationCommand,
    ) -> Result<Conversation, DomainError> {
        // 1. Load, scoped to the owner
        let mut conversation = self
            .conversations
            .find_for_user(&cmd.conversation_id, &cmd.user_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(ErrorCode::ConversationNotFound, "Conversation not found")
            })?;

        // 2. Apply rename
        conversation.rename(&cmd.title)?;

        // 3. Persist
        self.conversations.update(&conversation).await?;
        Ok(conversation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryConversationRepository;
    use crate::domain::chat::ProviderKind;

    async fn setup() -> (InMemoryConversationRepository, Conversation) {
        let repo = InMemoryConversationRepository::new();
        let conv = Conversation::start(UserId::new(), "first", ProviderKind::Google, "m");
        repo.create(&conv).await.unwrap();
        (repo, conv)
    }

    #[tokio::test]
    async fn renames_with_trimmed_title() {
        let (repo, conv) = setup().await;
        let handler = RenameConversationHandler::new(Arc::new(repo.clone()));

        let renamed = handler
            .handle(RenameConversationCommand {
                user_id: conv.user_id,
                conversation_id: conv.id,
                title: "  Trip planning  ".into(),
            })
            .await
            .unwrap();

        assert_eq!(renamed.title, "Trip planning");
        let stored = repo.find_for_user(&conv.id, &conv.user_id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Trip planning");
    }

    #[tokio::test]
    async fn rejects_blank_and_oversized_titles() {
        let (repo, conv) = setup().await;
        let handler = RenameConversationHandler::new(Arc::new(repo));

        for title in ["   ".to_string(), "x".repeat(201)] {
            let err = handler
                .handle(RenameConversationCommand {
                    user_id: conv.user_id,
                    conversation_id: conv.id,
                    title,
                })
                .await
                .unwrap_err();
            assert_eq!(err.code, ErrorCode::ValidationFailed);
        }
    }

    #[tokio::test]
    async fn cannot_rename_someone_elses_conversation() {
        let (repo, conv) = setup().await;
        let handler = RenameConversationHandler::new(Arc::new(repo));

        let err = handler
            .handle(RenameConversationCommand {
                user_id: UserId::new(),
                conversation_id: conv.id,
                title: "mine now".into(),
            })
            .await
            .unwrap_err();
        assert!(err.code.is_not_found());
    }
}

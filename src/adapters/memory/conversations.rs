//! In-memory conversation and message store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::chat::{ChatMessage, Conversation};
use crate::domain::foundation::{ConversationId, DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::{ConversationRepository, Page, PageRequest};

#[derive(Debug, Default)]
struct Store {
    conversations: HashMap<ConversationId, Conversation>,
    /// Per conversation, in insertion (chronological) order
    messages: HashMap<ConversationId, Vec<ChatMessage>>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryConversationRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryConversationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn conversation_count(&self) -> usize {
        self.store.read().await.conversations.len()
    }

    pub(crate) async fn snapshot(&self) -> (Vec<Conversation>, Vec<ChatMessage>) {
        let store = self.store.read().await;
        (
            store.conversations.values().cloned().collect(),
            store.messages.values().flatten().cloned().collect(),
        )
    }
}

#[async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn create(&self, conversation: &Conversation) -> Result<(), DomainError> {
        let mut store = self.store.write().await;
        store.conversations.insert(conversation.id, conversation.clone());
        store.messages.entry(conversation.id).or_default();
        Ok(())
    }

    async fn find_for_user(
        &self,
        id: &ConversationId,
        owner: &UserId,
    ) -> Result<Option<Conversation>, DomainError> {
        Ok(self
            .store
            .read()
            .await
            .conversations
            .get(id)
            .filter(|c| c.is_owned_by(owner))
            .cloned())
    }

    async fn list_for_user(
        &self,
        owner: &UserId,
        page: PageRequest,
    ) -> Result<Page<Conversation>, DomainError> {
        let store = self.store.read().await;
        let mut owned: Vec<Conversation> = store
            .conversations
            .values()
            .filter(|c| c.is_owned_by(owner))
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        let total = owned.len() as u64;
        let items = owned
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();
        Ok(Page::new(items, total, page))
    }

    async fn update(&self, conversation: &Conversation) -> Result<(), DomainError> {
        let mut store = self.store.write().await;
        match store.conversations.get_mut(&conversation.id) {
            Some(existing) => {
                *existing = conversation.clone();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::ConversationNotFound,
                "Conversation not found",
            )),
        }
    }

    async fn touch(&self, id: &ConversationId, at: Timestamp) -> Result<(), DomainError> {
        if let Some(conversation) = self.store.write().await.conversations.get_mut(id) {
            conversation.updated_at = at;
        }
        Ok(())
    }

    async fn delete_for_user(
        &self,
        id: &ConversationId,
        owner: &UserId,
    ) -> Result<bool, DomainError> {
        let mut store = self.store.write().await;
        let owned = store
            .conversations
            .get(id)
            .is_some_and(|c| c.is_owned_by(owner));
        if owned {
            store.conversations.remove(id);
            store.messages.remove(id);
        }
        Ok(owned)
    }

    async fn append_message(&self, message: &ChatMessage) -> Result<(), DomainError> {
        let mut store = self.store.write().await;
        if !store.conversations.contains_key(&message.conversation_id) {
            return Err(DomainError::new(
                ErrorCode::ConversationNotFound,
                "Conversation not found",
            ));
        }
        store
            .messages
            .entry(message.conversation_id)
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn recent_messages(
        &self,
        id: &ConversationId,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, DomainError> {
        let store = self.store.read().await;
        let messages = store.messages.get(id).map(Vec::as_slice).unwrap_or_default();
        let skip = messages.len().saturating_sub(limit as usize);
        Ok(messages[skip..].to_vec())
    }

    async fn messages(&self, id: &ConversationId) -> Result<Vec<ChatMessage>, DomainError> {
        Ok(self
            .store
            .read()
            .await
            .messages
            .get(id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chat::ProviderKind;

    fn conversation(owner: UserId) -> Conversation {
        Conversation::start(owner, "Hello there", ProviderKind::Google, "gemini-1.5-flash")
    }

    #[tokio::test]
    async fn lookups_are_owner_scoped() {
        let repo = InMemoryConversationRepository::new();
        let alice = UserId::new();
        let conv = conversation(alice);
        repo.create(&conv).await.unwrap();

        assert!(repo.find_for_user(&conv.id, &alice).await.unwrap().is_some());
        assert!(repo.find_for_user(&conv.id, &UserId::new()).await.unwrap().is_none());
        assert!(!repo.delete_for_user(&conv.id, &UserId::new()).await.unwrap());
        assert!(repo.delete_for_user(&conv.id, &alice).await.unwrap());
        assert_eq!(repo.conversation_count().await, 0);
    }

    #[tokio::test]
    async fn recent_messages_are_the_tail_in_order() {
        let repo = InMemoryConversationRepository::new();
        let conv = conversation(UserId::new());
        repo.create(&conv).await.unwrap();
        for i in 0..5 {
            repo.append_message(&ChatMessage::user(conv.id, format!("m{}", i), 1))
                .await
                .unwrap();
        }

        let recent = repo.recent_messages(&conv.id, 3).await.unwrap();
        let contents: Vec<_> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);

        assert_eq!(repo.recent_messages(&conv.id, 50).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn messages_need_a_conversation() {
        let repo = InMemoryConversationRepository::new();
        let orphan = ChatMessage::user(ConversationId::new(), "hi", 1);
        let err = repo.append_message(&orphan).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ConversationNotFound);
    }

    #[tokio::test]
    async fn list_orders_by_last_activity() {
        let repo = InMemoryConversationRepository::new();
        let owner = UserId::new();
        let older = conversation(owner);
        let newer = conversation(owner);
        repo.create(&older).await.unwrap();
        repo.create(&newer).await.unwrap();
        repo.touch(&older.id, Timestamp::now().plus_days(1)).await.unwrap();

        let page = repo.list_for_user(&owner, PageRequest::default()).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].id, older.id);
    }
}

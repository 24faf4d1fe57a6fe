//! PostgreSQL implementation of ConversationRepository.
//!
//! Conversation lookups on the user path always carry the owner in the
//! `WHERE` clause, so another user's conversation reads as absent.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{int4, parse_column, unsigned};
use crate::domain::chat::{ChatMessage, Conversation};
use crate::domain::foundation::{
    ConversationId, DomainError, ErrorCode, MessageId, Timestamp, UserId,
};
use crate::ports::{ConversationRepository, Page, PageRequest};

#[derive(Clone)]
pub struct PostgresConversationRepository {
    pool: PgPool,
}

impl PostgresConversationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ConversationRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    provider: String,
    model: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ConversationRow> for Conversation {
    type Error = DomainError;

    fn try_from(row: ConversationRow) -> Result<Self, Self::Error> {
        Ok(Conversation {
            id: ConversationId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            title: row.title,
            provider: parse_column("provider", &row.provider)?,
            model: row.model,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    conversation_id: Uuid,
    role: String,
    content: String,
    prompt_tokens: i32,
    completion_tokens: i32,
    cost_usd: f64,
    created_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for ChatMessage {
    type Error = DomainError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        Ok(ChatMessage {
            id: MessageId::from_uuid(row.id),
            conversation_id: ConversationId::from_uuid(row.conversation_id),
            role: parse_column("role", &row.role)?,
            content: row.content,
            prompt_tokens: unsigned("prompt_tokens", row.prompt_tokens)?,
            completion_tokens: unsigned("completion_tokens", row.completion_tokens)?,
            cost_usd: row.cost_usd,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

const CONVERSATION_COLUMNS: &str = "id, user_id, title, provider, model, created_at, updated_at";
const MESSAGE_COLUMNS: &str =
    "id, conversation_id, role, content, prompt_tokens, completion_tokens, cost_usd, created_at";

fn conversation_not_found(id: &ConversationId) -> DomainError {
    DomainError::new(
        ErrorCode::ConversationNotFound,
        format!("Conversation {} not found", id),
    )
}

fn collect_messages(rows: Vec<MessageRow>) -> Result<Vec<ChatMessage>, DomainError> {
    rows.into_iter().map(ChatMessage::try_from).collect()
}

#[async_trait]
impl ConversationRepository for PostgresConversationRepository {
    async fn create(&self, conversation: &Conversation) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO conversations (id, user_id, title, provider, model, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(conversation.id.as_uuid())
        .bind(conversation.user_id.as_uuid())
        .bind(&conversation.title)
        .bind(conversation.provider.as_str())
        .bind(&conversation.model)
        .bind(conversation.created_at.as_datetime())
        .bind(conversation.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(DomainError::database)?;
        Ok(())
    }

    async fn find_for_user(
        &self,
        id: &ConversationId,
        owner: &UserId,
    ) -> Result<Option<Conversation>, DomainError> {
        let row: Option<ConversationRow> = sqlx::query_as(&format!(
            "SELECT {} FROM conversations WHERE id = $1 AND user_id = $2",
            CONVERSATION_COLUMNS
        ))
        .bind(id.as_uuid())
        .bind(owner.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(DomainError::database)?;

        row.map(Conversation::try_from).transpose()
    }

    async fn list_for_user(
        &self,
        owner: &UserId,
        page: PageRequest,
    ) -> Result<Page<Conversation>, DomainError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM conversations WHERE user_id = $1")
            .bind(owner.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(DomainError::database)?;

        let rows: Vec<ConversationRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM conversations
            WHERE user_id = $1
            ORDER BY updated_at DESC
            LIMIT $2 OFFSET $3
            "#,
            CONVERSATION_COLUMNS
        ))
        .bind(owner.as_uuid())
        .bind(i64::from(page.limit()))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(DomainError::database)?;

        let conversations = rows
            .into_iter()
            .map(Conversation::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(conversations, total.max(0) as u64, page))
    }

    async fn update(&self, conversation: &Conversation) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE conversations
            SET title = $3, provider = $4, model = $5, updated_at = $6
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(conversation.id.as_uuid())
        .bind(conversation.user_id.as_uuid())
        .bind(&conversation.title)
        .bind(conversation.provider.as_str())
        .bind(&conversation.model)
        .bind(conversation.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(DomainError::database)?;

        if result.rows_affected() == 0 {
            return Err(conversation_not_found(&conversation.id));
        }
        Ok(())
    }

    async fn touch(&self, id: &ConversationId, at: Timestamp) -> Result<(), DomainError> {
        sqlx::query("UPDATE conversations SET updated_at = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(at.as_datetime())
            .execute(&self.pool)
            .await
            .map_err(DomainError::database)?;
        Ok(())
    }

    async fn delete_for_user(
        &self,
        id: &ConversationId,
        owner: &UserId,
    ) -> Result<bool, DomainError> {
        // messages go with the conversation through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM conversations WHERE id = $1 AND user_id = $2")
            .bind(id.as_uuid())
            .bind(owner.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(DomainError::database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn append_message(&self, message: &ChatMessage) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO messages
                (id, conversation_id, role, content, prompt_tokens, completion_tokens, cost_usd, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(message.id.as_uuid())
        .bind(message.conversation_id.as_uuid())
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(int4(message.prompt_tokens))
        .bind(int4(message.completion_tokens))
        .bind(message.cost_usd)
        .bind(message.created_at.as_datetime())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
                Err(conversation_not_found(&message.conversation_id))
            }
            Err(e) => Err(DomainError::database(e)),
        }
    }

    async fn recent_messages(
        &self,
        id: &ConversationId,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, DomainError> {
        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            r#"
            SELECT {cols} FROM (
                SELECT {cols} FROM messages
                WHERE conversation_id = $1
                ORDER BY created_at DESC
                LIMIT $2
            ) recent
            ORDER BY created_at ASC
            "#,
            cols = MESSAGE_COLUMNS
        ))
        .bind(id.as_uuid())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(DomainError::database)?;

        collect_messages(rows)
    }

    async fn messages(&self, id: &ConversationId) -> Result<Vec<ChatMessage>, DomainError> {
        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            "SELECT {} FROM messages WHERE conversation_id = $1 ORDER BY created_at ASC",
            MESSAGE_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(DomainError::database)?;

        collect_messages(rows)
    }
}

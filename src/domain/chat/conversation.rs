use serde::{Deserialize, Serialize};

use super::ProviderKind;
use crate::domain::foundation::{ConversationId, Timestamp, UserId, ValidationError};

/// Characters of the first message kept as a conversation title.
pub const TITLE_PREVIEW_CHARS: usize = 50;

const MAX_TITLE_CHARS: usize = 200;

/// A thread of messages owned by one user and routed to one provider/model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub user_id: UserId,
    pub title: String,
    pub provider: ProviderKind,
    pub model: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Conversation {
    /// Opens a conversation titled after its first message.
    pub fn start(
        user_id: UserId,
        first_message: &str,
        provider: ProviderKind,
        model: impl Into<String>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: ConversationId::new(),
            user_id,
            title: title_from_message(first_message),
            provider,
            model: model.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    pub fn rename(&mut self, title: &str) -> Result<(), ValidationError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::empty_field("title"));
        }
        let len = title.chars().count();
        if len > MAX_TITLE_CHARS {
            return Err(ValidationError::too_long("title", MAX_TITLE_CHARS, len));
        }
        self.title = title.to_string();
        self.updated_at = Timestamp::now();
        Ok(())
    }
}

/// Title derived from the first line of a message.
///
/// Cut at [`TITLE_PREVIEW_CHARS`] characters with `...` appended when
/// anything was dropped.
pub fn title_from_message(content: &str) -> String {
    let first_line = content.trim().lines().next().unwrap_or("").trim();
    if first_line.is_empty() {
        return "New conversation".to_string();
    }
    let mut chars = first_line.chars();
    let preview: String = chars.by_ref().take(TITLE_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", preview.trim_end())
    } else {
        preview
    }
}

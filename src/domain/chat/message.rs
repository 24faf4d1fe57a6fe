use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{ConversationId, MessageId, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            "system" => Ok(MessageRole::System),
            other => Err(format!("unknown message role '{}'", other)),
        }
    }
}

/// A persisted message with its token and cost accounting.
///
/// User messages carry an estimated prompt token count and zero cost;
/// assistant messages carry the provider-reported usage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub role: MessageRole,
    pub content: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub cost_usd: f64,
    pub created_at: Timestamp,
}

impl ChatMessage {
    pub fn user(
        conversation_id: ConversationId,
        content: impl Into<String>,
        prompt_tokens: u32,
    ) -> Self {
        Self {
            id: MessageId::new(),
            conversation_id,
            role: MessageRole::User,
            content: content.into(),
            prompt_tokens,
            completion_tokens: 0,
            cost_usd: 0.0,
            created_at: Timestamp::now(),
        }
    }

    pub fn assistant(
        conversation_id: ConversationId,
        content: impl Into<String>,
        prompt_tokens: u32,
        completion_tokens: u32,
        cost_usd: f64,
    ) -> Self {
        Self {
            id: MessageId::new(),
            conversation_id,
            role: MessageRole::Assistant,
            content: content.into(),
            prompt_tokens,
            completion_tokens,
            cost_usd,
            created_at: Timestamp::now(),
        }
    }

    pub fn total_tokens(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_has_no_cost() {
        let msg = ChatMessage::user(ConversationId::new(), "hi", 1);
        assert_eq!(msg.role, MessageRole::User);
        assert_eq!(msg.completion_tokens, 0);
        assert_eq!(msg.cost_usd, 0.0);
    }

    #[test]
    fn assistant_message_totals_tokens() {
        let msg = ChatMessage::assistant(ConversationId::new(), "hello", 12, 30, 0.0001);
        assert_eq!(msg.total_tokens(), 42);
    }

    #[test]
    fn role_round_trips_through_storage_string() {
        for role in [MessageRole::User, MessageRole::Assistant, MessageRole::System] {
            assert_eq!(role.as_str().parse::<MessageRole>().unwrap(), role);
        }
        assert!("tool".parse::<MessageRole>().is_err());
    }
}

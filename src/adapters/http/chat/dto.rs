//! Request and response bodies for the chat endpoints.

use serde::{Deserialize, Serialize};

use crate::application::handlers::chat::{QuotaView, SendMessageResult};
use crate::domain::chat::{ChatMessage, ProviderKind};
use crate::domain::foundation::ConversationId;
use crate::ports::TokenUsage;

/// `POST /api/chat`
#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub conversation_id: Option<ConversationId>,
    pub content: String,
    #[serde(default)]
    pub provider: Option<ProviderKind>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendMessageResponse {
    pub conversation_id: ConversationId,
    pub title: String,
    pub provider: ProviderKind,
    pub model: String,
    /// True when this message opened the conversation.
    pub created: bool,
    pub user_message: ChatMessage,
    pub assistant_message: ChatMessage,
    pub usage: TokenUsage,
    pub quota: QuotaView,
}

impl From<SendMessageResult> for SendMessageResponse {
    fn from(result: SendMessageResult) -> Self {
        Self {
            conversation_id: result.conversation.id,
            title: result.conversation.title,
            provider: result.conversation.provider,
            model: result.conversation.model,
            created: result.created,
            user_message: result.user_message,
            assistant_message: result.assistant_message,
            usage: result.usage,
            quota: result.quota.into(),
        }
    }
}

/// `PATCH /api/conversations/:id`
#[derive(Debug, Clone, Deserialize)]
pub struct RenameConversationRequest {
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_request_needs_only_content() {
        let req: SendMessageRequest = serde_json::from_str(r#"{"content":"hello"}"#).unwrap();
        assert_eq!(req.content, "hello");
        assert!(req.conversation_id.is_none());
        assert!(req.provider.is_none());
    }

    #[test]
    fn send_request_parses_provider_names() {
        let req: SendMessageRequest = serde_json::from_str(
            r#"{"content":"hi","provider":"openrouter","model":"openai/gpt-4o"}"#,
        )
        .unwrap();
        assert_eq!(req.provider, Some(ProviderKind::OpenRouter));
        assert_eq!(req.model.as_deref(), Some("openai/gpt-4o"));
    }
}

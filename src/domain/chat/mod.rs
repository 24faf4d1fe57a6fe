//! Conversations, messages and the providers they are routed to.

mod content;
mod conversation;
mod message;
mod provider;

pub use content::{estimate_tokens, validate_content};
pub use conversation::{title_from_message, Conversation, TITLE_PREVIEW_CHARS};
pub use message::{ChatMessage, MessageRole};
pub use provider::ProviderKind;

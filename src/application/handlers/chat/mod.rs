//! Chat command and query handlers.

mod delete_conversation;
mod get_account;
mod get_conversation;
mod list_conversations;
mod list_models;
mod rename_conversation;
mod send_message;

pub use delete_conversation::{DeleteConversationCommand, DeleteConversationHandler};
pub use get_account::{AccountView, GetAccountHandler, QuotaView};
pub use get_conversation::{ConversationView, GetConversationHandler, GetConversationQuery};
pub use list_conversations::{ListConversationsHandler, ListConversationsQuery};
pub use list_models::{ListModelsHandler, ModelView, ModelsView, ProviderView};
pub use rename_conversation::{RenameConversationCommand, RenameConversationHandler};
pub use send_message::{
    ChatPorts, SendMessageCommand, SendMessageError, SendMessageHandler, SendMessageResult,
};

#[cfg(test)]
pub(crate) use send_message::test_support;

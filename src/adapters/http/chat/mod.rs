//! Chat endpoints: account, models, sending messages and conversations.

mod dto;
mod handlers;
mod routes;

pub use routes::chat_routes;

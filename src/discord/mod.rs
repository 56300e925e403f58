//! Chat-platform boundary: what the bot posts and how it renders it

pub mod embeds;
pub mod transport;

pub use embeds::EmbedMessage;
pub use transport::{ChatTransport, SerenityTransport, SharedChatTransport};

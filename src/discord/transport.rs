use async_trait::async_trait;
use poise::serenity_prelude::{self as serenity, ChannelId, Http, MessageId};
use std::sync::Arc;
use tracing::debug;

use crate::config::ReactionConfig;
use crate::discord::EmbedMessage;
use crate::error::Result;

/// Outbound side of the chat platform
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Post an embed, split over several messages if it has too many fields.
    /// Returns the ids of the posted messages in order.
    async fn post_embed(&self, channel: ChannelId, embed: &EmbedMessage) -> Result<Vec<MessageId>>;

    async fn post_text(&self, channel: ChannelId, text: &str) -> Result<MessageId>;

    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        reaction: &ReactionConfig,
    ) -> Result<()>;

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> Result<()>;
}

pub type SharedChatTransport = Arc<dyn ChatTransport>;

/// [`ChatTransport`] backed by the Discord HTTP API
pub struct SerenityTransport {
    http: Arc<Http>,
}

impl SerenityTransport {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ChatTransport for SerenityTransport {
    async fn post_embed(&self, channel: ChannelId, embed: &EmbedMessage) -> Result<Vec<MessageId>> {
        let mut ids = Vec::new();
        for page in embed.pages() {
            let message = channel
                .send_message(
                    self.http.as_ref(),
                    serenity::CreateMessage::new().embed(page.to_serenity()),
                )
                .await?;
            ids.push(message.id);
        }
        debug!("Posted {} embed message(s) to {}", ids.len(), channel);
        Ok(ids)
    }

    async fn post_text(&self, channel: ChannelId, text: &str) -> Result<MessageId> {
        let message = channel.say(self.http.as_ref(), text).await?;
        Ok(message.id)
    }

    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        reaction: &ReactionConfig,
    ) -> Result<()> {
        channel
            .create_reaction(self.http.as_ref(), message, reaction.reaction_type())
            .await?;
        Ok(())
    }

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> Result<()> {
        channel.delete_message(self.http.as_ref(), message).await?;
        Ok(())
    }
}

use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;
use tracing::{debug, error, Instrument};

use crate::models::{emoji_key, ReactionEvent};
use crate::Data;

/// Hand a reaction to the confirmation matcher on its own task
pub fn handle_reaction_add(reaction: &serenity::Reaction, data: &Data) {
    let Some(event) = reaction_event(
        reaction.message_id,
        reaction.channel_id,
        reaction.user_id,
        &reaction.emoji,
        data.bot_user_id,
        Utc::now(),
    ) else {
        return;
    };

    let matcher = data.matcher.clone();
    let span = crate::logging::reaction_span(event.message_id, event.channel_id);
    tokio::spawn(
        async move {
            match matcher.handle_reaction(&event).await {
                Ok(outcome) => debug!("Reaction by {} handled: {:?}", event.user_id, outcome),
                Err(e) => error!("Failed to handle reaction by {}: {}", event.user_id, e),
            }
        }
        .instrument(span),
    );
}

/// Reduce a gateway reaction to what the matcher needs.
/// Reactions without a user, and the bot's own reactions, are dropped.
fn reaction_event(
    message_id: serenity::MessageId,
    channel_id: serenity::ChannelId,
    user_id: Option<serenity::UserId>,
    emoji: &serenity::ReactionType,
    bot_user_id: serenity::UserId,
    received_at: DateTime<Utc>,
) -> Option<ReactionEvent> {
    let user_id = user_id.filter(|id| *id != bot_user_id)?;
    Some(ReactionEvent {
        message_id,
        channel_id,
        user_id,
        emoji: emoji_key(emoji),
        received_at,
    })
}

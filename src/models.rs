// src/models.rs
use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

use crate::config::GameServer;

/// Commands that require a confirmation reaction before they run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Ban,
    Restart,
}

impl CommandKind {
    pub const ALL: [CommandKind; 2] = [CommandKind::Ban, CommandKind::Restart];

    /// Name used for config lookups and approval rules
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Ban => "ban",
            CommandKind::Restart => "restart",
        }
    }

    /// Verb phrase used in user-facing messages ("Unable to find servers to ...")
    pub fn action_phrase(&self) -> &'static str {
        match self {
            CommandKind::Ban => "ban on",
            CommandKind::Restart => "restart",
        }
    }

    /// Human name of the payload, used when it is missing
    pub fn payload_field(&self) -> &'static str {
        match self {
            CommandKind::Ban => "player account name",
            CommandKind::Restart => "restart message",
        }
    }

    /// Payload synthesized when the invocation carries none.
    /// `None` means the payload is required.
    pub fn default_payload(&self, actor: &str) -> Option<String> {
        match self {
            CommandKind::Ban => None,
            CommandKind::Restart => Some(crate::messages::default_restart_message(actor)),
        }
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Which servers an invocation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerScope {
    /// Every enabled server of the guild
    All,
    /// A single server, by its Nitrado service id
    Single(u64),
}

/// Typed result of parsing a raw invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInvocation {
    pub command: CommandKind,
    pub scope: ServerScope,
    pub payload: String,
}

/// A parsed invocation with its target servers resolved from the guild feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub command: CommandKind,
    pub servers: Vec<GameServer>,
    /// Player name for bans, announcement text for restarts
    pub payload: String,
}

/// Durable record of an action waiting for its confirmation reaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    pub confirmation_key: String,
    pub message_id: serenity::MessageId,
    pub channel_id: serenity::ChannelId,
    pub expires_at: DateTime<Utc>,
    pub required_reactions: BTreeSet<String>,
    pub command: CommandKind,
    pub requesting_user: serenity::UserId,
    pub requesting_user_name: String,
    pub payload: ActionRequest,
}

impl PendingAction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        confirmation_key: String,
        message_id: serenity::MessageId,
        channel_id: serenity::ChannelId,
        required_reactions: BTreeSet<String>,
        requesting_user: serenity::UserId,
        requesting_user_name: &str,
        payload: ActionRequest,
        created_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        Self {
            confirmation_key,
            message_id,
            channel_id,
            expires_at: created_at.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
            required_reactions,
            command: payload.command,
            requesting_user,
            requesting_user_name: requesting_user_name.to_string(),
            payload,
        }
    }

    /// A record is live strictly before `expires_at`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Incoming reaction, reduced to what the matcher needs
#[derive(Debug, Clone)]
pub struct ReactionEvent {
    pub message_id: serenity::MessageId,
    pub channel_id: serenity::ChannelId,
    pub user_id: serenity::UserId,
    /// Custom emoji id, or the unicode emoji itself
    pub emoji: String,
    pub received_at: DateTime<Utc>,
}

/// Identifier used to compare a reaction against the configured emoji
pub fn emoji_key(reaction: &serenity::ReactionType) -> String {
    match reaction {
        serenity::ReactionType::Custom { id, .. } => id.to_string(),
        serenity::ReactionType::Unicode(name) => name.clone(),
        other => other.to_string(),
    }
}

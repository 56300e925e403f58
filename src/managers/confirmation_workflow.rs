use chrono::{DateTime, Utc};
use poise::serenity_prelude::{ChannelId, GuildId, MessageId, RoleId, UserId};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::commands::parser::parse_invocation;
use crate::config::BotConfig;
use crate::discord::{embeds, SharedChatTransport};
use crate::error::{BotError, Result};
use crate::managers::{AuthorizationGate, SharedGuildConfigSource};
use crate::models::{ActionRequest, CommandKind, PendingAction};
use crate::state::{AwaitEntry, SharedAwaitIndex, SharedRegistry};

/// A confirmable command as typed by a guild member
#[derive(Debug, Clone)]
pub struct Invocation {
    pub command: CommandKind,
    /// Full text including the command name, e.g. `"ban 12345 Steve"`
    pub text: String,
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub author_id: UserId,
    pub author_name: String,
    pub roles: Vec<RoleId>,
    pub requested_at: DateTime<Utc>,
}

/// Command side of the two-phase flow: validates an invocation, posts the
/// prompt and records what confirming it will do.
pub struct ConfirmationWorkflow {
    config: Arc<BotConfig>,
    guild_config: SharedGuildConfigSource,
    gate: AuthorizationGate,
    registry: SharedRegistry,
    index: SharedAwaitIndex,
    transport: SharedChatTransport,
}

impl ConfirmationWorkflow {
    pub fn new(
        config: Arc<BotConfig>,
        guild_config: SharedGuildConfigSource,
        registry: SharedRegistry,
        index: SharedAwaitIndex,
        transport: SharedChatTransport,
    ) -> Self {
        Self {
            gate: AuthorizationGate::new(guild_config.clone()),
            config,
            guild_config,
            registry,
            index,
            transport,
        }
    }

    /// Post a confirmation prompt for `invocation` and start awaiting its reaction.
    /// Returns the id of the prompt message.
    ///
    /// Nothing is left behind on failure: a prompt that could not be recorded
    /// is deleted, and a recorded prompt that could not be reacted to is
    /// forgotten again.
    pub async fn request_confirmation(&self, invocation: &Invocation) -> Result<MessageId> {
        let kind = invocation.command;
        let parsed = parse_invocation(
            kind,
            self.config.command_settings(kind),
            &invocation.text,
            &invocation.author_name,
        )?;

        let feed = self.guild_config.guild_feed(invocation.guild_id).await?;
        self.gate
            .authorize(&invocation.roles, kind.name(), &feed)
            .await?;

        let servers = feed.target_servers(parsed.scope);
        if servers.is_empty() {
            return Err(BotError::NoTargetServers {
                action: kind.action_phrase().to_string(),
            });
        }

        let reaction = self
            .config
            .reaction(kind)
            .cloned()
            .ok_or_else(|| BotError::MissingReactionConfig {
                command: kind.name().to_string(),
            })?;

        let request = ActionRequest {
            command: kind,
            servers,
            payload: parsed.payload,
        };

        let prompt = embeds::confirmation_prompt(
            &self.config,
            &request,
            &reaction.mention(),
            &invocation.author_name,
        );
        let message_id = self
            .transport
            .post_embed(invocation.channel_id, &prompt)
            .await?
            .first()
            .copied()
            .ok_or_else(|| BotError::ChatTransportFailure {
                message: "no messages in response".to_string(),
            })?;

        let cache = self.config.cache_settings(kind);
        let action = PendingAction::new(
            self.registry.key_for(kind, message_id),
            message_id,
            invocation.channel_id,
            BTreeSet::from([reaction.key()]),
            invocation.author_id,
            &invocation.author_name,
            request,
            invocation.requested_at,
            cache.ttl(),
        );

        if let Err(e) = self.registry.put(&action, cache.ttl()).await {
            warn!("Could not record pending {} {}: {}", kind, message_id, e);
            self.discard_prompt(invocation.channel_id, message_id).await;
            return Err(e);
        }

        // No await between the durable write and the index insert
        self.index.register(message_id, AwaitEntry::from(&action));

        if let Err(e) = self
            .transport
            .add_reaction(invocation.channel_id, message_id, &reaction)
            .await
        {
            warn!("Could not react to prompt {}: {}", message_id, e);
            // The durable record goes first; while it survives, the index
            // slot must keep blocking confirmation through the fallback
            match self.registry.remove(&action.confirmation_key).await {
                Ok(()) => self.index.remove(message_id),
                Err(remove_err) => {
                    warn!(
                        "Could not forget pending {}: {}",
                        action.confirmation_key, remove_err
                    );
                    self.index.retire(message_id, action.expires_at);
                }
            }
            self.discard_prompt(invocation.channel_id, message_id).await;
            return Err(e);
        }

        info!(
            "{} by {} awaiting confirmation on message {} until {}",
            kind, invocation.author_name, message_id, action.expires_at
        );
        Ok(message_id)
    }

    /// Tell the invoker why their command was rejected
    pub async fn report_error(&self, invocation: &Invocation, error: &BotError) -> Result<()> {
        let embed = embeds::error_message(
            &self.config,
            &format!("{} failed", invocation.command),
            &error.to_string(),
            &invocation.author_name,
        );
        self.transport
            .post_embed(invocation.channel_id, &embed)
            .await?;
        Ok(())
    }

    async fn discard_prompt(&self, channel_id: ChannelId, message_id: MessageId) {
        if let Err(e) = self.transport.delete_message(channel_id, message_id).await {
            warn!("Could not delete prompt {}: {}", message_id, e);
        }
    }
}

pub type SharedConfirmationWorkflow = Arc<ConfirmationWorkflow>;

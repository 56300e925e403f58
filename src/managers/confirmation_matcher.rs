use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::BotConfig;
use crate::discord::{embeds, SharedChatTransport};
use crate::error::{BotError, Result};
use crate::models::{CommandKind, ReactionEvent};
use crate::nitrado::SharedActionExecutor;
use crate::state::{AwaitEntry, Resolution, SharedAwaitIndex, SharedRegistry};

/// What became of a reaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The reaction confirmed a pending action and it ran on at least one server
    Executed { command: CommandKind, failed_servers: usize },
    /// The reaction confirmed a pending action but it could not be carried out
    Failed { command: CommandKind },
    /// The reaction did not confirm anything
    Ignored(Resolution),
}

/// Reaction side of the two-phase flow: turns the requester's reaction into
/// exactly one execution of the pending action.
pub struct ConfirmationMatcher {
    config: Arc<BotConfig>,
    index: SharedAwaitIndex,
    registry: SharedRegistry,
    executor: SharedActionExecutor,
    transport: SharedChatTransport,
}

impl ConfirmationMatcher {
    pub fn new(
        config: Arc<BotConfig>,
        index: SharedAwaitIndex,
        registry: SharedRegistry,
        executor: SharedActionExecutor,
        transport: SharedChatTransport,
    ) -> Self {
        Self {
            config,
            index,
            registry,
            executor,
            transport,
        }
    }

    /// Load every live pending action into the await index.
    /// Called once on startup so prompts posted before a restart stay confirmable.
    pub async fn rehydrate(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut restored = 0;
        for action in self.registry.live_actions(now).await? {
            if self
                .index
                .register_if_absent(action.message_id, AwaitEntry::from(&action))
            {
                restored += 1;
            }
        }
        info!("Restored {} pending confirmation(s)", restored);
        Ok(restored)
    }

    pub async fn handle_reaction(&self, event: &ReactionEvent) -> Result<MatchOutcome> {
        let mut resolution = self.index.resolve(
            event.message_id,
            event.user_id,
            &event.emoji,
            event.received_at,
        );

        if resolution == Resolution::NoSuchEntry {
            resolution = self.resolve_from_registry(event).await?;
        }

        match resolution {
            Resolution::Confirmed(entry) => self.execute(event, entry).await,
            Resolution::WrongUser => {
                debug!(
                    "User {} reacted to {} but did not request it",
                    event.user_id, event.message_id
                );
                if self.config.notify_wrong_user {
                    let notice = crate::messages::wrong_user_notice(&format!("<@{}>", event.user_id));
                    if let Err(e) = self.transport.post_text(event.channel_id, &notice).await {
                        warn!("Could not post wrong-user notice: {}", e);
                    }
                }
                Ok(MatchOutcome::Ignored(Resolution::WrongUser))
            }
            other => {
                debug!("Reaction on {} ignored: {:?}", event.message_id, other);
                Ok(MatchOutcome::Ignored(other))
            }
        }
    }

    /// The index may have lost the entry to a restart; the durable record is
    /// the source of truth while it lives.
    async fn resolve_from_registry(&self, event: &ReactionEvent) -> Result<Resolution> {
        let Some(action) = self
            .registry
            .find_by_message(event.message_id, event.received_at)
            .await?
        else {
            return Ok(Resolution::NoSuchEntry);
        };

        if self
            .index
            .register_if_absent(action.message_id, AwaitEntry::from(&action))
        {
            debug!("Restored {} from the registry", action.confirmation_key);
        }

        Ok(self.index.resolve(
            event.message_id,
            event.user_id,
            &event.emoji,
            event.received_at,
        ))
    }

    async fn execute(&self, event: &ReactionEvent, entry: AwaitEntry) -> Result<MatchOutcome> {
        let command = entry.command;
        let key = self.registry.key_for(command, event.message_id);

        let action = match self.registry.get(&key, event.received_at).await {
            Ok(Some(action)) => action,
            Ok(None) => {
                warn!("Pending action {} vanished before it could run", key);
                let e = BotError::ExecutionFailed {
                    action: command.name().to_string(),
                    message: "the confirmation is no longer available".to_string(),
                };
                self.report_failure(event, command, &e, &entry_actor(&entry))
                    .await;
                return Ok(MatchOutcome::Failed { command });
            }
            Err(e) => {
                error!("Could not load pending action {}: {}", key, e);
                self.report_failure(event, command, &e, &entry_actor(&entry))
                    .await;
                return Ok(MatchOutcome::Failed { command });
            }
        };

        // Forget the record before running so it can never be confirmed twice
        if let Err(e) = self.registry.remove(&key).await {
            warn!("Could not remove confirmed action {}: {}", key, e);
        }

        info!(
            "{} confirmed by {} on message {}",
            command, action.requesting_user_name, event.message_id
        );

        match self.executor.execute(&action.payload).await {
            Ok(outcomes) => {
                let failed_servers = outcomes.iter().filter(|o| o.error.is_some()).count();
                let embed = embeds::execution_result(
                    &self.config,
                    command,
                    &outcomes,
                    &action.requesting_user_name,
                );
                if let Err(e) = self.transport.post_embed(action.channel_id, &embed).await {
                    warn!("Could not post result of {}: {}", key, e);
                }
                Ok(MatchOutcome::Executed {
                    command,
                    failed_servers,
                })
            }
            Err(e) => {
                error!("{} on message {} failed: {}", command, event.message_id, e);
                self.report_failure(event, command, &e, &action.requesting_user_name)
                    .await;
                Ok(MatchOutcome::Failed { command })
            }
        }
    }

    async fn report_failure(&self, event: &ReactionEvent, command: CommandKind, e: &BotError, actor: &str) {
        let embed = embeds::error_message(
            &self.config,
            &format!("{} failed", command),
            &e.to_string(),
            actor,
        );
        if let Err(e) = self.transport.post_embed(event.channel_id, &embed).await {
            warn!("Could not report failure: {}", e);
        }
    }
}

fn entry_actor(entry: &AwaitEntry) -> String {
    format!("<@{}>", entry.requesting_user)
}

pub type SharedConfirmationMatcher = Arc<ConfirmationMatcher>;

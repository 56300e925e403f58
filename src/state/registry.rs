use chrono::{DateTime, Utc};
use poise::serenity_prelude::MessageId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::BotConfig;
use crate::error::{BotError, Result};
use crate::models::{CommandKind, PendingAction};
use crate::state::SharedPendingStore;

/// Extra time the store keeps a record past its TTL, so a reaction that
/// arrived just before expiry can still load it while being processed
const EVICTION_GRACE: Duration = Duration::from_secs(60);

/// Key of a pending action: `<namespace>:<message id>`
pub fn confirmation_key(namespace: &str, message_id: MessageId) -> String {
    format!("{}:{}", namespace, message_id)
}

/// Durable, TTL-bound record of every confirmation prompt the bot has posted
pub struct PendingActionRegistry {
    store: SharedPendingStore,

    /// Key namespace per command
    namespaces: HashMap<CommandKind, String>,
}

impl PendingActionRegistry {
    pub fn new(store: SharedPendingStore, config: &BotConfig) -> Self {
        let namespaces = CommandKind::ALL
            .into_iter()
            .map(|kind| (kind, config.cache_settings(kind).namespace))
            .collect();
        Self { store, namespaces }
    }

    pub fn key_for(&self, command: CommandKind, message_id: MessageId) -> String {
        let namespace = self
            .namespaces
            .get(&command)
            .map(String::as_str)
            .unwrap_or_else(|| command.name());
        confirmation_key(namespace, message_id)
    }

    /// Write `action` under its confirmation key, replacing any previous one
    pub async fn put(&self, action: &PendingAction, ttl: Duration) -> Result<()> {
        let value = serde_json::to_string(action)?;
        self.store
            .put(&action.confirmation_key, value, ttl.saturating_add(EVICTION_GRACE))
            .await
            .map_err(storage_unavailable)
    }

    /// Look up a live pending action. Records past `expires_at` are reported
    /// as absent even if the store has not evicted them yet.
    pub async fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<PendingAction>> {
        let Some(value) = self.store.get(key).await.map_err(storage_unavailable)? else {
            return Ok(None);
        };

        let action: PendingAction = match serde_json::from_str(&value) {
            Ok(action) => action,
            Err(e) => {
                warn!("Discarding unreadable pending action {}: {}", key, e);
                return Ok(None);
            }
        };

        if action.is_expired(now) {
            debug!("Pending action {} expired at {}", key, action.expires_at);
            return Ok(None);
        }

        Ok(Some(action))
    }

    /// Find the live pending action posted as `message_id`, whatever its command
    pub async fn find_by_message(
        &self,
        message_id: MessageId,
        now: DateTime<Utc>,
    ) -> Result<Option<PendingAction>> {
        for command in CommandKind::ALL {
            let key = self.key_for(command, message_id);
            if let Some(action) = self.get(&key, now).await? {
                return Ok(Some(action));
            }
        }
        Ok(None)
    }

    pub async fn remove(&self, key: &str) -> Result<()> {
        self.store.delete(key).await.map_err(storage_unavailable)
    }

    /// Every live pending action, used to rebuild the await index on startup
    pub async fn live_actions(&self, now: DateTime<Utc>) -> Result<Vec<PendingAction>> {
        let mut actions = Vec::new();
        for namespace in self.namespaces.values() {
            let prefix = format!("{}:", namespace);
            let keys = self
                .store
                .keys_with_prefix(&prefix)
                .await
                .map_err(storage_unavailable)?;
            for key in keys {
                if let Some(action) = self.get(&key, now).await? {
                    actions.push(action);
                }
            }
        }
        Ok(actions)
    }
}

fn storage_unavailable(e: BotError) -> BotError {
    match e {
        BotError::StorageUnavailable { .. } => e,
        other => BotError::StorageUnavailable {
            message: other.to_string(),
        },
    }
}

/// Shared registry type
pub type SharedRegistry = Arc<PendingActionRegistry>;

pub fn create_shared_registry(store: SharedPendingStore, config: &BotConfig) -> SharedRegistry {
    Arc::new(PendingActionRegistry::new(store, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::JsonPendingStore;
    use crate::testing::{pending_action, FailingStore};

    fn registry() -> PendingActionRegistry {
        PendingActionRegistry::new(Arc::new(JsonPendingStore::ephemeral()), &BotConfig::default())
    }

    #[test]
    fn test_key_uses_command_namespace() {
        let registry = registry();
        assert_eq!(
            registry.key_for(CommandKind::Ban, MessageId::new(77)),
            "ban_reaction:77"
        );
        assert_eq!(
            registry.key_for(CommandKind::Restart, MessageId::new(77)),
            "restart_reaction:77"
        );
    }

    #[tokio::test]
    async fn test_put_then_get_within_ttl() {
        let registry = registry();
        let now = Utc::now();
        let action = pending_action(&registry, CommandKind::Ban, 10, 1, now, 300);

        registry.put(&action, Duration::from_secs(300)).await.unwrap();
        let found = registry.get(&action.confirmation_key, now).await.unwrap();
        assert_eq!(found, Some(action));
    }

    #[tokio::test]
    async fn test_get_after_expiry_is_absent() {
        let registry = registry();
        let now = Utc::now();
        let action = pending_action(&registry, CommandKind::Restart, 11, 1, now, 300);
        registry.put(&action, Duration::from_secs(300)).await.unwrap();

        // Still physically stored, but past expires_at
        let later = now + chrono::Duration::seconds(301);
        assert_eq!(registry.get(&action.confirmation_key, later).await.unwrap(), None);
        assert!(registry.find_by_message(MessageId::new(11), later).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_message_checks_every_namespace() {
        let registry = registry();
        let now = Utc::now();
        let action = pending_action(&registry, CommandKind::Restart, 12, 1, now, 300);
        registry.put(&action, Duration::from_secs(300)).await.unwrap();

        let found = registry.find_by_message(MessageId::new(12), now).await.unwrap();
        assert_eq!(found.map(|a| a.command), Some(CommandKind::Restart));
    }

    #[tokio::test]
    async fn test_live_actions() {
        let registry = registry();
        let now = Utc::now();
        for (message, command) in [(20, CommandKind::Ban), (21, CommandKind::Restart)] {
            let action = pending_action(&registry, command, message, 1, now, 300);
            registry.put(&action, Duration::from_secs(300)).await.unwrap();
        }

        assert_eq!(registry.live_actions(now).await.unwrap().len(), 2);
        let later = now + chrono::Duration::seconds(400);
        assert!(registry.live_actions(later).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_backend_failure_is_storage_unavailable() {
        let registry =
            PendingActionRegistry::new(Arc::new(FailingStore), &BotConfig::default());
        let now = Utc::now();
        let action = pending_action(&registry, CommandKind::Ban, 30, 1, now, 300);

        let err = registry.put(&action, Duration::from_secs(300)).await.unwrap_err();
        assert!(matches!(err, BotError::StorageUnavailable { .. }));
        assert!(registry.get("ban_reaction:30", now).await.is_err());
    }
}

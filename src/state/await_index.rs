use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use poise::serenity_prelude::{MessageId, UserId};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;
use tracing::{debug, info};

use crate::models::{CommandKind, PendingAction};

/// In-memory view of a prompt that is waiting for its reaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwaitEntry {
    pub expires_at: DateTime<Utc>,
    pub required_reactions: HashSet<String>,
    pub command: CommandKind,
    pub requesting_user: UserId,
}

impl From<&PendingAction> for AwaitEntry {
    fn from(action: &PendingAction) -> Self {
        Self {
            expires_at: action.expires_at,
            required_reactions: action.required_reactions.iter().cloned().collect(),
            command: action.command,
            requesting_user: action.requesting_user,
        }
    }
}

/// Result of matching a reaction against the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    NoSuchEntry,
    Expired,
    WrongUser,
    WrongReaction,
    /// The entry has been claimed; nobody else can confirm it
    Confirmed(AwaitEntry),
}

#[derive(Debug, Clone)]
enum Slot {
    Awaiting(AwaitEntry),
    /// Confirmed and being executed. Kept until its original expiry so a
    /// late fallback lookup in the durable registry cannot revive it.
    Consumed { until: DateTime<Utc> },
}

impl Slot {
    fn expires_at(&self) -> DateTime<Utc> {
        match self {
            Slot::Awaiting(entry) => entry.expires_at,
            Slot::Consumed { until } => *until,
        }
    }
}

/// Messages currently awaiting a confirmation reaction.
///
/// Every transition of a key happens under that key's shard lock, so two
/// concurrent resolvers can never both see `Confirmed`.
#[derive(Debug, Default)]
pub struct AwaitIndex {
    entries: DashMap<MessageId, Slot>,
}

impl AwaitIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `entry`, replacing anything stored for the message
    pub fn register(&self, message_id: MessageId, entry: AwaitEntry) {
        self.entries.insert(message_id, Slot::Awaiting(entry));
        debug!("Message {} is awaiting a reaction", message_id);
    }

    /// Insert `entry` only if nothing is stored for the message.
    /// Returns whether it was inserted.
    pub fn register_if_absent(&self, message_id: MessageId, entry: AwaitEntry) -> bool {
        match self.entries.entry(message_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::Awaiting(entry));
                true
            }
        }
    }

    pub fn resolve(
        &self,
        message_id: MessageId,
        user: UserId,
        emoji: &str,
        now: DateTime<Utc>,
    ) -> Resolution {
        let Entry::Occupied(mut occupied) = self.entries.entry(message_id) else {
            return Resolution::NoSuchEntry;
        };

        let entry = match occupied.get() {
            Slot::Consumed { .. } => return Resolution::NoSuchEntry,
            Slot::Awaiting(entry) => entry,
        };

        if now >= entry.expires_at {
            occupied.remove();
            return Resolution::Expired;
        }
        if user != entry.requesting_user {
            return Resolution::WrongUser;
        }
        if !entry.required_reactions.contains(emoji) {
            return Resolution::WrongReaction;
        }

        let until = entry.expires_at;
        match occupied.insert(Slot::Consumed { until }) {
            Slot::Awaiting(entry) => Resolution::Confirmed(entry),
            Slot::Consumed { .. } => Resolution::NoSuchEntry,
        }
    }

    /// Whether the message is still waiting for its reaction
    pub fn is_awaiting(&self, message_id: MessageId) -> bool {
        matches!(
            self.entries.get(&message_id).as_deref(),
            Some(Slot::Awaiting(_))
        )
    }

    /// Drop whatever is stored for the message
    pub fn remove(&self, message_id: MessageId) {
        self.entries.remove(&message_id);
    }

    /// Stop the message from ever resolving again, including through a
    /// registry fallback, until `until` has passed
    pub fn retire(&self, message_id: MessageId, until: DateTime<Utc>) {
        self.entries.insert(message_id, Slot::Consumed { until });
        debug!("Message {} retired until {}", message_id, until);
    }

    /// Remove every entry whose expiry has passed, returning how many were removed
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, slot| now < slot.expires_at());
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shared await index type
pub type SharedAwaitIndex = Arc<AwaitIndex>;

pub fn create_shared_await_index() -> SharedAwaitIndex {
    Arc::new(AwaitIndex::new())
}

/// Periodically sweep expired entries so abandoned prompts don't pile up
pub fn spawn_sweeper(index: SharedAwaitIndex, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = IntervalStream::new(tokio::time::interval(period));
        while ticks.next().await.is_some() {
            let removed = index.sweep(Utc::now());
            if removed > 0 {
                info!(
                    "Swept {} expired confirmation(s), {} remaining",
                    removed,
                    index.len()
                );
            }
        }
    })
}

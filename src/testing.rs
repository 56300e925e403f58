//! Recording doubles for the bot's collaborators, so workflows can be tested
//! without Discord, Nitrado or the guild config service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use poise::serenity_prelude::{ChannelId, GuildId, MessageId, RoleId, UserId};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use crate::config::{GameServer, GuildFeed, ReactionConfig};
use crate::discord::{ChatTransport, EmbedMessage};
use crate::error::{BotError, GuildConfigError, Result};
use crate::managers::GuildConfigSource;
use crate::models::{ActionRequest, CommandKind, PendingAction};
use crate::nitrado::{ActionExecutor, ServerOutcome};
use crate::state::{JsonPendingStore, PendingActionRegistry, PendingStore};

// ── StaticGuildConfig ─────────────────────────────────────────────────────────

/// Guild config source answering from memory
pub struct StaticGuildConfig {
    feed: std::result::Result<GuildFeed, GuildConfigError>,
    admin_roles: Vec<RoleId>,
    admin_check_fails: bool,
    admin_checks: AtomicUsize,
}

impl StaticGuildConfig {
    pub fn new(feed: GuildFeed) -> Self {
        Self {
            feed: Ok(feed),
            admin_roles: vec![],
            admin_check_fails: false,
            admin_checks: AtomicUsize::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            feed: Err(GuildConfigError::Unavailable {
                message: "connection refused".to_string(),
            }),
            ..Self::new(GuildFeed::default())
        }
    }

    pub fn with_admin_role(mut self, role: RoleId) -> Self {
        self.admin_roles.push(role);
        self
    }

    pub fn failing_admin_check(mut self) -> Self {
        self.admin_check_fails = true;
        self
    }

    /// How many times the global admin list was consulted
    pub fn admin_checks(&self) -> usize {
        self.admin_checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GuildConfigSource for StaticGuildConfig {
    async fn guild_feed(&self, _guild_id: GuildId) -> std::result::Result<GuildFeed, GuildConfigError> {
        self.feed.clone()
    }

    async fn is_global_admin(&self, roles: &[RoleId]) -> std::result::Result<bool, GuildConfigError> {
        self.admin_checks.fetch_add(1, Ordering::SeqCst);
        if self.admin_check_fails {
            return Err(GuildConfigError::Unavailable {
                message: "timeout".to_string(),
            });
        }
        Ok(roles.iter().any(|r| self.admin_roles.contains(r)))
    }
}

// ── RecordingTransport ────────────────────────────────────────────────────────

/// Records every message, reaction and deletion
#[derive(Default)]
pub struct RecordingTransport {
    embeds: Mutex<Vec<(ChannelId, EmbedMessage)>>,
    texts: Mutex<Vec<(ChannelId, String)>>,
    reactions: Mutex<Vec<(MessageId, String)>>,
    deleted: Mutex<Vec<MessageId>>,
    posted: Mutex<Vec<MessageId>>,
    next_id: AtomicU64,
    fail_posts: AtomicBool,
    fail_reactions: AtomicBool,
    hang_posts: AtomicBool,
    hang_reactions: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1000),
            ..Default::default()
        }
    }

    pub fn embeds(&self) -> Vec<(ChannelId, EmbedMessage)> {
        self.embeds.lock().clone()
    }

    pub fn texts(&self) -> Vec<(ChannelId, String)> {
        self.texts.lock().clone()
    }

    pub fn reactions(&self) -> Vec<(MessageId, String)> {
        self.reactions.lock().clone()
    }

    pub fn deleted(&self) -> Vec<MessageId> {
        self.deleted.lock().clone()
    }

    /// Ids of every message posted, in order
    pub fn posted_ids(&self) -> Vec<MessageId> {
        self.posted.lock().clone()
    }

    /// Posts never complete
    pub fn hang_posts(&self) {
        self.hang_posts.store(true, Ordering::SeqCst);
    }

    /// Reactions never complete
    pub fn hang_reactions(&self) {
        self.hang_reactions.store(true, Ordering::SeqCst);
    }

    pub fn fail_posts(&self) {
        self.fail_posts.store(true, Ordering::SeqCst);
    }

    pub fn fail_reactions(&self) {
        self.fail_reactions.store(true, Ordering::SeqCst);
    }

    fn next_message_id(&self) -> MessageId {
        MessageId::new(self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn post_embed(&self, channel: ChannelId, embed: &EmbedMessage) -> Result<Vec<MessageId>> {
        if self.hang_posts.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_posts.load(Ordering::SeqCst) {
            return Err(BotError::ChatTransportFailure {
                message: "Missing Access".to_string(),
            });
        }
        let mut ids = Vec::new();
        for page in embed.pages() {
            let id = self.next_message_id();
            self.embeds.lock().push((channel, page));
            self.posted.lock().push(id);
            ids.push(id);
        }
        Ok(ids)
    }

    async fn post_text(&self, channel: ChannelId, text: &str) -> Result<MessageId> {
        self.texts.lock().push((channel, text.to_string()));
        Ok(self.next_message_id())
    }

    async fn add_reaction(
        &self,
        _channel: ChannelId,
        message: MessageId,
        reaction: &ReactionConfig,
    ) -> Result<()> {
        if self.hang_reactions.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_reactions.load(Ordering::SeqCst) {
            return Err(BotError::ChatTransportFailure {
                message: "Unknown Emoji".to_string(),
            });
        }
        self.reactions.lock().push((message, reaction.key()));
        Ok(())
    }

    async fn delete_message(&self, _channel: ChannelId, message: MessageId) -> Result<()> {
        self.deleted.lock().push(message);
        Ok(())
    }
}

// ── RecordingExecutor ─────────────────────────────────────────────────────────

/// Records executed requests; every server succeeds unless told otherwise
#[derive(Default)]
pub struct RecordingExecutor {
    calls: Mutex<Vec<ActionRequest>>,
    fail: AtomicBool,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ActionRequest> {
        self.calls.lock().clone()
    }

    pub fn fail_all(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ActionExecutor for RecordingExecutor {
    async fn execute(&self, request: &ActionRequest) -> Result<Vec<ServerOutcome>> {
        self.calls.lock().push(request.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(BotError::ExecutionFailed {
                action: request.command.name().to_string(),
                message: "service unavailable".to_string(),
            });
        }
        Ok(request
            .servers
            .iter()
            .map(|s| ServerOutcome {
                server_name: s.name.clone(),
                error: None,
            })
            .collect())
    }
}

// ── FailingStore ──────────────────────────────────────────────────────────────

/// Durable store whose backend is always down
pub struct FailingStore;

#[async_trait]
impl PendingStore for FailingStore {
    async fn put(&self, _key: &str, _value: String, _ttl: Duration) -> Result<()> {
        Err(unavailable())
    }

    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(unavailable())
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Err(unavailable())
    }

    async fn keys_with_prefix(&self, _prefix: &str) -> Result<Vec<String>> {
        Err(unavailable())
    }
}

// ── UndeletableStore ──────────────────────────────────────────────────────────

/// In-memory store whose deletes always fail
pub struct UndeletableStore(JsonPendingStore);

impl UndeletableStore {
    pub fn new() -> Self {
        Self(JsonPendingStore::ephemeral())
    }
}

#[async_trait]
impl PendingStore for UndeletableStore {
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        self.0.put(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.0.get(key).await
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Err(unavailable())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        self.0.keys_with_prefix(prefix).await
    }
}

// ── StalledStore ──────────────────────────────────────────────────────────────

/// Empty store whose writes never complete
pub struct StalledStore;

#[async_trait]
impl PendingStore for StalledStore {
    async fn put(&self, _key: &str, _value: String, _ttl: Duration) -> Result<()> {
        std::future::pending().await
    }

    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    async fn keys_with_prefix(&self, _prefix: &str) -> Result<Vec<String>> {
        Ok(vec![])
    }
}

fn unavailable() -> BotError {
    BotError::StorageUnavailable {
        message: "disk full".to_string(),
    }
}

// ── Fixtures ──────────────────────────────────────────────────────────────────

/// Local HTTP endpoint that accepts connections and never answers
pub async fn silent_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{}", addr)
}

pub fn game_server(id: u64, nitrado_id: u64, name: &str) -> GameServer {
    GameServer {
        id,
        nitrado_id,
        name: name.to_string(),
        enabled: true,
    }
}

/// Pending ban/restart posted as `message_id` by `user_id`, confirmable with ✅
pub fn pending_action(
    registry: &PendingActionRegistry,
    command: CommandKind,
    message_id: u64,
    user_id: u64,
    created_at: DateTime<Utc>,
    ttl_secs: u64,
) -> PendingAction {
    let message_id = MessageId::new(message_id);
    PendingAction::new(
        registry.key_for(command, message_id),
        message_id,
        ChannelId::new(500),
        BTreeSet::from(["✅".to_string()]),
        UserId::new(user_id),
        "alice",
        ActionRequest {
            command,
            servers: vec![game_server(1, 12345, "Island")],
            payload: "Steve Smith".to_string(),
        },
        created_at,
        Duration::from_secs(ttl_secs),
    )
}

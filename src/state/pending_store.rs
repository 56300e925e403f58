use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{BotError, Result};

/// Durable key-value store with per-key expiry
///
/// Absence is `Ok(None)`; `Err` is reserved for backend failures.
#[async_trait]
pub trait PendingStore: Send + Sync {
    /// Insert or overwrite `key`, evicting it after `ttl`
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Live keys starting with `prefix`
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}

pub type SharedPendingStore = Arc<dyn PendingStore>;

/// On-disk layout of the store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoreFile {
    /// Schema version
    version: u32,

    /// Key -> stored value
    entries: HashMap<String, StoredValue>,
}

impl Default for StoreFile {
    fn default() -> Self {
        Self {
            version: 2,
            entries: HashMap::new(),
        }
    }
}

impl StoreFile {
    /// Drop entries whose TTL has run out, returning how many were dropped
    fn evict_expired(&mut self, now: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, v| v.is_live(now));
        before - self.entries.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoredValue {
    value: String,

    /// Unix milliseconds after which the entry is gone
    evict_at_ms: u64,
}

impl StoredValue {
    fn is_live(&self, now_ms: u64) -> bool {
        now_ms < self.evict_at_ms
    }
}

/// Pending-action store kept in memory and mirrored to a JSON file
pub struct JsonPendingStore {
    /// `None` keeps everything in memory
    path: Option<String>,
    state: RwLock<StoreFile>,
}

impl JsonPendingStore {
    /// Load from file or start empty if it does not exist
    pub async fn open(path: &str) -> Result<Self> {
        let mut file = match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                serde_json::from_str::<StoreFile>(&content).map_err(|e| {
                    BotError::StorageUnavailable {
                        message: format!("failed to parse {}: {}", path, e),
                    }
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreFile::default(),
            Err(e) => {
                return Err(BotError::StorageUnavailable {
                    message: format!("failed to read {}: {}", path, e),
                })
            }
        };

        let evicted = file.evict_expired(current_timestamp_ms());
        info!(
            "Loaded {} pending action(s) from {} ({} expired)",
            file.entries.len(),
            path,
            evicted
        );

        Ok(Self {
            path: Some(path.to_string()),
            state: RwLock::new(file),
        })
    }

    /// Store that never touches the disk
    #[cfg(test)]
    pub fn ephemeral() -> Self {
        Self {
            path: None,
            state: RwLock::new(StoreFile::default()),
        }
    }

    /// Save to file atomically
    async fn persist(&self, file: &StoreFile) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let content = serde_json::to_string_pretty(file)?;

        let temp_path = format!("{}.tmp", path);
        tokio::fs::write(&temp_path, &content)
            .await
            .map_err(|e| BotError::StorageUnavailable {
                message: format!("failed to write {}: {}", temp_path, e),
            })?;

        tokio::fs::rename(&temp_path, path)
            .await
            .map_err(|e| BotError::StorageUnavailable {
                message: format!("failed to replace {}: {}", path, e),
            })
    }
}

#[async_trait]
impl PendingStore for JsonPendingStore {
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let now = since_epoch();
        let mut state = self.state.write().await;

        // Changes become visible only once they are on disk, so a failed or
        // cancelled write leaves the previous state in place
        let mut next = state.clone();
        next.evict_expired(millis_floor(now));
        // A zero TTL is already gone
        let evict_at_ms = if ttl.is_zero() {
            millis_floor(now)
        } else {
            millis_ceil(now.saturating_add(ttl))
        };
        next.entries.insert(key.to_string(), StoredValue { value, evict_at_ms });
        self.persist(&next).await?;
        *state = next;

        debug!("Stored pending action {}", key);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = current_timestamp_ms();
        let state = self.state.read().await;
        Ok(state
            .entries
            .get(key)
            .filter(|v| v.is_live(now))
            .map(|v| v.value.clone()))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.entries.contains_key(key) {
            return Ok(());
        }

        let mut next = state.clone();
        next.entries.remove(key);
        self.persist(&next).await?;
        *state = next;
        debug!("Deleted pending action {}", key);
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let now = current_timestamp_ms();
        let state = self.state.read().await;
        Ok(state
            .entries
            .iter()
            .filter(|(k, v)| k.starts_with(prefix) && v.is_live(now))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

fn since_epoch() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}

fn millis_floor(at: Duration) -> u64 {
    u64::try_from(at.as_millis()).unwrap_or(u64::MAX)
}

/// Rounded up, so an entry is never evicted before its full TTL has passed
fn millis_ceil(at: Duration) -> u64 {
    let floor = millis_floor(at);
    if at.subsec_nanos() % 1_000_000 == 0 {
        floor
    } else {
        floor.saturating_add(1)
    }
}

fn current_timestamp_ms() -> u64 {
    millis_floor(since_epoch())
}

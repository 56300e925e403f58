use async_trait::async_trait;
use poise::serenity_prelude::{GuildId, RoleId};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{GlobalAdminsConfig, GuildFeed};
use crate::error::{BotError, GuildConfigError, Result as BotResult};

/// Source of per-guild approval rules and server lists
#[async_trait]
pub trait GuildConfigSource: Send + Sync {
    async fn guild_feed(&self, guild_id: GuildId) -> Result<GuildFeed, GuildConfigError>;

    /// Whether any of `roles` belongs to a global admin
    async fn is_global_admin(&self, roles: &[RoleId]) -> Result<bool, GuildConfigError>;
}

pub type SharedGuildConfigSource = Arc<dyn GuildConfigSource>;

/// Reads guild feeds from JSON files
///
/// Structure:
/// data/
/// ├── global/
/// │   └── admins.json       # Global admin role ids
/// └── guilds/
///     └── {guild_id}.json   # Approval rules and servers
pub struct FileGuildConfigSource {
    data_path: String,
}

impl FileGuildConfigSource {
    pub fn new(data_path: &str) -> Self {
        Self {
            data_path: data_path.to_string(),
        }
    }

    fn guild_path(&self, guild_id: GuildId) -> String {
        format!("{}/guilds/{}.json", self.data_path, guild_id)
    }

    fn admins_path(&self) -> String {
        format!("{}/global/admins.json", self.data_path)
    }
}

#[async_trait]
impl GuildConfigSource for FileGuildConfigSource {
    async fn guild_feed(&self, guild_id: GuildId) -> Result<GuildFeed, GuildConfigError> {
        let path = self.guild_path(guild_id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(GuildConfigError::NotConfigured {
                    guild_id: guild_id.to_string(),
                });
            }
            Err(e) => {
                return Err(GuildConfigError::Unavailable {
                    message: format!("failed to read {}: {}", path, e),
                });
            }
        };

        serde_json::from_str(&content).map_err(|e| {
            warn!("Guild feed {} is not valid JSON: {}", path, e);
            GuildConfigError::Unavailable {
                message: format!("failed to parse {}: {}", path, e),
            }
        })
    }

    async fn is_global_admin(&self, roles: &[RoleId]) -> Result<bool, GuildConfigError> {
        let path = self.admins_path();
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No global admins configured at {}", path);
                return Ok(false);
            }
            Err(e) => {
                return Err(GuildConfigError::Unavailable {
                    message: format!("failed to read {}: {}", path, e),
                });
            }
        };

        let admins: GlobalAdminsConfig =
            serde_json::from_str(&content).map_err(|e| GuildConfigError::Unavailable {
                message: format!("failed to parse {}: {}", path, e),
            })?;
        Ok(admins.contains_any(roles))
    }
}

/// Fetches guild feeds from the guild config service over HTTP
pub struct HttpGuildConfigSource {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpGuildConfigSource {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> BotResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BotError::Internal {
                message: format!("Failed to build guild config HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Build from GUILD_CONFIG_URL / GUILD_CONFIG_TOKEN, `None` when no URL is set
    pub fn from_env(timeout: Duration) -> BotResult<Option<Self>> {
        let Ok(url) = std::env::var("GUILD_CONFIG_URL") else {
            return Ok(None);
        };
        Self::new(&url, std::env::var("GUILD_CONFIG_TOKEN").ok(), timeout).map(Some)
    }

    async fn fetch(&self, path: &str) -> Result<reqwest::Response, GuildConfigError> {
        let mut request = self.client.get(format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request
            .send()
            .await
            .map_err(|e| GuildConfigError::Unavailable {
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl GuildConfigSource for HttpGuildConfigSource {
    async fn guild_feed(&self, guild_id: GuildId) -> Result<GuildFeed, GuildConfigError> {
        let response = self.fetch(&format!("/guilds/{}/feed", guild_id)).await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(GuildConfigError::NotConfigured {
                guild_id: guild_id.to_string(),
            });
        }

        let response = response
            .error_for_status()
            .map_err(|e| GuildConfigError::Unavailable {
                message: e.to_string(),
            })?;

        response
            .json::<GuildFeed>()
            .await
            .map_err(|e| GuildConfigError::Unavailable {
                message: format!("invalid guild feed: {}", e),
            })
    }

    async fn is_global_admin(&self, roles: &[RoleId]) -> Result<bool, GuildConfigError> {
        let response = self
            .fetch("/admins")
            .await?
            .error_for_status()
            .map_err(|e| GuildConfigError::Unavailable {
                message: e.to_string(),
            })?;

        let admins: GlobalAdminsConfig =
            response
                .json()
                .await
                .map_err(|e| GuildConfigError::Unavailable {
                    message: format!("invalid admin list: {}", e),
                })?;
        Ok(admins.contains_any(roles))
    }
}

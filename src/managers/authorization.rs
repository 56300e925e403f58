use poise::serenity_prelude::RoleId;
use tracing::{debug, warn};

use crate::config::GuildFeed;
use crate::error::{BotError, Result};
use crate::managers::SharedGuildConfigSource;

/// Whether the guild's approval rules allow any of `roles` to run `command`
pub fn is_authorized(roles: &[RoleId], command: &str, feed: &GuildFeed) -> bool {
    let approved = feed.approved_roles(command);
    roles.iter().any(|r| approved.contains(r))
}

/// Decides whether an actor may run a command: guild approval first, then the
/// global admin list. The admin list is only fetched when guild approval fails.
pub struct AuthorizationGate {
    source: SharedGuildConfigSource,
}

impl AuthorizationGate {
    pub fn new(source: SharedGuildConfigSource) -> Self {
        Self { source }
    }

    pub async fn authorize(&self, roles: &[RoleId], command: &str, feed: &GuildFeed) -> Result<()> {
        if is_authorized(roles, command, feed) {
            debug!("Command '{}' approved by guild roles", command);
            return Ok(());
        }

        match self.source.is_global_admin(roles).await {
            Ok(true) => {
                debug!("Command '{}' approved by global admin role", command);
                Ok(())
            }
            Ok(false) => Err(BotError::Unauthorized),
            Err(e) => {
                warn!("Global admin check failed for '{}': {}", command, e);
                Err(BotError::AdminCheckFailed { source: e })
            }
        }
    }
}

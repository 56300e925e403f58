use poise::serenity_prelude::RoleId;
use serde::{Deserialize, Serialize};

use crate::models::ServerScope;

/// A game server registered for a guild
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameServer {
    /// Id assigned by the guild configuration
    pub id: u64,

    /// Nitrado service id, the one users type in commands
    pub nitrado_id: u64,

    pub name: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Roles allowed to run a command in a guild
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandApproval {
    pub command: String,
    pub role_ids: Vec<RoleId>,
}

/// Per-guild configuration: approval rules and servers
/// Loaded from data/guilds/{guild_id}.json or the guild config service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildFeed {
    #[serde(default)]
    pub approvals: Vec<CommandApproval>,

    #[serde(default)]
    pub servers: Vec<GameServer>,
}

impl GuildFeed {
    /// Roles approved for a command (empty if the command has no rule)
    pub fn approved_roles(&self, command: &str) -> &[RoleId] {
        self.approvals
            .iter()
            .find(|a| a.command.eq_ignore_ascii_case(command))
            .map(|a| a.role_ids.as_slice())
            .unwrap_or_default()
    }

    /// Enabled servers matching the scope
    pub fn target_servers(&self, scope: ServerScope) -> Vec<GameServer> {
        let enabled = self.servers.iter().filter(|s| s.enabled);
        match scope {
            ServerScope::All => enabled.cloned().collect(),
            ServerScope::Single(nitrado_id) => enabled
                .filter(|s| s.nitrado_id == nitrado_id)
                .take(1)
                .cloned()
                .collect(),
        }
    }
}

/// Roles allowed to run any command in any guild
/// Loaded from data/global/admins.json
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalAdminsConfig {
    pub role_ids: Vec<RoleId>,
}

impl GlobalAdminsConfig {
    pub fn contains_any(&self, roles: &[RoleId]) -> bool {
        roles.iter().any(|r| self.role_ids.contains(r))
    }
}

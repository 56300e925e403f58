use poise::serenity_prelude as serenity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{BotError, Result};
use crate::models::CommandKind;

const DEFAULT_TTL_SECS: u64 = 300;

/// Emoji a user presses to confirm a command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReactionConfig {
    /// Emoji name, or the unicode emoji itself
    pub name: String,

    /// Custom emoji id (unset for unicode emoji)
    #[serde(default)]
    pub id: Option<u64>,

    #[serde(default)]
    pub animated: bool,
}

impl ReactionConfig {
    pub fn unicode(emoji: &str) -> Self {
        Self {
            name: emoji.to_string(),
            id: None,
            animated: false,
        }
    }

    /// Custom emoji id; `0` is not a valid snowflake and counts as unset
    fn custom_id(&self) -> Option<u64> {
        self.id.filter(|id| *id != 0)
    }

    /// Identifier matched against incoming reactions
    pub fn key(&self) -> String {
        match self.custom_id() {
            Some(id) => id.to_string(),
            None => self.name.clone(),
        }
    }

    /// Inline form used in message text
    pub fn mention(&self) -> String {
        match self.custom_id() {
            Some(id) if self.animated => format!("<a:{}:{}>", self.name, id),
            Some(id) => format!("<:{}:{}>", self.name, id),
            None => self.name.clone(),
        }
    }

    pub fn reaction_type(&self) -> serenity::ReactionType {
        match self.custom_id() {
            Some(id) => serenity::ReactionType::Custom {
                animated: self.animated,
                id: serenity::EmojiId::new(id),
                name: Some(self.name.clone()),
            },
            None => serenity::ReactionType::Unicode(self.name.clone()),
        }
    }
}

/// Argument bounds for a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandSettings {
    pub min_args: usize,

    /// `None` means unbounded
    #[serde(default)]
    pub max_args: Option<usize>,
}

impl CommandSettings {
    fn default_for(kind: CommandKind) -> Self {
        match kind {
            CommandKind::Ban => Self {
                min_args: 1,
                max_args: None,
            },
            CommandKind::Restart => Self {
                min_args: 0,
                max_args: None,
            },
        }
    }
}

/// Where and for how long pending confirmations are stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSettings {
    /// Key prefix in the durable store
    pub namespace: String,
    pub ttl_secs: u64,
}

impl CacheSettings {
    fn default_for(kind: CommandKind) -> Self {
        Self {
            namespace: format!("{}_reaction", kind.name()),
            ttl_secs: DEFAULT_TTL_SECS,
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Static bot configuration
/// Loaded from data/bot.json
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BotConfig {
    /// Prefix for text commands
    pub prefix: String,

    pub documentation_url: Option<String>,
    pub working_thumbnail: Option<String>,
    pub ok_thumbnail: Option<String>,
    pub warn_thumbnail: Option<String>,
    pub error_thumbnail: Option<String>,

    /// Confirmation emoji per command name
    pub reactions: HashMap<String, ReactionConfig>,

    /// Argument bounds per command name
    pub commands: HashMap<String, CommandSettings>,

    /// Durable store settings per command name
    pub cache: HashMap<String, CacheSettings>,

    /// How often expired confirmations are swept from memory
    pub sweep_interval_secs: u64,

    /// Tell users who react to someone else's prompt that they can't confirm it
    pub notify_wrong_user: bool,

    pub nitrado_api_url: String,

    /// Upper bound on every outbound HTTP request
    pub http_timeout_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        let mut reactions = HashMap::new();
        let mut commands = HashMap::new();
        let mut cache = HashMap::new();
        for kind in CommandKind::ALL {
            reactions.insert(kind.name().to_string(), ReactionConfig::unicode("✅"));
            commands.insert(kind.name().to_string(), CommandSettings::default_for(kind));
            cache.insert(kind.name().to_string(), CacheSettings::default_for(kind));
        }

        Self {
            prefix: "!".to_string(),
            documentation_url: None,
            working_thumbnail: None,
            ok_thumbnail: None,
            warn_thumbnail: None,
            error_thumbnail: None,
            reactions,
            commands,
            cache,
            sweep_interval_secs: 30,
            notify_wrong_user: false,
            nitrado_api_url: "https://api.nitrado.net".to_string(),
            http_timeout_secs: 30,
        }
    }
}

impl BotConfig {
    /// Load from a JSON file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BotError::ConfigLoad {
            path: path.to_string(),
            source: e,
        })?;

        let config: Self = serde_json::from_str(&content).map_err(|e| BotError::ConfigParse {
            path: path.to_string(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file, falling back to defaults when it does not exist
    pub fn load_or_default(path: &str) -> Result<Self> {
        if std::path::Path::new(path).exists() {
            Self::load_from_file(path)
        } else {
            tracing::warn!("No bot config at {}, using defaults", path);
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.prefix.is_empty() {
            return Err(BotError::ConfigValidation {
                message: "prefix must not be empty".to_string(),
            });
        }

        if self.sweep_interval_secs == 0 {
            return Err(BotError::ConfigValidation {
                message: "sweep_interval_secs must be greater than 0".to_string(),
            });
        }

        if self.http_timeout_secs == 0 {
            return Err(BotError::ConfigValidation {
                message: "http_timeout_secs must be greater than 0".to_string(),
            });
        }

        for (name, reaction) in &self.reactions {
            if reaction.name.is_empty() {
                return Err(BotError::ConfigValidation {
                    message: format!("reactions.{}.name must not be empty", name),
                });
            }
            if reaction.id == Some(0) {
                return Err(BotError::ConfigValidation {
                    message: format!("reactions.{}.id must not be 0", name),
                });
            }
        }

        for (name, settings) in &self.cache {
            if settings.ttl_secs == 0 {
                return Err(BotError::ConfigValidation {
                    message: format!("cache.{}.ttl_secs must be greater than 0", name),
                });
            }
            if settings.namespace.is_empty() {
                return Err(BotError::ConfigValidation {
                    message: format!("cache.{}.namespace must not be empty", name),
                });
            }
        }

        for (name, settings) in &self.commands {
            if matches!(settings.max_args, Some(max) if max < settings.min_args) {
                return Err(BotError::ConfigValidation {
                    message: format!("commands.{}.max_args is below min_args", name),
                });
            }
        }

        Ok(())
    }

    pub fn reaction(&self, kind: CommandKind) -> Option<&ReactionConfig> {
        self.reactions.get(kind.name())
    }

    pub fn command_settings(&self, kind: CommandKind) -> CommandSettings {
        self.commands
            .get(kind.name())
            .copied()
            .unwrap_or_else(|| CommandSettings::default_for(kind))
    }

    pub fn cache_settings(&self, kind: CommandKind) -> CacheSettings {
        self.cache
            .get(kind.name())
            .cloned()
            .unwrap_or_else(|| CacheSettings::default_for(kind))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bot_config() {
        let json = r##"{
            "prefix": "?",
            "reactions": {
                "ban": { "name": "banhammer", "id": 998877 }
            },
            "commands": {
                "ban": { "min_args": 1 },
                "restart": { "min_args": 0, "max_args": 20 }
            },
            "cache": {
                "restart": { "namespace": "restart_reaction", "ttl_secs": 120 }
            }
        }"##;

        let config: BotConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.prefix, "?");
        assert_eq!(config.reaction(CommandKind::Ban).unwrap().key(), "998877");
        assert!(config.reaction(CommandKind::Restart).is_none());
        assert_eq!(config.command_settings(CommandKind::Restart).max_args, Some(20));
        assert_eq!(
            config.cache_settings(CommandKind::Restart).ttl(),
            Duration::from_secs(120)
        );
        // Unlisted commands fall back to defaults
        assert_eq!(config.cache_settings(CommandKind::Ban).namespace, "ban_reaction");
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let mut config = BotConfig::default();
        config.cache.insert(
            "ban".to_string(),
            CacheSettings {
                namespace: "ban_reaction".to_string(),
                ttl_secs: 0,
            },
        );
        assert!(matches!(
            config.validate(),
            Err(BotError::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_zero_http_timeout_rejected() {
        let config = BotConfig {
            http_timeout_secs: 0,
            ..BotConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(BotError::ConfigValidation { .. })
        ));
        assert_eq!(BotConfig::default().http_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_zero_emoji_id_rejected_and_treated_as_unicode() {
        let json = r#"{ "reactions": { "ban": { "name": "✅", "id": 0 } } }"#;
        let config: BotConfig = serde_json::from_str(json).unwrap();
        assert!(matches!(
            config.validate(),
            Err(BotError::ConfigValidation { .. })
        ));

        // Matching and posting agree even if validation is skipped
        let reaction = config.reaction(CommandKind::Ban).unwrap();
        assert_eq!(reaction.key(), "✅");
        assert_eq!(reaction.mention(), "✅");
        assert!(matches!(
            reaction.reaction_type(),
            serenity::ReactionType::Unicode(ref name) if name.as_str() == "✅"
        ));
    }

    #[test]
    fn test_reaction_rendering() {
        let custom = ReactionConfig {
            name: "confirm".to_string(),
            id: Some(42),
            animated: false,
        };
        assert_eq!(custom.mention(), "<:confirm:42>");
        assert!(matches!(
            custom.reaction_type(),
            serenity::ReactionType::Custom { .. }
        ));

        let unicode = ReactionConfig::unicode("✅");
        assert_eq!(unicode.key(), "✅");
        assert_eq!(unicode.mention(), "✅");
    }
}

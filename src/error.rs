use thiserror::Error;

/// Failure reported by a guild configuration source
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuildConfigError {
    #[error("Guild configuration service is unavailable: {message}")]
    Unavailable { message: String },

    #[error("This guild has not been set up yet ({guild_id})")]
    NotConfigured { guild_id: String },
}

#[derive(Error, Debug)]
pub enum BotError {
    // Configuration errors
    #[error("Failed to load config file '{path}': {source}")]
    ConfigLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {message}")]
    ConfigValidation { message: String },

    // Parser errors
    #[error("Command given {given} arguments, expects {min} to {max} arguments.")]
    InvalidArgumentCount {
        given: usize,
        min: usize,
        /// Rendered bound, "unlimited" when the command has no maximum
        max: String,
    },

    #[error("Missing {field}")]
    MissingRequiredField { field: String },

    // Authorization errors
    #[error("Unauthorized to use this command")]
    Unauthorized,

    #[error("Unable to verify admin permissions: {source}")]
    AdminCheckFailed {
        #[source]
        source: GuildConfigError,
    },

    #[error(transparent)]
    GuildConfig(#[from] GuildConfigError),

    // Workflow errors
    #[error("Unable to find servers to {action}")]
    NoTargetServers { action: String },

    #[error("Unable to find reactions for command '{command}'")]
    MissingReactionConfig { command: String },

    #[error("Unable to save the pending action: {message}")]
    StorageUnavailable { message: String },

    #[error("Discord API error: {message}")]
    ChatTransportFailure { message: String },

    #[error("Failed to {action}: {message}")]
    ExecutionFailed { action: String, message: String },

    // Generic errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<serenity::Error> for BotError {
    fn from(err: serenity::Error) -> Self {
        BotError::ChatTransportFailure {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for BotError {
    fn from(err: std::io::Error) -> Self {
        BotError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        BotError::Internal {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;

use poise::serenity_prelude as serenity;

pub mod authorization;
pub mod confirmation_matcher;
pub mod confirmation_workflow;
pub mod guild_config;

pub use authorization::AuthorizationGate;
pub use confirmation_matcher::{ConfirmationMatcher, SharedConfirmationMatcher};
pub use confirmation_workflow::{ConfirmationWorkflow, Invocation, SharedConfirmationWorkflow};
pub use guild_config::{
    FileGuildConfigSource, GuildConfigSource, HttpGuildConfigSource, SharedGuildConfigSource,
};

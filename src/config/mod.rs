pub mod bot;
pub mod guild_feed;

pub use bot::{BotConfig, CommandSettings, ReactionConfig};
pub use guild_feed::{CommandApproval, GameServer, GlobalAdminsConfig, GuildFeed};

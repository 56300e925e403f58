//! Tracing setup and the spans every command and reaction runs in.

use poise::serenity_prelude::{ChannelId, GuildId, MessageId};
use tracing::{info_span, Span};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use uuid::Uuid;

/// Install the global subscriber: formatted output with target and level
pub fn init_tracing(level: LevelFilter) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true),
        )
        .with(level)
        .init();
}

/// Parse a `--log-level` value, falling back to INFO
pub fn parse_level(level: &str) -> LevelFilter {
    level.parse().unwrap_or(LevelFilter::INFO)
}

/// Span for one command invocation
pub fn command_span(command: &str, guild: Option<GuildId>, channel: ChannelId) -> Span {
    info_span!(
        "command",
        command = command,
        guild = %guild.map(|g| g.to_string()).unwrap_or_else(|| "DM".to_string()),
        channel = %channel,
        correlation_id = %Uuid::new_v4(),
    )
}

/// Span for one reaction event
pub fn reaction_span(message: MessageId, channel: ChannelId) -> Span {
    info_span!(
        "reaction",
        message = %message,
        channel = %channel,
        correlation_id = %Uuid::new_v4(),
    )
}

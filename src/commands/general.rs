use poise::serenity_prelude as serenity;
use tracing::info;

use crate::{Context, Error};

/// Check if the bot is running
#[poise::command(prefix_command)]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    info!("Ping command called by {}", ctx.author().name);
    ctx.say("Pong! Bot is working!").await?;
    Ok(())
}

/// Show help information
#[poise::command(prefix_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let prefix = &ctx.data().config.prefix;
    let mut embed = serenity::CreateEmbed::new()
        .title("Bot Commands")
        .description("Ban and restart need a confirmation reaction from the member who asked.")
        .field(format!("{}ping", prefix), "Check if the bot is running", false)
        .field(
            format!("{}ban [server id] <player>", prefix),
            "Ban a player on one server, or on every server when no id is given",
            false,
        )
        .field(
            format!("{}restart [server id] [message]", prefix),
            "Restart one server, or every server when no id is given",
            false,
        )
        .color(0x3498db);

    if let Some(url) = &ctx.data().config.documentation_url {
        embed = embed.url(url);
    }

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

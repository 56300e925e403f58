use anyhow::{Context as _, Result};
use clap::Parser;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Discord bot that bans players and restarts game servers after a confirmation reaction
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding bot.json and the guild configuration files
    #[arg(long, env = "DATA_PATH", default_value = "data")]
    data_path: String,

    /// Directory for durable bot state (pending confirmations)
    #[arg(long, env = "STATE_PATH", default_value = "state")]
    state_path: String,

    /// trace, debug, info, warn or error
    #[arg(long, default_value = "info")]
    log_level: String,
}

mod commands;
mod config;
mod discord;
mod error;
mod events;
mod logging;
mod managers;
mod messages;
mod models;
mod nitrado;
mod state;
#[cfg(test)]
mod testing;

use commands::{ban, help, ping, restart};
use config::BotConfig;
use discord::{SerenityTransport, SharedChatTransport};
use events::handle_reaction_add;
use managers::{
    ConfirmationMatcher, ConfirmationWorkflow, FileGuildConfigSource, HttpGuildConfigSource,
    SharedConfirmationMatcher, SharedConfirmationWorkflow, SharedGuildConfigSource,
};
use nitrado::{NitradoClient, SharedActionExecutor};
use state::{
    create_shared_await_index, create_shared_registry, spawn_sweeper, JsonPendingStore,
    SharedPendingStore,
};

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared application state
pub struct Data {
    pub config: Arc<BotConfig>,
    pub workflow: SharedConfirmationWorkflow,
    pub matcher: SharedConfirmationMatcher,
    pub bot_user_id: serenity::UserId,
}

async fn event_handler(
    _ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    if let serenity::FullEvent::ReactionAdd { add_reaction } = event {
        handle_reaction_add(add_reaction, data);
    }
    Ok(())
}

/// Log the application id encoded in the token, for the intents settings link
fn log_bot_id(token: &str) {
    use base64::Engine;

    let Some(bot_id_b64) = token.split('.').next() else {
        return;
    };
    // Discord tokens use base64 without padding, sometimes the URL-safe variant
    let decoded = base64::engine::general_purpose::STANDARD_NO_PAD
        .decode(bot_id_b64)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(bot_id_b64));
    if let Some(id_str) = decoded.ok().and_then(|d| String::from_utf8(d).ok()) {
        info!("Bot ID: {} (configure intents at https://discord.com/developers/applications/{}/bot)", id_str, id_str);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    logging::init_tracing(logging::parse_level(&args.log_level));

    let token = std::env::var("DISCORD_TOKEN").context("Missing DISCORD_TOKEN environment variable")?;
    log_bot_id(&token);
    let nitrado_token =
        std::env::var("NITRADO_TOKEN").context("Missing NITRADO_TOKEN environment variable")?;

    // Static configuration; a bad file stops startup here rather than failing commands later
    let bot_config_path = format!("{}/bot.json", args.data_path);
    info!("Loading bot configuration from {}...", bot_config_path);
    let bot_config = Arc::new(BotConfig::load_or_default(&bot_config_path)?);

    // Ensure state directory exists
    tokio::fs::create_dir_all(&args.state_path).await.ok();

    info!("Loading pending confirmations...");
    let store_path = format!("{}/pending_actions.json", args.state_path);
    // An unreadable file stops startup; moving it aside is left to the operator
    let store: SharedPendingStore = Arc::new(
        JsonPendingStore::open(&store_path)
            .await
            .with_context(|| format!("Failed to load pending confirmations from {}", store_path))?,
    );
    let registry = create_shared_registry(store, &bot_config);
    let index = create_shared_await_index();
    let sweeper = spawn_sweeper(index.clone(), bot_config.sweep_interval());

    let guild_config: SharedGuildConfigSource = match HttpGuildConfigSource::from_env(bot_config.http_timeout())? {
        Some(source) => {
            info!("Reading guild configuration from GUILD_CONFIG_URL");
            Arc::new(source)
        }
        None => {
            info!("Reading guild configuration from {}/guilds", args.data_path);
            Arc::new(FileGuildConfigSource::new(&args.data_path))
        }
    };
    let executor: SharedActionExecutor = Arc::new(NitradoClient::new(
        &bot_config.nitrado_api_url,
        &nitrado_token,
        bot_config.http_timeout(),
    )?);

    let prefix = bot_config.prefix.clone();
    let setup_config = bot_config.clone();

    // Build framework
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![ping(), help(), ban(), restart()],
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(prefix),
                ..Default::default()
            },
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            pre_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' invoked by {} (ID: {}) in {}",
                        ctx.command().qualified_name,
                        ctx.author().name,
                        ctx.author().id,
                        ctx.guild_id().map(|g| g.to_string()).unwrap_or_else(|| "DM".to_string())
                    );
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' completed for {}",
                        ctx.command().qualified_name,
                        ctx.author().name
                    );
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            error!("Error in command '{}': {}", ctx.command().qualified_name, error);
                            let _ = ctx.say(format!("An error occurred: {}", error)).await;
                        }
                        poise::FrameworkError::ArgumentParse { error, input, ctx, .. } => {
                            error!("Argument parse error in '{}': {} (input: {:?})", ctx.command().qualified_name, error, input);
                        }
                        poise::FrameworkError::GuildOnly { ctx, .. } => {
                            error!("Command '{}' is guild-only, used in DM by {}", ctx.command().qualified_name, ctx.author().name);
                        }
                        other => {
                            error!("Other framework error: {}", other);
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, _framework| {
            let config = setup_config.clone();
            let registry = registry.clone();
            let index = index.clone();
            let guild_config = guild_config.clone();
            let executor = executor.clone();

            Box::pin(async move {
                info!("Bot logged in as: {}", ready.user.name);

                let transport: SharedChatTransport =
                    Arc::new(SerenityTransport::new(ctx.http.clone()));
                let workflow = Arc::new(ConfirmationWorkflow::new(
                    config.clone(),
                    guild_config,
                    registry.clone(),
                    index.clone(),
                    transport.clone(),
                ));
                let matcher = Arc::new(ConfirmationMatcher::new(
                    config.clone(),
                    index,
                    registry,
                    executor,
                    transport,
                ));

                // Prompts posted before a restart stay confirmable
                if let Err(e) = matcher.rehydrate(chrono::Utc::now()).await {
                    error!("Failed to restore pending confirmations: {}", e);
                }

                Ok(Data {
                    config,
                    workflow,
                    matcher,
                    bot_user_id: ready.user.id,
                })
            })
        })
        .build();

    let intents =
        serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::MESSAGE_CONTENT;
    info!("Requesting privileged intents: [\"MESSAGE_CONTENT\"]");

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    info!("Starting bot...");
    if let Err(e) = client.start().await {
        let err_str = e.to_string();
        if err_str.contains("Disallowed") || err_str.contains("intents") {
            error!("Failed to start bot: {}", e);
            error!("Enable MESSAGE_CONTENT under Bot -> Privileged Gateway Intents at https://discord.com/developers/applications");
            sweeper.abort();
            return Err(anyhow::anyhow!("Disallowed gateway intents: MESSAGE_CONTENT"));
        }
        sweeper.abort();
        return Err(e.into());
    }
    sweeper.abort();
    warn!("Bot ended.");

    Ok(())
}

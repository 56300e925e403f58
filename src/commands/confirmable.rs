use chrono::Utc;
use poise::serenity_prelude::RoleId;
use tracing::{error, Instrument};

use crate::error::BotError;
use crate::managers::Invocation;
use crate::models::CommandKind;
use crate::{Context, Error};

/// Ban a player; confirm by reacting to the prompt
#[poise::command(prefix_command, guild_only)]
pub async fn ban(
    ctx: Context<'_>,
    #[rest] args: Option<String>,
) -> Result<(), Error> {
    run_confirmable(ctx, CommandKind::Ban, args).await
}

/// Restart game servers; confirm by reacting to the prompt
#[poise::command(prefix_command, guild_only)]
pub async fn restart(
    ctx: Context<'_>,
    #[rest] args: Option<String>,
) -> Result<(), Error> {
    run_confirmable(ctx, CommandKind::Restart, args).await
}

/// Post the confirmation prompt, or explain in the channel why not
async fn run_confirmable(
    ctx: Context<'_>,
    command: CommandKind,
    args: Option<String>,
) -> Result<(), Error> {
    let span = crate::logging::command_span(command.name(), ctx.guild_id(), ctx.channel_id());

    async move {
        let Some(guild_id) = ctx.guild_id() else {
            return Ok(());
        };
        let roles = member_roles(ctx.author_member().await.map(|member| member.roles.clone()));

        let mut invocation = Invocation {
            command,
            text: format!("{} {}", command.name(), args.unwrap_or_default()),
            guild_id,
            channel_id: ctx.channel_id(),
            author_id: ctx.author().id,
            author_name: ctx.author().name.clone(),
            roles: Vec::new(),
            requested_at: Utc::now(),
        };

        let workflow = &ctx.data().workflow;
        match roles {
            Ok(roles) => invocation.roles = roles,
            Err(e) => {
                error!("{} rejected: {}", command, e);
                workflow.report_error(&invocation, &e).await?;
                return Ok(());
            }
        }

        if let Err(e) = workflow.request_confirmation(&invocation).await {
            error!("{} rejected: {}", command, e);
            workflow.report_error(&invocation, &e).await?;
        }
        Ok(())
    }
    .instrument(span)
    .await
}

/// Roles of the invoking member; a member that could not be fetched is an
/// error rather than a member without roles
fn member_roles(roles: Option<Vec<RoleId>>) -> crate::error::Result<Vec<RoleId>> {
    roles.ok_or_else(|| BotError::ChatTransportFailure {
        message: "could not look up the invoking member".to_string(),
    })
}

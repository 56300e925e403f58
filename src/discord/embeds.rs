use poise::serenity_prelude as serenity;

use crate::config::{BotConfig, GameServer};
use crate::models::{ActionRequest, CommandKind};
use crate::nitrado::ServerOutcome;

/// Discord rejects embeds with more fields than this
pub const MAX_FIELDS_PER_EMBED: usize = 25;

pub const COLOR_WORKING: u32 = 0x3498db;
pub const COLOR_OK: u32 = 0x2ecc71;
pub const COLOR_WARN: u32 = 0xf1c40f;
pub const COLOR_ERROR: u32 = 0xe74c3c;

/// Discord rejects empty field values
const EMPTY_FIELD_VALUE: &str = "\u{200b}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Everything the bot renders as an embed field
#[derive(Debug, Clone)]
pub enum OutputField {
    BanConfirmation {
        player: String,
        servers: Vec<GameServer>,
    },
    RestartConfirmation {
        message: String,
        servers: Vec<GameServer>,
    },
    ServerOutcome(ServerOutcome),
}

impl OutputField {
    /// Field describing what confirming `request` will do
    pub fn confirmation(request: &ActionRequest) -> Self {
        match request.command {
            CommandKind::Ban => OutputField::BanConfirmation {
                player: request.payload.clone(),
                servers: request.servers.clone(),
            },
            CommandKind::Restart => OutputField::RestartConfirmation {
                message: request.payload.clone(),
                servers: request.servers.clone(),
            },
        }
    }

    pub fn render(&self) -> EmbedField {
        let (name, value) = match self {
            OutputField::BanConfirmation { player, servers } => {
                let name = match servers.as_slice() {
                    [server] => format!("{} will be banned on {}", player, server.name),
                    _ => format!("{} will be banned on {} servers", player, servers.len()),
                };
                (name, String::new())
            }
            OutputField::RestartConfirmation { message, servers } => {
                let name = match servers.as_slice() {
                    [server] => format!("Confirm to restart server: {}", server.name),
                    _ => format!("Confirm to restart {} server(s)", servers.len()),
                };
                (name, format!("**Restart Message:** {}\n\n", message))
            }
            OutputField::ServerOutcome(outcome) => match &outcome.error {
                None => (format!("✅ {}", outcome.server_name), "Success".to_string()),
                Some(e) => (format!("❌ {}", outcome.server_name), format!("Failed: {}", e)),
            },
        };

        EmbedField {
            name,
            value: if value.is_empty() {
                EMPTY_FIELD_VALUE.to_string()
            } else {
                value
            },
            inline: false,
        }
    }
}

/// Platform-agnostic embed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbedMessage {
    pub title: String,
    pub description: String,
    pub title_url: Option<String>,
    pub footer: Option<String>,
    pub thumbnail_url: Option<String>,
    pub color: u32,
    pub fields: Vec<EmbedField>,
}

impl EmbedMessage {
    pub fn with_fields(mut self, fields: &[OutputField]) -> Self {
        self.fields.extend(fields.iter().map(OutputField::render));
        self
    }

    /// Split into messages of at most [`MAX_FIELDS_PER_EMBED`] fields.
    /// Every page repeats the header so each message stands on its own.
    pub fn pages(&self) -> Vec<EmbedMessage> {
        if self.fields.len() <= MAX_FIELDS_PER_EMBED {
            return vec![self.clone()];
        }

        self.fields
            .chunks(MAX_FIELDS_PER_EMBED)
            .map(|chunk| EmbedMessage {
                fields: chunk.to_vec(),
                ..self.clone()
            })
            .collect()
    }

    pub fn to_serenity(&self) -> serenity::CreateEmbed {
        let mut embed = serenity::CreateEmbed::new()
            .title(&self.title)
            .description(&self.description)
            .color(self.color);

        if let Some(url) = &self.title_url {
            embed = embed.url(url);
        }
        if let Some(footer) = &self.footer {
            embed = embed.footer(serenity::CreateEmbedFooter::new(footer));
        }
        if let Some(thumbnail) = &self.thumbnail_url {
            embed = embed.thumbnail(thumbnail);
        }

        for field in &self.fields {
            embed = embed.field(&field.name, &field.value, field.inline);
        }
        embed
    }
}

/// Prompt asking the requester to react
pub fn confirmation_prompt(
    config: &BotConfig,
    request: &ActionRequest,
    reaction_mention: &str,
    actor: &str,
) -> EmbedMessage {
    let (title, description) = match request.command {
        CommandKind::Ban => (
            crate::messages::ban_title(&request.payload),
            crate::messages::ban_confirmation_description(reaction_mention),
        ),
        CommandKind::Restart => (
            request.command.name().to_string(),
            crate::messages::restart_confirmation_description(reaction_mention),
        ),
    };

    EmbedMessage {
        title,
        description,
        title_url: config.documentation_url.clone(),
        footer: Some(crate::messages::executed_by(actor)),
        thumbnail_url: config.working_thumbnail.clone(),
        color: COLOR_WORKING,
        fields: vec![],
    }
    .with_fields(&[OutputField::confirmation(request)])
}

/// Per-server result of a confirmed action
pub fn execution_result(
    config: &BotConfig,
    command: CommandKind,
    outcomes: &[ServerOutcome],
    actor: &str,
) -> EmbedMessage {
    let succeeded = outcomes.iter().filter(|o| o.error.is_none()).count();
    let all_ok = succeeded == outcomes.len();

    let fields: Vec<OutputField> = outcomes
        .iter()
        .cloned()
        .map(OutputField::ServerOutcome)
        .collect();

    EmbedMessage {
        title: crate::messages::confirmed_title(command.name()),
        description: crate::messages::execution_summary(succeeded, outcomes.len()),
        title_url: config.documentation_url.clone(),
        footer: Some(crate::messages::executed_by(actor)),
        thumbnail_url: if all_ok {
            config.ok_thumbnail.clone()
        } else {
            config.warn_thumbnail.clone()
        },
        color: if all_ok { COLOR_OK } else { COLOR_WARN },
        fields: vec![],
    }
    .with_fields(&fields)
}

/// Error shown to the user when a command fails
pub fn error_message(config: &BotConfig, title: &str, error: &str, actor: &str) -> EmbedMessage {
    EmbedMessage {
        title: title.to_string(),
        description: error.to_string(),
        title_url: config.documentation_url.clone(),
        footer: Some(crate::messages::executed_by(actor)),
        thumbnail_url: config.error_thumbnail.clone(),
        color: COLOR_ERROR,
        fields: vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(id: u64, name: &str) -> GameServer {
        GameServer {
            id,
            nitrado_id: id * 1000,
            name: name.to_string(),
            enabled: true,
        }
    }

    #[test]
    fn test_ban_confirmation_field() {
        let single = OutputField::BanConfirmation {
            player: "Steve".to_string(),
            servers: vec![server(1, "Island")],
        }
        .render();
        assert_eq!(single.name, "Steve will be banned on Island");
        assert_eq!(single.value, "\u{200b}");

        let many = OutputField::BanConfirmation {
            player: "Steve".to_string(),
            servers: vec![server(1, "Island"), server(2, "Center")],
        }
        .render();
        assert_eq!(many.name, "Steve will be banned on 2 servers");
    }

    #[test]
    fn test_restart_confirmation_field() {
        let field = OutputField::RestartConfirmation {
            message: "brb".to_string(),
            servers: vec![server(1, "Island")],
        }
        .render();
        assert_eq!(field.name, "Confirm to restart server: Island");
        assert_eq!(field.value, "**Restart Message:** brb\n\n");
    }

    #[test]
    fn test_pages_split_large_embeds() {
        let fields: Vec<OutputField> = (1..=30)
            .map(|i| {
                OutputField::ServerOutcome(ServerOutcome {
                    server_name: format!("server {}", i),
                    error: None,
                })
            })
            .collect();
        let embed = EmbedMessage {
            title: "restart confirmed".to_string(),
            ..Default::default()
        }
        .with_fields(&fields);

        let pages = embed.pages();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].fields.len(), MAX_FIELDS_PER_EMBED);
        assert_eq!(pages[1].fields.len(), 5);
        assert!(pages.iter().all(|p| p.title == "restart confirmed"));
    }

    #[test]
    fn test_execution_result_colors() {
        let config = BotConfig::default();
        let outcomes = vec![
            ServerOutcome {
                server_name: "Island".to_string(),
                error: None,
            },
            ServerOutcome {
                server_name: "Center".to_string(),
                error: Some("timeout".to_string()),
            },
        ];

        let embed = execution_result(&config, CommandKind::Restart, &outcomes, "alice");
        assert_eq!(embed.color, COLOR_WARN);
        assert_eq!(embed.fields[1].value, "Failed: timeout");
    }
}

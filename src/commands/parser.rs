//! Turns raw command text into a [`ParsedInvocation`].
//!
//! Arguments are whitespace-delimited. A leading token that is a pure integer
//! scopes the command to that Nitrado server; everything after it is the
//! payload, with its interior whitespace kept as typed.

use crate::config::CommandSettings;
use crate::error::{BotError, Result};
use crate::models::{CommandKind, ParsedInvocation, ServerScope};

/// Parse `text`, the full invocation including the command name
/// (e.g. `"ban 12345 Steve Smith"`).
pub fn parse_invocation(
    command: CommandKind,
    settings: CommandSettings,
    text: &str,
    actor: &str,
) -> Result<ParsedInvocation> {
    // Drop the command name itself
    let args = split_first_token(text.trim_start()).1;

    let given = args.split_whitespace().count();
    if given < settings.min_args || settings.max_args.is_some_and(|max| given > max) {
        return Err(BotError::InvalidArgumentCount {
            given,
            min: settings.min_args,
            max: settings
                .max_args
                .map(|m| m.to_string())
                .unwrap_or_else(|| "unlimited".to_string()),
        });
    }

    let (first, rest) = split_first_token(args);
    let (scope, payload) = match parse_server_id(first) {
        Some(id) => (scope_for(id), rest),
        None => (ServerScope::All, args),
    };

    let payload = payload.trim();
    let payload = if payload.is_empty() {
        command
            .default_payload(actor)
            .ok_or_else(|| BotError::MissingRequiredField {
                field: command.payload_field().to_string(),
            })?
    } else {
        payload.to_string()
    };

    Ok(ParsedInvocation {
        command,
        scope,
        payload,
    })
}

/// Split off the first whitespace-delimited token, returning it and the rest
/// (with leading whitespace removed).
fn split_first_token(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.find(char::is_whitespace) {
        Some(end) => (&text[..end], text[end..].trim_start()),
        None => (text, ""),
    }
}

/// Only a token made entirely of digits is a server id; "12abc" is payload.
fn parse_server_id(token: &str) -> Option<u64> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

/// Server id 0 means every server, as in the guild config service
fn scope_for(id: u64) -> ServerScope {
    if id == 0 {
        ServerScope::All
    } else {
        ServerScope::Single(id)
    }
}

// src/messages.rs

pub fn default_restart_message(actor: &str) -> String {
    format!("A restart has been requested by {}", actor)
}

pub fn ban_title(player: &str) -> String {
    format!("Ban {}", player)
}

pub fn ban_confirmation_description(emoji: &str) -> String {
    format!(
        "Banning may take up to 5 minutes for Nitrado to process. \
        Please press the {} reaction to confirm the ban.",
        emoji
    )
}

pub fn restart_confirmation_description(emoji: &str) -> String {
    format!(
        "Restarting may wait for the \"restart countdown\". \
        Please press the {} reaction to confirm the restart.",
        emoji
    )
}

pub fn executed_by(name: &str) -> String {
    format!("Executed by {}", name)
}

pub fn wrong_user_notice(reactor: &str) -> String {
    format!(
        "{}, only the user who requested this action can confirm it.",
        reactor
    )
}

pub fn confirmed_title(command: &str) -> String {
    format!("{} confirmed", command)
}

pub fn execution_summary(succeeded: usize, total: usize) -> String {
    if succeeded == total {
        format!("Completed on {} server(s).", total)
    } else {
        format!(
            "Completed on {} of {} server(s). See the failures below.",
            succeeded, total
        )
    }
}

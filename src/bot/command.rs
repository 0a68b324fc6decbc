use crate::pipeline::Pipeline;
use crate::render::{escape_html, format_timestamp, render_symbol_reply};

/// One inbound chat message, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Help,
    /// Free text, trimmed and upper-cased.
    Lookup(String),
    /// A slash command we don't know.
    Unknown(String),
    /// Blank message.
    Empty,
}

impl BotCommand {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            return BotCommand::Empty;
        }

        let Some(rest) = text.strip_prefix('/') else {
            return BotCommand::Lookup(text.to_uppercase());
        };

        // "/start@SomeBot arg" -> "start"
        let command = rest
            .split_whitespace()
            .next()
            .and_then(|c| c.split('@').next())
            .unwrap_or("")
            .to_lowercase();

        match command.as_str() {
            "start" => BotCommand::Start,
            "help" | "h" => BotCommand::Help,
            _ => BotCommand::Unknown(text.to_string()),
        }
    }
}

pub const WELCOME: &str = "Welcome to the NEPSE live data bot!\n\n\
     Send a stock symbol (for example <code>NABIL</code>) to get its latest price, \
     day range and distance from the 52-week high and low.";

pub const HELP: &str = "<b>Usage</b>\n\n\
     /start - greeting\n\
     /help - this message\n\
     <i>SYMBOL</i> - latest data for a listed company, e.g. <code>NICA</code>";

/// Reply text for a command (Telegram HTML). `None` means stay silent.
pub async fn respond(command: BotCommand, pipeline: &Pipeline) -> Option<String> {
    match command {
        BotCommand::Empty => None,
        BotCommand::Start => Some(WELCOME.to_string()),
        BotCommand::Help => Some(HELP.to_string()),
        BotCommand::Unknown(text) => Some(format!(
            "Unknown command <code>{}</code>.\n\n{HELP}",
            escape_html(&text)
        )),
        BotCommand::Lookup(symbol) => Some(match pipeline.lookup(&symbol).await {
            Some((record, at)) => render_symbol_reply(&record, &format_timestamp(at)),
            None => format!("Symbol <b>{}</b> not found.", escape_html(&symbol)),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_start_and_help() {
        assert_eq!(BotCommand::parse("/start"), BotCommand::Start);
        assert_eq!(BotCommand::parse("/start@NepseLiveBot"), BotCommand::Start);
        assert_eq!(BotCommand::parse(" /HELP "), BotCommand::Help);
    }

    #[test]
    fn free_text_is_symbol_lookup() {
        assert_eq!(BotCommand::parse("  nabil "), BotCommand::Lookup("NABIL".to_string()));
        assert_eq!(BotCommand::parse("Nica"), BotCommand::Lookup("NICA".to_string()));
    }

    #[test]
    fn blank_and_unknown() {
        assert_eq!(BotCommand::parse("   "), BotCommand::Empty);
        assert_eq!(BotCommand::parse("/portfolio"), BotCommand::Unknown("/portfolio".to_string()));
    }
}

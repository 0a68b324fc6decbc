//! Telegram chat bot: `/start` greets, any other text is a symbol lookup.

pub mod command;
pub mod telegram;

pub use telegram::TelegramBot;

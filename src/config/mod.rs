//! Configuration module for the subscription gate.
//!
//! Handles the bot token and the list of chats a user must belong to,
//! which lives as a single `KEY=value` line inside a `.env`-style file.

mod chats;
mod settings;

pub use chats::{
    parse_chat_list, serialize_chat_list, ChatStore, RequiredChat, StoreError, UpsertOutcome,
};
pub use settings::{BotConfig, ConfigError};

/// Default path of the env file holding both the token and the chat list.
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Environment variable carrying the Bot API token.
pub const TOKEN_ENV_VAR: &str = "TGBOT";

/// Key of the line that stores the required chats.
pub const REQUIRED_CHATS_KEY: &str = "REQUIRED_CHATS";

/// Separates entries in the stored chat list.
pub const ENTRY_SEPARATOR: char = ',';

/// Separates a chat id from its invite link inside one entry.
pub const FIELD_SEPARATOR: char = '|';

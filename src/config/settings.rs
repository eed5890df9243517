//! Bot settings read from the environment.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{ChatStore, DEFAULT_ENV_FILE, REQUIRED_CHATS_KEY, TOKEN_ENV_VAR};

/// Settings shared by the bot and the setup tool.
#[derive(Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Bot API token (obtain from @BotFather).
    pub token: String,

    /// Env file that holds the required chat list.
    #[serde(default = "default_env_file")]
    pub env_file: PathBuf,

    /// Key of the chat list line inside the env file.
    #[serde(default = "default_chats_key")]
    pub chats_key: String,
}

fn default_env_file() -> PathBuf {
    PathBuf::from(DEFAULT_ENV_FILE)
}

fn default_chats_key() -> String {
    REQUIRED_CHATS_KEY.to_owned()
}

impl BotConfig {
    /// Creates a configuration with default file and key.
    #[must_use]
    pub fn new(token: String) -> Self {
        Self {
            token,
            env_file: default_env_file(),
            chats_key: default_chats_key(),
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Expects `TGBOT` to be set. `REQUIRED_CHATS_KEY` optionally renames
    /// the chat list line.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is missing or blank.
    pub fn from_env(env_file: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let token = std::env::var(TOKEN_ENV_VAR)
            .map_err(|_| ConfigError::MissingEnvVar(TOKEN_ENV_VAR))?;

        if token.trim().is_empty() {
            return Err(ConfigError::EmptyToken);
        }

        let chats_key = std::env::var("REQUIRED_CHATS_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .unwrap_or_else(default_chats_key);

        Ok(Self {
            token,
            env_file: env_file.into(),
            chats_key,
        })
    }

    /// Store for the required chat list described by this configuration.
    #[must_use]
    pub fn chat_store(&self) -> ChatStore {
        ChatStore::new(&self.env_file).with_key(&self.chats_key)
    }
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &"<redacted>")
            .field("env_file", &self.env_file)
            .field("chats_key", &self.chats_key)
            .finish()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Bot token is empty")]
    EmptyToken,
}

//! Subscription Gate Bot - Main Entry Point
//!
//! Serves `/start` and only grants access once the user has joined every
//! chat listed in the env file.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use teloxide::dptree;
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use subscription_gate_bot::commands::{schema, GateHandler};
use subscription_gate_bot::config::{BotConfig, DEFAULT_ENV_FILE};

/// Telegram bot that gates access behind channel subscriptions.
#[derive(Parser, Debug)]
#[command(name = "subscription_bot")]
#[command(about = "Grant access only to users subscribed to the configured channels")]
#[command(version)]
struct Args {
    /// Path to the .env file holding TGBOT and REQUIRED_CHATS.
    #[arg(long, default_value = DEFAULT_ENV_FILE)]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level);

    // Load environment variables
    match dotenvy::from_filename(&args.env_file) {
        Ok(_) => {}
        Err(e) if e.not_found() => debug!("No .env file at {}", args.env_file),
        Err(e) => warn!("Could not load .env file ({}): {}", args.env_file, e),
    }

    let config = BotConfig::from_env(&args.env_file)
        .context("Failed to load bot configuration (set TGBOT in the .env file)")?;

    let store = config.chat_store();
    match store.load() {
        Ok(chats) if chats.is_empty() => {
            warn!("No required chats configured; /start will grant open access");
        }
        Ok(chats) => info!("{} required chats configured", chats.len()),
        Err(e) => warn!("Could not read required chats yet: {}", e),
    }

    let bot = Bot::new(&config.token);
    let handler = Arc::new(GateHandler::new(store));

    info!("Bot started. Use Ctrl+C to stop.");

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![handler])
        .error_handler(LoggingErrorHandler::with_custom_text(
            "An error occurred while handling an update",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Shutting down...");
    Ok(())
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

//! Setup tool for the subscription gate.
//!
//! Finds chat ids and invite links and writes them into the env file the
//! bot reads. Runs an interactive menu unless a subcommand is given.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dialoguer::{Confirm, Input, Select};
use teloxide::prelude::*;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use subscription_gate_bot::config::{BotConfig, ChatStore, UpsertOutcome, DEFAULT_ENV_FILE};
use subscription_gate_bot::discovery::{
    describe_chat, parse_manual_target, resolve_handle, ManualTarget, Scanner,
};
use subscription_gate_bot::telegram::resolve_invite_link;

/// Subscription gate setup tool.
#[derive(Parser, Debug)]
#[command(name = "subscription_setup")]
#[command(about = "Discover chats and manage the required chat list")]
#[command(version)]
struct Args {
    /// Path to the .env file holding TGBOT and REQUIRED_CHATS.
    #[arg(long, default_value = DEFAULT_ENV_FILE)]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<SetupCommand>,
}

#[derive(Subcommand, Debug)]
enum SetupCommand {
    /// Wait for a forwarded post or a group message and save its chat.
    Scan {
        /// Save the first detected chat without asking.
        #[arg(short, long)]
        yes: bool,
    },

    /// Add a chat from a t.me link or @handle.
    Add {
        /// Channel link or handle.
        link: String,

        /// Chat id to store instead of looking it up.
        #[arg(long, allow_hyphen_values = true)]
        id: Option<String>,
    },

    /// List saved chats.
    List {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Remove every saved chat.
    Clear,
}

const MENU_ITEMS: [&str; 5] = [
    "Auto-Detect (Scan/Forward)",
    "Manual Add",
    "List Saved",
    "Clear All",
    "Exit",
];

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    match dotenvy::from_filename(&args.env_file) {
        Ok(_) => {}
        Err(e) if e.not_found() => debug!("No .env file at {}", args.env_file),
        Err(e) => warn!("Could not load .env file ({}): {}", args.env_file, e),
    }

    let config = BotConfig::from_env(&args.env_file)
        .context("Failed to load bot configuration (set TGBOT in the .env file)")?;

    let setup = Setup {
        bot: Bot::new(&config.token),
        store: config.chat_store(),
    };

    match args.command {
        None => setup.menu().await,
        Some(SetupCommand::Scan { yes }) => setup.scan(yes).await,
        Some(SetupCommand::Add { link, id }) => setup.manual_add(Some(link), id).await,
        Some(SetupCommand::List { json }) => setup.list(json),
        Some(SetupCommand::Clear) => setup.clear(),
    }
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

struct Setup {
    bot: Bot,
    store: ChatStore,
}

impl Setup {
    /// Interactive menu; errors from one action are reported and the menu
    /// is shown again.
    async fn menu(&self) -> Result<()> {
        loop {
            println!("\n=== SUBSCRIPTION BOT SETUP ===");

            let choice = match Select::new()
                .with_prompt("Select")
                .items(&MENU_ITEMS)
                .default(0)
                .interact_opt()
            {
                Ok(Some(choice)) => choice,
                Ok(None) => break,
                Err(e) => {
                    debug!("Menu prompt closed: {}", e);
                    break;
                }
            };

            let result = match choice {
                0 => self.scan(false).await,
                1 => self.manual_add(None, None).await,
                2 => self.list(false),
                3 => self.clear(),
                _ => break,
            };

            if let Err(e) = result {
                eprintln!("✗ {e:#}");
            }
        }

        Ok(())
    }

    async fn scan(&self, assume_yes: bool) -> Result<()> {
        println!("\n--- SCANNER MODE ---");
        println!("1. Forward a post from a channel to the bot.");
        println!("2. OR Send a message in a group where the bot is.");
        println!("3. Press Ctrl+C to cancel.");

        println!("Clearing old updates...");
        let mut scanner = Scanner::start(self.bot.clone())
            .await
            .context("Failed to clear pending updates")?;
        println!("Scanner active. Waiting for messages...");

        loop {
            let chat = tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    println!("\nScanner stopped.");
                    return Ok(());
                }
                next = scanner.next_chat() => next.context("Failed to fetch updates")?,
            };

            println!("\n[DETECTED] {}", describe_chat(&chat));
            let link = resolve_invite_link(&self.bot, &chat).await;
            println!("Link: {link}");

            if !assume_yes {
                match Confirm::new()
                    .with_prompt("Save this chat and return to menu?")
                    .default(false)
                    .interact_opt()
                {
                    Ok(Some(true)) => {}
                    Ok(Some(false)) => continue,
                    Ok(None) | Err(_) => {
                        println!("\nScanner stopped.");
                        return Ok(());
                    }
                }
            }

            self.save_chat(&chat.id.to_string(), &link)?;

            if let Err(e) = scanner.acknowledge().await {
                warn!("Could not confirm handled updates: {}", e);
            }
            return Ok(());
        }
    }

    async fn manual_add(&self, link: Option<String>, id: Option<String>) -> Result<()> {
        let target = match link {
            Some(link) => parse_manual_target(&link)
                .with_context(|| format!("Not a usable t.me link or handle: {link}"))?,
            None => {
                println!("\n--- Manual Add ---");
                loop {
                    let Some(input) =
                        prompt_text("Enter channel link or @handle (empty to cancel)")
                    else {
                        return Ok(());
                    };
                    match parse_manual_target(&input) {
                        Some(target) => break target,
                        None => println!("Not a usable t.me link or handle, try again."),
                    }
                }
            }
        };

        if let Some(id) = id {
            return self.save_chat(id.trim(), target.link());
        }

        match &target {
            ManualTarget::Private { link } => {
                println!("Private link detected. Enter the chat ID manually or use Auto-Detect.");
                self.ask_id_and_save(link)
            }
            ManualTarget::Public { handle, link } => {
                match resolve_handle(&self.bot, handle).await {
                    Ok(chat) => {
                        println!("Found: {}", describe_chat(&chat));
                        self.save_chat(&chat.id.to_string(), link)
                    }
                    Err(e) => {
                        println!("Error: {e}");
                        self.ask_id_and_save(link)
                    }
                }
            }
        }
    }

    fn ask_id_and_save(&self, link: &str) -> Result<()> {
        match prompt_text("Enter chat ID (-100...)") {
            Some(id) => self.save_chat(&id, link),
            None => Ok(()),
        }
    }

    fn save_chat(&self, id: &str, link: &str) -> Result<()> {
        let outcome = self
            .store
            .upsert(id, link)
            .with_context(|| format!("Failed to save chat {id}"))?;

        match outcome {
            UpsertOutcome::Updated => println!("Updated existing chat {id}."),
            UpsertOutcome::Added => {
                println!("Saved chat {id} to {}.", self.store.path().display());
            }
        }
        Ok(())
    }

    fn list(&self, json: bool) -> Result<()> {
        let chats = self.store.load().context("Failed to read saved chats")?;

        if json {
            println!("{}", serde_json::to_string_pretty(&chats)?);
        } else if chats.is_empty() {
            println!("No chats saved.");
        } else {
            for chat in &chats {
                println!("ID: {} | Link: {}", chat.id, chat.link);
            }
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.store.clear().context("Failed to clear saved chats")?;
        println!("Cleared.");
        Ok(())
    }
}

/// Reads a line from the operator; empty input or a closed prompt yields `None`.
fn prompt_text(prompt: &str) -> Option<String> {
    match Input::<String>::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()
    {
        Ok(text) => Some(text.trim().to_owned()).filter(|t| !t.is_empty()),
        Err(e) => {
            debug!("Prompt cancelled: {}", e);
            None
        }
    }
}

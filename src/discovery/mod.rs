//! Chat discovery for the setup tool.
//!
//! Finds chat ids either from live updates (messages in a group, channel
//! posts, forwards, or the bot being added somewhere) or from a link typed
//! by the operator.

mod manual;
mod scanner;

pub use manual::{parse_manual_target, resolve_handle, ManualTarget};
pub use scanner::{detected_chat, Scanner, POLL_TIMEOUT_SECS};

use teloxide::types::Chat;

/// Short label for the kind of chat.
#[must_use]
pub fn chat_kind(chat: &Chat) -> &'static str {
    if chat.is_channel() {
        "channel"
    } else if chat.is_supergroup() {
        "supergroup"
    } else if chat.is_group() {
        "group"
    } else {
        "private"
    }
}

/// One-line summary of a chat for the operator.
#[must_use]
pub fn describe_chat(chat: &Chat) -> String {
    format!(
        "{} ({}) | ID: {}",
        chat.title().unwrap_or("<untitled>"),
        chat_kind(chat),
        chat.id
    )
}

//! Invite link discovery for the setup tool.

use teloxide::prelude::*;
use teloxide::types::{Chat, ChatId};
use tracing::{debug, warn};

/// Finds the best invite link for a chat.
///
/// Prefers the link Telegram reports for the chat, then tries to export a
/// new one (the bot must be an admin with invite rights), and finally falls
/// back to [`fallback_invite_link`].
pub async fn resolve_invite_link(bot: &Bot, chat: &Chat) -> String {
    if let Some(link) = chat.invite_link() {
        debug!("Using reported invite link for {}", chat.id);
        return link.to_owned();
    }

    match bot.export_chat_invite_link(chat.id).await {
        Ok(link) => link,
        Err(e) => {
            warn!("Could not export invite link for {}: {}", chat.id, e);
            fallback_invite_link(chat.id, chat.username())
        }
    }
}

/// Builds a best-effort link without asking Telegram.
///
/// Public chats get `https://t.me/<username>`. Otherwise the `-100` prefix
/// of a supergroup/channel id is stripped to form a `t.me/c/` message link,
/// which only works for users who are already members and may be wrong for
/// other id formats.
#[must_use]
pub fn fallback_invite_link(chat_id: ChatId, username: Option<&str>) -> String {
    if let Some(username) = username.filter(|u| !u.is_empty()) {
        return format!("https://t.me/{username}");
    }

    let raw = chat_id.0.to_string();
    let short = raw.strip_prefix("-100").unwrap_or(&raw);
    format!("https://t.me/c/{short}/1")
}

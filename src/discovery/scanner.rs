//! Long-polling scanner that reports chats the bot sees.

use std::collections::VecDeque;

use teloxide::prelude::*;
use teloxide::types::{Chat, Message, MessageOrigin, UpdateKind};
use teloxide::RequestError;
use tracing::debug;

/// Long-poll timeout for each `getUpdates` call.
pub const POLL_TIMEOUT_SECS: u32 = 3;

/// Returns the chat an update points at, if it is worth offering.
///
/// A forwarded message reports the chat it was forwarded from. Private
/// chats are never offered.
#[must_use]
pub fn detected_chat(update: &Update) -> Option<&Chat> {
    let chat = match &update.kind {
        UpdateKind::Message(message) => forwarded_chat(message).unwrap_or(&message.chat),
        UpdateKind::ChannelPost(post) => &post.chat,
        UpdateKind::MyChatMember(member) => &member.chat,
        _ => return None,
    };

    (!chat.is_private()).then_some(chat)
}

/// Chat a message was forwarded from: a channel post or an anonymous admin's
/// group message.
fn forwarded_chat(message: &Message) -> Option<&Chat> {
    match message.forward_origin()? {
        MessageOrigin::Channel { chat, .. } | MessageOrigin::Chat { sender_chat: chat, .. } => {
            Some(chat)
        }
        MessageOrigin::User { .. } | MessageOrigin::HiddenUser { .. } => None,
    }
}

/// Polls updates one at a time and yields detected chats.
///
/// The offset only advances past updates that were handed out, so stopping
/// after a chosen chat leaves later updates pending.
pub struct Scanner {
    bot: Bot,
    offset: i32,
    pending: VecDeque<Update>,
}

impl Scanner {
    /// Drops the webhook and any pending updates, then starts scanning.
    pub async fn start(bot: Bot) -> Result<Self, RequestError> {
        bot.delete_webhook().drop_pending_updates(true).await?;
        debug!("Webhook cleared, pending updates dropped");

        Ok(Self {
            bot,
            offset: 0,
            pending: VecDeque::new(),
        })
    }

    /// Waits for the next update carrying a non-private chat.
    ///
    /// Cancel-safe: dropping the future loses no already-fetched updates.
    pub async fn next_chat(&mut self) -> Result<Chat, RequestError> {
        loop {
            while let Some(update) = self.pending.pop_front() {
                self.offset = update.id.as_offset();
                if let Some(chat) = detected_chat(&update) {
                    return Ok(chat.clone());
                }
            }

            let updates = self
                .bot
                .get_updates()
                .offset(self.offset)
                .timeout(POLL_TIMEOUT_SECS)
                .await?;

            if !updates.is_empty() {
                debug!("Fetched {} updates", updates.len());
            }
            self.pending.extend(updates);
        }
    }

    /// Confirms handled updates with Telegram so they are not delivered again.
    pub async fn acknowledge(&self) -> Result<(), RequestError> {
        self.bot
            .get_updates()
            .offset(self.offset)
            .timeout(0)
            .await
            .map(|_| ())
    }
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("offset", &self.offset)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

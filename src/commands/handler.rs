//! Update handlers for `/start` and the "Check Again" button.

use std::sync::Arc;

use teloxide::dispatching::UpdateHandler;
use teloxide::dptree;
use teloxide::prelude::*;
use teloxide::types::{ParseMode, UserId};
use tracing::{debug, error, info, warn};

use super::types::{Command, GateReply, RecheckResult, CHECK_AGAIN_CALLBACK};
use crate::config::{ChatStore, RequiredChat};
use crate::gate::{evaluate, GateOutcome};
use crate::telegram::MembershipLookup;

/// Runs the gate for incoming requests.
///
/// Holds no state besides the store location; the chat list is read again
/// for every request.
#[derive(Debug, Clone)]
pub struct GateHandler {
    store: ChatStore,
}

impl GateHandler {
    /// Creates a new handler reading chats from `store`.
    #[must_use]
    pub const fn new(store: ChatStore) -> Self {
        Self { store }
    }

    /// Builds the reply to `/start` for `user_id`.
    pub async fn start_reply<L>(&self, lookup: &L, user_id: UserId) -> GateReply
    where
        L: MembershipLookup + ?Sized,
    {
        match self.outcome(lookup, user_id).await {
            Some(outcome) => GateReply::from_outcome(&outcome),
            None => GateReply::unavailable(),
        }
    }

    /// Re-runs the gate after the user pressed "Check Again".
    pub async fn recheck<L>(&self, lookup: &L, user_id: UserId) -> RecheckResult
    where
        L: MembershipLookup + ?Sized,
    {
        match self.outcome(lookup, user_id).await {
            Some(outcome) => RecheckResult::from_outcome(&outcome),
            None => RecheckResult::Unavailable,
        }
    }

    async fn outcome<L>(&self, lookup: &L, user_id: UserId) -> Option<GateOutcome>
    where
        L: MembershipLookup + ?Sized,
    {
        let chats = self.load_chats()?;
        Some(evaluate(lookup, user_id, &chats).await)
    }

    fn load_chats(&self) -> Option<Vec<RequiredChat>> {
        match self.store.load() {
            Ok(chats) => Some(chats),
            Err(e) => {
                error!("Failed to load required chats: {}", e);
                None
            }
        }
    }
}

/// Builds the update handler tree for the dispatcher.
///
/// Expects an `Arc<GateHandler>` in the dispatcher dependencies.
pub fn schema() -> UpdateHandler<anyhow::Error> {
    dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(on_command),
        )
        .branch(Update::filter_callback_query().endpoint(on_callback))
}

async fn on_command(
    bot: Bot,
    handler: Arc<GateHandler>,
    msg: Message,
    command: Command,
) -> anyhow::Result<()> {
    let Some(user) = msg.from.as_ref() else {
        debug!("Ignoring {:?} without a sender", command);
        return Ok(());
    };

    match command {
        Command::Start => {
            info!("/start from user {}", user.id);
            let reply = handler.start_reply(&bot, user.id).await;

            let mut request = bot
                .send_message(msg.chat.id, reply.text)
                .parse_mode(ParseMode::Html);
            if let Some(keyboard) = reply.keyboard {
                request = request.reply_markup(keyboard);
            }
            request.await?;
        }
    }

    Ok(())
}

async fn on_callback(bot: Bot, handler: Arc<GateHandler>, q: CallbackQuery) -> anyhow::Result<()> {
    if q.data.as_deref() != Some(CHECK_AGAIN_CALLBACK) {
        debug!("Ignoring unknown callback {:?}", q.data);
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    }

    info!("Re-check requested by user {}", q.from.id);
    let result = handler.recheck(&bot, q.from.id).await;

    // Answer first so the button stops spinning even if the edit fails.
    let mut answer = bot.answer_callback_query(q.id.clone());
    if let Some(alert) = result.alert_text() {
        answer = answer.text(alert).show_alert(true);
    }
    answer.await?;

    if let (Some(text), Some(message)) = (result.replacement_text(), &q.message) {
        if let Err(e) = bot
            .edit_message_text(message.chat().id, message.id(), text)
            .parse_mode(ParseMode::Html)
            .await
        {
            warn!("Could not update message for user {}: {}", q.from.id, e);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use teloxide::types::ChatMemberStatus;

    use super::*;
    use crate::commands::types::{DENIED_TEXT, NOT_CONFIGURED_TEXT};
    use crate::gate::tests::FakeLookup;

    const USER: UserId = UserId(7);

    fn handler_with(content: Option<&str>) -> (tempfile::TempDir, GateHandler) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        if let Some(content) = content {
            fs::write(&path, content).unwrap();
        }
        (dir, GateHandler::new(ChatStore::new(path)))
    }

    #[tokio::test]
    async fn test_start_without_config() {
        let (_dir, handler) = handler_with(None);

        let reply = handler.start_reply(&FakeLookup::default(), USER).await;

        assert_eq!(reply.text, NOT_CONFIGURED_TEXT);
        assert!(reply.keyboard.is_none());
    }

    #[tokio::test]
    async fn test_start_denied_lists_missing_chat() {
        let (_dir, handler) =
            handler_with(Some("TGBOT=x\nREQUIRED_CHATS=100|https://t.me/a,200|https://t.me/b\n"));
        let lookup = FakeLookup::default().with("100", ChatMemberStatus::Member);

        let reply = handler.start_reply(&lookup, USER).await;

        assert_eq!(reply.text, DENIED_TEXT);
        let keyboard = reply.keyboard.unwrap();
        assert_eq!(keyboard.inline_keyboard.len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_entry_never_checked() {
        let (_dir, handler) = handler_with(Some("REQUIRED_CHATS=broken\n"));

        let reply = handler.start_reply(&FakeLookup::default(), USER).await;

        assert_eq!(reply.text, NOT_CONFIGURED_TEXT);
    }

    #[tokio::test]
    async fn test_recheck_picks_up_config_edits() {
        let (dir, handler) = handler_with(Some("REQUIRED_CHATS=100|https://t.me/a\n"));
        let lookup = FakeLookup::default();

        assert_eq!(handler.recheck(&lookup, USER).await, RecheckResult::StillMissing);

        fs::write(dir.path().join(".env"), "REQUIRED_CHATS=\n").unwrap();
        assert_eq!(handler.recheck(&lookup, USER).await, RecheckResult::Granted);
    }

    #[tokio::test]
    async fn test_unreadable_config_never_grants() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be read as a file.
        let handler = GateHandler::new(ChatStore::new(dir.path()));

        let reply = handler.start_reply(&FakeLookup::default(), USER).await;
        assert_eq!(reply, GateReply::unavailable());
        assert_eq!(
            handler.recheck(&FakeLookup::default(), USER).await,
            RecheckResult::Unavailable
        );
    }
}

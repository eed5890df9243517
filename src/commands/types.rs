//! Commands and gate replies.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use teloxide::utils::command::BotCommands;
use tracing::warn;
use url::Url;

use crate::config::RequiredChat;
use crate::gate::GateOutcome;

/// Callback payload of the "Check Again" button.
pub const CHECK_AGAIN_CALLBACK: &str = "check_subs";

/// Label of each join button.
pub const SUBSCRIBE_LABEL: &str = "Subscribe";

/// Label of the retry button.
pub const CHECK_AGAIN_LABEL: &str = "Check Again";

pub const NOT_CONFIGURED_TEXT: &str =
    "Bot is active, but no subscription channels are configured.";

pub const GRANTED_TEXT: &str =
    "<b>Access Granted!</b>\n\nYou are subscribed to all required channels.";

pub const DENIED_TEXT: &str =
    "<b>Access Denied</b>\n\nPlease subscribe to the following channels to use this bot:";

pub const STILL_MISSING_TEXT: &str = "You are still not subscribed to some channels!";

pub const UNAVAILABLE_TEXT: &str =
    "Subscription check is temporarily unavailable. Please try again later.";

/// Commands understood by the bot.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "check your channel subscriptions.")]
    Start,
}

/// Text and optional keyboard answering a `/start`.
#[derive(Debug, Clone, PartialEq)]
pub struct GateReply {
    /// HTML message text.
    pub text: &'static str,

    /// Join buttons and the retry control, present only on denial.
    pub keyboard: Option<InlineKeyboardMarkup>,
}

impl GateReply {
    /// Renders the reply for a gate outcome.
    #[must_use]
    pub fn from_outcome(outcome: &GateOutcome) -> Self {
        match outcome {
            GateOutcome::Unrestricted => Self::plain(NOT_CONFIGURED_TEXT),
            GateOutcome::Granted => Self::plain(GRANTED_TEXT),
            GateOutcome::Denied(missing) => Self {
                text: DENIED_TEXT,
                keyboard: Some(denial_keyboard(missing)),
            },
        }
    }

    /// Reply used when the chat list cannot be read.
    #[must_use]
    pub const fn unavailable() -> Self {
        Self::plain(UNAVAILABLE_TEXT)
    }

    const fn plain(text: &'static str) -> Self {
        Self {
            text,
            keyboard: None,
        }
    }
}

/// Result of pressing "Check Again".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecheckResult {
    /// Replace the denial message with the granted text.
    Granted,

    /// Leave the message alone and alert the user.
    StillMissing,

    /// The chat list could not be read.
    Unavailable,
}

impl RecheckResult {
    #[must_use]
    pub const fn from_outcome(outcome: &GateOutcome) -> Self {
        if outcome.is_allowed() {
            Self::Granted
        } else {
            Self::StillMissing
        }
    }

    /// Alert shown when answering the callback, if any.
    #[must_use]
    pub const fn alert_text(self) -> Option<&'static str> {
        match self {
            Self::Granted => None,
            Self::StillMissing => Some(STILL_MISSING_TEXT),
            Self::Unavailable => Some(UNAVAILABLE_TEXT),
        }
    }

    /// Text that replaces the denial message, if any.
    #[must_use]
    pub const fn replacement_text(self) -> Option<&'static str> {
        match self {
            Self::Granted => Some(GRANTED_TEXT),
            Self::StillMissing | Self::Unavailable => None,
        }
    }
}

/// Builds one join button per missing chat that has a usable link, followed
/// by the retry control.
#[must_use]
pub fn denial_keyboard(missing: &[RequiredChat]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = missing
        .iter()
        .filter(|chat| chat.has_link())
        .filter_map(|chat| match Url::parse(&chat.link) {
            Ok(url) => Some(vec![InlineKeyboardButton::url(SUBSCRIBE_LABEL, url)]),
            Err(e) => {
                warn!("Skipping invalid invite link for {} ({}): {}", chat.id, chat.link, e);
                None
            }
        })
        .collect();

    rows.push(vec![InlineKeyboardButton::callback(
        CHECK_AGAIN_LABEL,
        CHECK_AGAIN_CALLBACK,
    )]);

    InlineKeyboardMarkup::new(rows)
}

#[cfg(test)]
mod tests {
    use teloxide::types::InlineKeyboardButtonKind;

    use super::*;

    fn url_of(button: &InlineKeyboardButton) -> Option<&str> {
        match &button.kind {
            InlineKeyboardButtonKind::Url(url) => Some(url.as_str()),
            _ => None,
        }
    }

    fn callback_of(button: &InlineKeyboardButton) -> Option<&str> {
        match &button.kind {
            InlineKeyboardButtonKind::CallbackData(data) => Some(data.as_str()),
            _ => None,
        }
    }

    #[test]
    fn test_parse_start() {
        assert_eq!(Command::parse("/start", "gate_bot").ok(), Some(Command::Start));
        assert_eq!(
            Command::parse("/start@gate_bot", "gate_bot").ok(),
            Some(Command::Start)
        );
        assert!(Command::parse("/stop", "gate_bot").is_err());
    }

    #[test]
    fn test_unrestricted_reply_has_no_buttons() {
        let reply = GateReply::from_outcome(&GateOutcome::Unrestricted);
        assert_eq!(reply.text, NOT_CONFIGURED_TEXT);
        assert!(reply.keyboard.is_none());
    }

    #[test]
    fn test_granted_reply() {
        let reply = GateReply::from_outcome(&GateOutcome::Granted);
        assert_eq!(reply.text, GRANTED_TEXT);
        assert!(reply.keyboard.is_none());
    }

    #[test]
    fn test_denied_reply_single_missing() {
        let outcome = GateOutcome::Denied(vec![RequiredChat::new("200", "https://t.me/b")]);

        let reply = GateReply::from_outcome(&outcome);
        assert_eq!(reply.text, DENIED_TEXT);

        let keyboard = reply.keyboard.unwrap();
        let rows = &keyboard.inline_keyboard;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), 1);
        assert_eq!(rows[0][0].text, SUBSCRIBE_LABEL);
        assert_eq!(url_of(&rows[0][0]), Some("https://t.me/b"));
        assert_eq!(rows[1][0].text, CHECK_AGAIN_LABEL);
        assert_eq!(callback_of(&rows[1][0]), Some(CHECK_AGAIN_CALLBACK));
    }

    #[test]
    fn test_chats_without_usable_link_get_no_button() {
        let keyboard = denial_keyboard(&[
            RequiredChat::new("1", ""),
            RequiredChat::new("2", "not a url"),
            RequiredChat::new("3", "https://t.me/+AbCdEf"),
        ]);

        let rows = &keyboard.inline_keyboard;
        assert_eq!(rows.len(), 2);
        assert_eq!(url_of(&rows[0][0]), Some("https://t.me/+AbCdEf"));
        assert_eq!(callback_of(&rows[1][0]), Some(CHECK_AGAIN_CALLBACK));
    }

    #[test]
    fn test_denied_without_links_still_offers_retry() {
        let reply = GateReply::from_outcome(&GateOutcome::Denied(vec![RequiredChat::new("1", "")]));

        let keyboard = reply.keyboard.unwrap();
        assert_eq!(keyboard.inline_keyboard.len(), 1);
        assert_eq!(keyboard.inline_keyboard[0][0].text, CHECK_AGAIN_LABEL);
    }

    #[test]
    fn test_recheck_result() {
        assert_eq!(
            RecheckResult::from_outcome(&GateOutcome::Granted),
            RecheckResult::Granted
        );
        assert_eq!(
            RecheckResult::from_outcome(&GateOutcome::Unrestricted),
            RecheckResult::Granted
        );
        assert_eq!(
            RecheckResult::from_outcome(&GateOutcome::Denied(vec![RequiredChat::new("1", "")])),
            RecheckResult::StillMissing
        );
    }

    #[test]
    fn test_recheck_result_texts() {
        assert_eq!(RecheckResult::Granted.alert_text(), None);
        assert_eq!(RecheckResult::Granted.replacement_text(), Some(GRANTED_TEXT));
        assert_eq!(
            RecheckResult::StillMissing.alert_text(),
            Some(STILL_MISSING_TEXT)
        );
        assert_eq!(RecheckResult::StillMissing.replacement_text(), None);
        assert_eq!(RecheckResult::Unavailable.alert_text(), Some(UNAVAILABLE_TEXT));
        assert_eq!(RecheckResult::Unavailable.replacement_text(), None);
    }

    #[test]
    fn test_manually_added_link_gets_button() {
        let target = crate::discovery::parse_manual_target("t.me/rustlang").unwrap();
        let missing = vec![RequiredChat::new("@rustlang", target.link())];

        let keyboard = denial_keyboard(&missing);

        assert_eq!(keyboard.inline_keyboard.len(), 2);
    }
}

//! Operator-entered chat links.

use teloxide::prelude::*;
use teloxide::types::{Chat, Recipient};
use teloxide::RequestError;
use url::Url;

/// What a typed link or handle refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManualTarget {
    /// A private invite link; the chat id cannot be looked up from it.
    Private { link: String },

    /// A public chat that can be resolved by handle.
    Public {
        /// Handle with a leading `@`.
        handle: String,
        /// Link to store for the chat.
        link: String,
    },
}

impl ManualTarget {
    /// Link to store for this target.
    #[must_use]
    pub fn link(&self) -> &str {
        match self {
            Self::Private { link } | Self::Public { link, .. } => link,
        }
    }
}

/// Interprets a `t.me` link, `@handle`, or bare handle.
///
/// Links without a scheme get `https://`. Returns `None` when nothing
/// usable was entered: empty input, a link that does not parse, or a
/// handle with characters Telegram does not allow.
#[must_use]
pub fn parse_manual_target(input: &str) -> Option<ManualTarget> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if input.contains('+') || input.contains("joinchat/") {
        return Some(ManualTarget::Private {
            link: normalize_link(input)?,
        });
    }

    let (path, is_link) = match input.split_once("t.me/") {
        Some((_, path)) => (path, true),
        None => (input, false),
    };

    let name = path
        .split(['/', '?'])
        .next()
        .unwrap_or_default()
        .trim_start_matches('@');
    if !is_valid_handle(name) {
        return None;
    }

    let link = if is_link {
        normalize_link(input)?
    } else {
        format!("https://t.me/{name}")
    };

    Some(ManualTarget::Public {
        handle: format!("@{name}"),
        link,
    })
}

/// Adds a missing scheme and checks the result is an absolute URL.
fn normalize_link(input: &str) -> Option<String> {
    let candidate = if input.contains("://") {
        input.to_owned()
    } else {
        format!("https://{input}")
    };

    let url = Url::parse(&candidate).ok()?;
    url.host_str()?;
    Some(candidate)
}

fn is_valid_handle(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Looks up a public chat by its `@handle`.
pub async fn resolve_handle(bot: &Bot, handle: &str) -> Result<Chat, RequestError> {
    bot.get_chat(Recipient::ChannelUsername(handle.to_owned()))
        .await
}

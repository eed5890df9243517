//! Chat membership lookups.

use std::fmt::Display;
use std::future::Future;

use teloxide::prelude::*;
use teloxide::types::{ChatId, ChatMemberStatus, Recipient, UserId};
use teloxide::RequestError;

use crate::config::RequiredChat;

/// Source of a user's membership status in a chat.
///
/// Implemented by [`Bot`]; tests plug in an in-memory table.
pub trait MembershipLookup {
    /// Error returned when the status cannot be determined.
    type Error: Display;

    /// Looks up the status of `user_id` in `chat`.
    fn member_status(
        &self,
        chat: &RequiredChat,
        user_id: UserId,
    ) -> impl Future<Output = Result<ChatMemberStatus, Self::Error>> + Send;
}

impl MembershipLookup for Bot {
    type Error = RequestError;

    async fn member_status(
        &self,
        chat: &RequiredChat,
        user_id: UserId,
    ) -> Result<ChatMemberStatus, Self::Error> {
        let member = self
            .get_chat_member(chat_recipient(&chat.id), user_id)
            .await?;
        Ok(member.status())
    }
}

/// Whether a status counts as being subscribed.
///
/// Restricted, left, and banned users are all treated as missing.
#[must_use]
pub const fn is_subscribed(status: ChatMemberStatus) -> bool {
    matches!(
        status,
        ChatMemberStatus::Owner | ChatMemberStatus::Administrator | ChatMemberStatus::Member
    )
}

/// Converts a stored chat id into a Bot API recipient.
///
/// Numeric ids become chat ids; anything else is treated as a public
/// username and gets an `@` prefix if it lacks one.
#[must_use]
pub fn chat_recipient(id: &str) -> Recipient {
    let id = id.trim();
    match id.parse::<i64>() {
        Ok(numeric) => Recipient::Id(ChatId(numeric)),
        Err(_) if id.starts_with('@') => Recipient::ChannelUsername(id.to_owned()),
        Err(_) => Recipient::ChannelUsername(format!("@{id}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_subscribed() {
        assert!(is_subscribed(ChatMemberStatus::Owner));
        assert!(is_subscribed(ChatMemberStatus::Administrator));
        assert!(is_subscribed(ChatMemberStatus::Member));
        assert!(!is_subscribed(ChatMemberStatus::Restricted));
        assert!(!is_subscribed(ChatMemberStatus::Left));
        assert!(!is_subscribed(ChatMemberStatus::Banned));
    }

    #[test]
    fn test_chat_recipient_numeric() {
        assert_eq!(
            chat_recipient("-1001234567890"),
            Recipient::Id(ChatId(-1_001_234_567_890))
        );
        assert_eq!(chat_recipient(" 42 "), Recipient::Id(ChatId(42)));
    }

    #[test]
    fn test_chat_recipient_username() {
        assert_eq!(
            chat_recipient("@news"),
            Recipient::ChannelUsername("@news".to_owned())
        );
        assert_eq!(
            chat_recipient("news"),
            Recipient::ChannelUsername("@news".to_owned())
        );
    }
}

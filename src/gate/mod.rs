//! Subscription gate evaluation.
//!
//! Decides whether a user may pass by checking every required chat once.
//! Lookup failures of any kind count as "not a member", so an unreachable
//! chat or a bot without access never grants entry.

use teloxide::types::UserId;
use tracing::{debug, info};

use crate::config::RequiredChat;
use crate::telegram::{is_subscribed, MembershipLookup};

/// Result of running the gate for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// No chats are configured, so access is open.
    Unrestricted,

    /// The user belongs to every required chat.
    Granted,

    /// The user is missing these chats, in configuration order.
    Denied(Vec<RequiredChat>),
}

impl GateOutcome {
    /// Whether the user may proceed.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        !matches!(self, Self::Denied(_))
    }
}

/// Returns the chats `user_id` is not a current member of.
///
/// Every chat is checked even after the first miss so the caller can show
/// the complete list at once.
pub async fn missing_chats<L>(
    lookup: &L,
    user_id: UserId,
    chats: &[RequiredChat],
) -> Vec<RequiredChat>
where
    L: MembershipLookup + ?Sized,
{
    let mut missing = Vec::new();

    for chat in chats {
        let member = match lookup.member_status(chat, user_id).await {
            Ok(status) => {
                debug!("User {} has status {:?} in {}", user_id, status, chat.id);
                is_subscribed(status)
            }
            Err(e) => {
                debug!("Membership lookup for {} in {} failed: {}", user_id, chat.id, e);
                false
            }
        };

        if !member {
            missing.push(chat.clone());
        }
    }

    missing
}

/// Runs the gate for `user_id` against the configured chats.
pub async fn evaluate<L>(lookup: &L, user_id: UserId, chats: &[RequiredChat]) -> GateOutcome
where
    L: MembershipLookup + ?Sized,
{
    if chats.is_empty() {
        return GateOutcome::Unrestricted;
    }

    let missing = missing_chats(lookup, user_id, chats).await;

    info!(
        "Gate for user {}: {}/{} required chats missing",
        user_id,
        missing.len(),
        chats.len()
    );

    if missing.is_empty() {
        GateOutcome::Granted
    } else {
        GateOutcome::Denied(missing)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use teloxide::types::ChatMemberStatus;

    use super::*;

    /// Lookup backed by a fixed table; chats not in the table fail.
    #[derive(Default)]
    pub(crate) struct FakeLookup {
        statuses: HashMap<String, ChatMemberStatus>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeLookup {
        pub(crate) fn with(mut self, chat_id: &str, status: ChatMemberStatus) -> Self {
            self.statuses.insert(chat_id.to_owned(), status);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl MembershipLookup for FakeLookup {
        type Error = String;

        async fn member_status(
            &self,
            chat: &RequiredChat,
            _user_id: UserId,
        ) -> Result<ChatMemberStatus, Self::Error> {
            self.calls.lock().unwrap().push(chat.id.clone());
            self.statuses
                .get(&chat.id)
                .cloned()
                .ok_or_else(|| "Bad Request: chat not found".to_owned())
        }
    }

    const USER: UserId = UserId(42);

    fn chats() -> Vec<RequiredChat> {
        vec![
            RequiredChat::new("100", "https://t.me/a"),
            RequiredChat::new("200", "https://t.me/b"),
            RequiredChat::new("300", ""),
        ]
    }

    #[tokio::test]
    async fn test_all_members_pass() {
        let lookup = FakeLookup::default()
            .with("100", ChatMemberStatus::Member)
            .with("200", ChatMemberStatus::Administrator)
            .with("300", ChatMemberStatus::Owner);

        assert!(missing_chats(&lookup, USER, &chats()).await.is_empty());
        assert_eq!(evaluate(&lookup, USER, &chats()).await, GateOutcome::Granted);
    }

    #[tokio::test]
    async fn test_failures_and_other_statuses_are_missing() {
        let lookup = FakeLookup::default()
            .with("100", ChatMemberStatus::Left)
            .with("200", ChatMemberStatus::Member);

        let missing = missing_chats(&lookup, USER, &chats()).await;

        assert_eq!(
            missing,
            vec![
                RequiredChat::new("100", "https://t.me/a"),
                RequiredChat::new("300", ""),
            ]
        );
    }

    #[tokio::test]
    async fn test_restricted_and_banned_are_missing() {
        let lookup = FakeLookup::default()
            .with("100", ChatMemberStatus::Restricted)
            .with("200", ChatMemberStatus::Banned)
            .with("300", ChatMemberStatus::Member);

        let missing = missing_chats(&lookup, USER, &chats()).await;
        let ids: Vec<_> = missing.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["100", "200"]);
    }

    #[tokio::test]
    async fn test_every_chat_is_checked() {
        let lookup = FakeLookup::default();

        let missing = missing_chats(&lookup, USER, &chats()).await;

        assert_eq!(missing.len(), 3);
        assert_eq!(lookup.calls(), ["100", "200", "300"]);
    }

    #[tokio::test]
    async fn test_no_chats_is_unrestricted() {
        let lookup = FakeLookup::default();

        let outcome = evaluate(&lookup, USER, &[]).await;

        assert_eq!(outcome, GateOutcome::Unrestricted);
        assert!(outcome.is_allowed());
        assert!(lookup.calls().is_empty());
    }

    #[tokio::test]
    async fn test_member_of_first_only() {
        let lookup = FakeLookup::default().with("100", ChatMemberStatus::Member);
        let chats = vec![
            RequiredChat::new("100", "https://t.me/a"),
            RequiredChat::new("200", "https://t.me/b"),
        ];

        let outcome = evaluate(&lookup, USER, &chats).await;

        assert_eq!(
            outcome,
            GateOutcome::Denied(vec![RequiredChat::new("200", "https://t.me/b")])
        );
        assert!(!outcome.is_allowed());
    }
}

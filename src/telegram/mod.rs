//! Telegram Bot API boundary.
//!
//! Wraps the handful of Bot API calls the gate and the setup tool need:
//! membership lookups, chat resolution, and invite links.

mod invite;
mod membership;

pub use invite::{fallback_invite_link, resolve_invite_link};
pub use membership::{chat_recipient, is_subscribed, MembershipLookup};

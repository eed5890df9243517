//! Bot front-end.
//!
//! Answers `/start` with the gate result and handles the "Check Again"
//! callback button attached to a denial.

mod handler;
mod types;

pub use handler::{schema, GateHandler};
pub use types::{
    denial_keyboard, Command, GateReply, RecheckResult, CHECK_AGAIN_CALLBACK, CHECK_AGAIN_LABEL,
    DENIED_TEXT, GRANTED_TEXT, NOT_CONFIGURED_TEXT, STILL_MISSING_TEXT, SUBSCRIBE_LABEL,
    UNAVAILABLE_TEXT,
};

//! Email actions module
//!
//! Executes the actions of a matched ruleset against the mailbox.

mod dispatcher;
mod executor;

pub use dispatcher::{ActionDispatcher, ActionOutcome, ActionStatus};
pub use executor::{ActionCall, InMemoryMailActions, MailActions, Operation};

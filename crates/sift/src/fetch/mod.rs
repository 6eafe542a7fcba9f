//! Fetch step: copies the newest mailbox messages into the record store
//!
//! Upserting makes the step idempotent. Re-fetching a message refreshes
//! its read state and labels.

mod inbox;

pub use inbox::{FetchStats, MessageSource, fetch_records};

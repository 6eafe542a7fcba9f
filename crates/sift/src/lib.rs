//! Sift - rule-driven email triage
//!
//! This crate provides:
//! - Domain models (Record, Label)
//! - Rule definitions, predicates and matching
//! - An idempotency ledger keyed by (record, ruleset hash)
//! - Action dispatch against a mailbox
//! - The rule engine pass tying them together
//! - Gmail API client, OAuth authentication and the fetch step
//! - SQLite and in-memory storage
//!
//! Library code logs through `log`; the binary picks the logger.

pub mod actions;
pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod gmail;
pub mod ledger;
pub mod models;
pub mod rules;
pub mod storage;

pub use actions::{ActionDispatcher, ActionOutcome, ActionStatus, InMemoryMailActions, MailActions};
pub use config::{GmailCredentials, Settings};
pub use engine::{FailurePolicy, PassSummary, RuleEngine};
pub use error::{DispatchError, RulesError};
pub use fetch::{FetchStats, MessageSource, fetch_records};
pub use gmail::{GmailAuth, GmailClient};
pub use ledger::{InMemoryLedger, Ledger, LedgerEntry};
pub use models::{Label, LabelId, Record, RecordId};
pub use rules::{
    Action, Clock, Condition, FixedClock, PredicateMode, RuleSet, RulesetHash, SystemClock,
    load_rulesets, matches, parse_rulesets,
};
pub use storage::{InMemoryRecordStore, RecordStore, SqliteStore};

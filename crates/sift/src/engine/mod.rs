//! Rule engine orchestration
//!
//! One pass evaluates every ruleset against every stored record and
//! dispatches actions exactly once per (record, ruleset) pair.

mod pass;

pub use pass::{FailurePolicy, PassSummary, RuleEngine};

//! Condition evaluation and ruleset matching

use log::debug;

use super::model::{Condition, Field, Predicate, PredicateMode, RuleSet};
use super::predicate::Clock;
use crate::models::Record;

impl Field {
    /// Textual value of this field on a record
    pub fn value(self, record: &Record) -> &str {
        match self {
            Self::Subject => &record.subject,
            Self::Sender => &record.sender,
            Self::Recipient => &record.recipient,
            Self::MessageBody => &record.message_body,
            Self::ReceivedAt => &record.received_at,
            Self::LabelIds => &record.label_ids,
        }
    }
}

/// Look up a field by name; unknown names read as the empty string
pub fn field_value<'r>(record: &'r Record, name: &str) -> &'r str {
    Field::from_name(name).map_or("", |field| field.value(record))
}

/// Evaluate one condition against a record
///
/// An unknown field or predicate name is a non-match.
pub fn evaluate(record: &Record, condition: &Condition, clock: &dyn Clock) -> bool {
    let (Some(field), Some(predicate)) = (
        Field::from_name(&condition.field),
        Predicate::from_name(&condition.predicate),
    ) else {
        debug!(
            "Unknown field or predicate in condition {} {} (record {})",
            condition.field, condition.predicate, record.id
        );
        return false;
    };

    predicate.apply(field.value(record), &condition.value, clock)
}

/// Decide whether a record matches a ruleset
pub fn matches(record: &Record, ruleset: &RuleSet, clock: &dyn Clock) -> bool {
    let mut results = ruleset
        .conditions
        .iter()
        .map(|condition| evaluate(record, condition, clock));

    match ruleset.predicate_mode {
        PredicateMode::All => results.all(|hit| hit),
        PredicateMode::Any => results.any(|hit| hit),
    }
}

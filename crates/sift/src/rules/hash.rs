//! Ruleset identity
//!
//! A ruleset is identified by the SHA-256 of its canonical JSON form
//! (mode, conditions, actions; object keys sorted). The display name is
//! not part of it, so renaming a ruleset keeps its ledger history.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

use super::model::{Action, Condition, PredicateMode, RuleSet};

/// Hex-encoded SHA-256 digest identifying a ruleset's content
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RulesetHash(String);

impl RulesetHash {
    /// Wrap a digest read back from storage
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex chars, enough to tell rulesets apart in logs
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for RulesetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize)]
struct Canonical<'a> {
    predicate_mode: PredicateMode,
    conditions: &'a [Condition],
    actions: &'a [Action],
}

impl RuleSet {
    /// Canonical JSON used for hashing
    pub fn canonical_json(&self) -> String {
        let canonical = Canonical {
            predicate_mode: self.predicate_mode,
            conditions: &self.conditions,
            actions: &self.actions,
        };
        serde_json::to_value(&canonical)
            .map(|value| sort_keys(value).to_string())
            .unwrap_or_default()
    }

    /// Content hash used as the ruleset's durable identity
    pub fn hash(&self) -> RulesetHash {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical_json().as_bytes());
        RulesetHash(format!("{:x}", hasher.finalize()))
    }
}

/// Rebuild objects with keys in lexical order, whatever map type serde_json uses
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k, sort_keys(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice_rules() -> RuleSet {
        RuleSet::new(PredicateMode::Any)
            .condition(Condition::new("subject", "contains", "invoice"))
            .action(Action::new("mark_as_read"))
    }

    #[test]
    fn test_hash_is_stable_hex() {
        let hash = invoice_rules().hash();
        assert_eq!(hash.as_str().len(), 64);
        assert!(hash.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, invoice_rules().hash());
        assert_eq!(hash.short().len(), 12);
    }

    #[test]
    fn test_canonical_json_sorts_keys() {
        let json = invoice_rules().canonical_json();
        assert_eq!(
            json,
            r#"{"actions":[{"type":"mark_as_read"}],"conditions":[{"field":"subject","predicate":"contains","value":"invoice"}],"predicate_mode":"any"}"#
        );
    }

    #[test]
    fn test_any_content_change_changes_hash() {
        let base = invoice_rules().hash();

        let mut mode = invoice_rules();
        mode.predicate_mode = PredicateMode::All;
        assert_ne!(mode.hash(), base);

        let mut value = invoice_rules();
        value.conditions[0].value = "Invoice".into();
        assert_ne!(value.hash(), base);

        let action = invoice_rules().action(Action::with_value("move_to_label", "Archive"));
        assert_ne!(action.hash(), base);
    }

    #[test]
    fn test_name_and_json_key_order_do_not_change_hash() {
        let renamed = invoice_rules().named("Invoices");
        assert_eq!(renamed.hash(), invoice_rules().hash());

        let reordered: RuleSet = serde_json::from_str(
            r#"{"actions": ["mark_as_read"], "rules": [{"value": "invoice", "predicate": "contains", "field": "subject"}], "predicate": "any"}"#,
        )
        .unwrap();
        assert_eq!(reordered.hash(), invoice_rules().hash());
    }
}

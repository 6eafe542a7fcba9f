//! Declarative rule types and the closed sets of names they refer to

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// How condition results combine into a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredicateMode {
    /// Every condition must hold (vacuously true for no conditions)
    All,
    /// At least one condition must hold (false for no conditions)
    Any,
}

impl fmt::Display for PredicateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Any => write!(f, "any"),
        }
    }
}

/// A single `field predicate value` test
///
/// Names are kept exactly as configured. Resolving them against
/// [`Field`] and [`Predicate`] happens at evaluation time so an unknown
/// name turns into a non-match instead of a load failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub predicate: String,
    #[serde(deserialize_with = "string_or_number")]
    pub value: String,
}

impl Condition {
    pub fn new(
        field: impl Into<String>,
        predicate: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            predicate: predicate.into(),
            value: value.into(),
        }
    }
}

/// An action to run when a ruleset matches
///
/// Accepts either a bare name (`"mark_as_read"`) or an object
/// (`{"type": "move_to_label", "value": "Archive"}`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "ActionForm")]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Action {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: None,
        }
    }

    pub fn with_value(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: Some(value.into()),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ActionForm {
    Bare(String),
    Full {
        #[serde(rename = "type")]
        kind: String,
        #[serde(default)]
        value: Option<String>,
    },
}

impl From<ActionForm> for Action {
    fn from(form: ActionForm) -> Self {
        match form {
            ActionForm::Bare(kind) => Self { kind, value: None },
            ActionForm::Full { kind, value } => Self { kind, value },
        }
    }
}

/// A combination mode, its conditions and the actions to run on a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    /// Display name for logs; not part of the ruleset's identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(alias = "predicate")]
    pub predicate_mode: PredicateMode,
    #[serde(alias = "rules")]
    pub conditions: Vec<Condition>,
    pub actions: Vec<Action>,
}

impl RuleSet {
    pub fn new(predicate_mode: PredicateMode) -> Self {
        Self {
            name: None,
            predicate_mode,
            conditions: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Name for log lines
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

/// Record fields a condition can look at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Subject,
    Sender,
    Recipient,
    MessageBody,
    ReceivedAt,
    LabelIds,
}

impl Field {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "subject" => Some(Self::Subject),
            "sender" => Some(Self::Sender),
            "recipient" => Some(Self::Recipient),
            "message_body" => Some(Self::MessageBody),
            "received_at" => Some(Self::ReceivedAt),
            "label_ids" => Some(Self::LabelIds),
            _ => None,
        }
    }
}

/// Comparison functions between a field value and a configured value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Predicate {
    Contains,
    DoesNotContain,
    Equals,
    DoesNotEqual,
    StartsWith,
    EndsWith,
    LessThanDays,
    GreaterThanDays,
}

impl Predicate {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "contains" => Some(Self::Contains),
            "does_not_contain" => Some(Self::DoesNotContain),
            "equals" => Some(Self::Equals),
            "does_not_equal" => Some(Self::DoesNotEqual),
            "starts_with" => Some(Self::StartsWith),
            "ends_with" => Some(Self::EndsWith),
            "less_than_days" => Some(Self::LessThanDays),
            "greater_than_days" => Some(Self::GreaterThanDays),
            _ => None,
        }
    }
}

/// Side effects an action can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    MarkAsRead,
    MarkAsUnread,
    MoveToLabel,
}

impl ActionKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "mark_as_read" => Some(Self::MarkAsRead),
            "mark_as_unread" => Some(Self::MarkAsUnread),
            "move_to_label" => Some(Self::MoveToLabel),
            _ => None,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MarkAsRead => "mark_as_read",
            Self::MarkAsUnread => "mark_as_unread",
            Self::MoveToLabel => "move_to_label",
        };
        write!(f, "{}", s)
    }
}

/// Condition values are text, but `"value": 7` is accepted for day counts
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

//! Action executor capability
//!
//! The mailbox operations a matched ruleset may trigger. `GmailClient`
//! is the production implementation; `InMemoryMailActions` records calls
//! for tests.

use anyhow::{Result, bail};
use std::collections::HashSet;
use std::sync::Mutex;

use crate::models::{Label, LabelId, RecordId};

/// Mailbox mutations the dispatcher relies on
///
/// Each call may fail independently. Implementations own their timeout and
/// retry policy; a call must return (possibly with an error) in bounded time.
pub trait MailActions: Send + Sync {
    /// Remove the UNREAD label
    fn mark_as_read(&self, id: &RecordId) -> Result<()>;

    /// Add the UNREAD label
    fn mark_as_unread(&self, id: &RecordId) -> Result<()>;

    /// The user's label catalog
    fn list_labels(&self) -> Result<Vec<Label>>;

    /// Create a label visible in both the label list and the message list
    fn create_label(&self, name: &str) -> Result<Label>;

    /// Attach a label to a message
    fn add_label(&self, id: &RecordId, label: &LabelId) -> Result<()>;
}

/// Kinds of executor calls, used to inject failures in tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    MarkAsRead,
    MarkAsUnread,
    ListLabels,
    CreateLabel,
    AddLabel,
}

/// A call received by [`InMemoryMailActions`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionCall {
    MarkAsRead(RecordId),
    MarkAsUnread(RecordId),
    ListLabels,
    CreateLabel(String),
    AddLabel(RecordId, LabelId),
}

/// In-memory executor with a label catalog and a call log
#[derive(Default)]
pub struct InMemoryMailActions {
    labels: Mutex<Vec<Label>>,
    calls: Mutex<Vec<ActionCall>>,
    failing: Mutex<HashSet<Operation>>,
}

impl InMemoryMailActions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing label catalog
    pub fn with_labels(labels: impl IntoIterator<Item = Label>) -> Self {
        let actions = Self::new();
        actions.labels.lock().unwrap().extend(labels);
        actions
    }

    /// Make every future call of `op` fail
    pub fn fail_on(&self, op: Operation) {
        self.failing.lock().unwrap().insert(op);
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> Vec<ActionCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Current label catalog
    pub fn labels(&self) -> Vec<Label> {
        self.labels.lock().unwrap().clone()
    }

    fn record(&self, call: ActionCall, op: Operation) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.failing.lock().unwrap().contains(&op) {
            bail!("{:?} failed", op);
        }
        Ok(())
    }
}

impl MailActions for InMemoryMailActions {
    fn mark_as_read(&self, id: &RecordId) -> Result<()> {
        self.record(ActionCall::MarkAsRead(id.clone()), Operation::MarkAsRead)
    }

    fn mark_as_unread(&self, id: &RecordId) -> Result<()> {
        self.record(ActionCall::MarkAsUnread(id.clone()), Operation::MarkAsUnread)
    }

    fn list_labels(&self) -> Result<Vec<Label>> {
        self.record(ActionCall::ListLabels, Operation::ListLabels)?;
        Ok(self.labels())
    }

    fn create_label(&self, name: &str) -> Result<Label> {
        self.record(ActionCall::CreateLabel(name.to_string()), Operation::CreateLabel)?;
        let mut labels = self.labels.lock().unwrap();
        let label = Label::new(format!("Label_{}", labels.len() + 1), name);
        labels.push(label.clone());
        Ok(label)
    }

    fn add_label(&self, id: &RecordId, label: &LabelId) -> Result<()> {
        self.record(
            ActionCall::AddLabel(id.clone(), label.clone()),
            Operation::AddLabel,
        )
    }
}

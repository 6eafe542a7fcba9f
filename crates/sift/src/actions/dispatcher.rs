//! Action dispatcher
//!
//! Runs a matched ruleset's actions, in order, against a [`MailActions`]
//! executor. Failures are reported per action and never stop the list.

use log::{info, warn};
use std::sync::Mutex;

use super::executor::MailActions;
use crate::error::DispatchError;
use crate::models::{Label, LabelId, Record};
use crate::rules::{Action, ActionKind};

/// What happened to one action
#[derive(Debug)]
pub enum ActionStatus {
    Succeeded,
    Failed(DispatchError),
    /// Unknown action type, never sent to the executor
    Skipped,
}

/// Result of dispatching one action
#[derive(Debug)]
pub struct ActionOutcome {
    pub action: Action,
    pub status: ActionStatus,
}

impl ActionOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, ActionStatus::Failed(_))
    }
}

/// Dispatches actions and caches the label catalog for one pass
///
/// The cache is what lets a second `move_to_label` to a freshly created
/// label reuse it instead of creating a duplicate.
pub struct ActionDispatcher<'a> {
    executor: &'a dyn MailActions,
    labels: Mutex<Option<Vec<Label>>>,
}

impl<'a> ActionDispatcher<'a> {
    pub fn new(executor: &'a dyn MailActions) -> Self {
        Self {
            executor,
            labels: Mutex::new(None),
        }
    }

    /// Run every action against the record, in order
    pub fn dispatch(&self, record: &Record, actions: &[Action]) -> Vec<ActionOutcome> {
        actions
            .iter()
            .map(|action| {
                let status = match ActionKind::from_name(&action.kind) {
                    None => {
                        warn!(
                            "Skipping unknown action '{}' for {}",
                            action.kind, record.id
                        );
                        ActionStatus::Skipped
                    }
                    Some(kind) => match self.run(record, kind, action.value.as_deref()) {
                        Ok(()) => {
                            info!("Action '{}' executed for {}", kind, record.id);
                            ActionStatus::Succeeded
                        }
                        Err(e) => {
                            warn!("Error executing '{}' for {}: {}", kind, record.id, e);
                            ActionStatus::Failed(e)
                        }
                    },
                };
                ActionOutcome {
                    action: action.clone(),
                    status,
                }
            })
            .collect()
    }

    fn run(&self, record: &Record, kind: ActionKind, value: Option<&str>) -> Result<(), DispatchError> {
        match kind {
            ActionKind::MarkAsRead => self.executor.mark_as_read(&record.id)?,
            ActionKind::MarkAsUnread => self.executor.mark_as_unread(&record.id)?,
            ActionKind::MoveToLabel => {
                let name = value
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .ok_or(DispatchError::MissingLabelName)?;
                let label_id = self.resolve_label(name)?;
                self.executor.add_label(&record.id, &label_id)?;
            }
        }
        Ok(())
    }

    /// Find a label by case-insensitive name, creating it when missing
    fn resolve_label(&self, name: &str) -> anyhow::Result<LabelId> {
        let mut cache = self.labels.lock().unwrap();
        if cache.is_none() {
            *cache = Some(self.executor.list_labels()?);
        }
        let labels = cache.get_or_insert_with(Vec::new);

        if let Some(label) = labels.iter().find(|l| l.has_name(name)) {
            return Ok(label.id.clone());
        }

        info!("Creating label '{}'", name);
        let label = self.executor.create_label(name)?;
        let id = label.id.clone();
        labels.push(label);
        Ok(id)
    }
}

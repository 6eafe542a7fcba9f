//! A single rule-engine pass

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::actions::{ActionDispatcher, ActionStatus, MailActions};
use crate::ledger::Ledger;
use crate::rules::{Clock, RuleSet, SystemClock, matches};
use crate::storage::RecordStore;

/// What to do with a matched pair when some of its actions failed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Keep the ledger entry: the actions count as attempted
    #[default]
    MarkProcessed,
    /// Drop the ledger entry so the next pass re-evaluates the pair
    Retry,
}

/// Counters from one pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassSummary {
    /// Records read from the store
    pub records_considered: usize,
    /// Rulesets evaluated
    pub rulesets_considered: usize,
    /// Pairs that matched and had their actions dispatched
    pub matches: usize,
    /// Actions sent to the executor
    pub actions_attempted: usize,
    /// Actions the executor (or label resolution) rejected
    pub actions_failed: usize,
    /// Actions with an unknown type
    pub actions_skipped: usize,
    /// Pairs skipped because the ledger already had them
    pub skipped_processed: usize,
    /// Duration of the pass
    pub duration_ms: u64,
}

/// Wires rulesets, records, ledger and executor together
pub struct RuleEngine<'a> {
    rulesets: &'a [RuleSet],
    records: &'a dyn RecordStore,
    ledger: &'a dyn Ledger,
    executor: &'a dyn MailActions,
    clock: &'a dyn Clock,
    policy: FailurePolicy,
}

impl<'a> RuleEngine<'a> {
    pub fn new(
        rulesets: &'a [RuleSet],
        records: &'a dyn RecordStore,
        ledger: &'a dyn Ledger,
        executor: &'a dyn MailActions,
    ) -> Self {
        Self {
            rulesets,
            records,
            ledger,
            executor,
            clock: &SystemClock,
            policy: FailurePolicy::default(),
        }
    }

    /// Use a specific clock for the date predicates
    pub fn with_clock(mut self, clock: &'a dyn Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run one pass over every (ruleset, record) pair
    ///
    /// Only a ledger or record-store failure aborts the pass; entries
    /// committed before the failure stay committed.
    pub fn run_pass(&self) -> Result<PassSummary> {
        let start = Instant::now();
        let mut summary = PassSummary::default();

        let records = self
            .records
            .list_records()
            .context("Failed to load records")?;
        summary.records_considered = records.len();
        summary.rulesets_considered = self.rulesets.len();

        let dispatcher = ActionDispatcher::new(self.executor);

        for ruleset in self.rulesets {
            let hash = ruleset.hash();
            info!(
                "Evaluating ruleset {} ({}) against {} records",
                ruleset.display_name(),
                hash.short(),
                records.len()
            );

            for record in &records {
                if self
                    .ledger
                    .is_processed(&record.id, &hash)
                    .context("Ledger unavailable")?
                {
                    debug!("Skipping {}: already processed by {}", record.id, hash.short());
                    summary.skipped_processed += 1;
                    continue;
                }

                if !matches(record, ruleset, self.clock) {
                    debug!("No match: {} ({})", record.subject, record.id);
                    continue;
                }

                // Claim before dispatch so a concurrent pass can't act on the same pair
                if !self
                    .ledger
                    .mark_processed(&record.id, &hash)
                    .context("Ledger unavailable")?
                {
                    debug!("Skipping {}: claimed by another pass", record.id);
                    summary.skipped_processed += 1;
                    continue;
                }

                info!(
                    "Match: {} ({}) for ruleset {}",
                    record.subject,
                    record.id,
                    ruleset.display_name()
                );
                summary.matches += 1;

                let outcomes = dispatcher.dispatch(record, &ruleset.actions);
                let mut failed = 0;
                for outcome in &outcomes {
                    match outcome.status {
                        ActionStatus::Succeeded => summary.actions_attempted += 1,
                        ActionStatus::Failed(_) => {
                            summary.actions_attempted += 1;
                            failed += 1;
                        }
                        ActionStatus::Skipped => summary.actions_skipped += 1,
                    }
                }
                summary.actions_failed += failed;

                if failed > 0 && self.policy == FailurePolicy::Retry {
                    warn!(
                        "{} action(s) failed for {}; leaving it for the next pass",
                        failed, record.id
                    );
                    self.ledger
                        .release(&record.id, &hash)
                        .context("Ledger unavailable")?;
                }
            }
        }

        summary.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Pass complete: {} records, {} rulesets, {} matches, {} actions ({} failed, {} skipped), {} already processed in {}ms",
            summary.records_considered,
            summary.rulesets_considered,
            summary.matches,
            summary.actions_attempted,
            summary.actions_failed,
            summary.actions_skipped,
            summary.skipped_processed,
            summary.duration_ms
        );
        Ok(summary)
    }
}

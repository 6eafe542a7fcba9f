//! Idempotency ledger
//!
//! Durable record of which (record, ruleset) pairs have already had their
//! actions dispatched. A pair present in the ledger is never dispatched
//! again; the only way back is an external deletion.

mod memory;

pub use memory::InMemoryLedger;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::models::RecordId;
use crate::rules::RulesetHash;

/// One processed (record, ruleset) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub record_id: RecordId,
    pub ruleset_hash: RulesetHash,
    pub processed_at: DateTime<Utc>,
}

/// Trait for ledger storage
///
/// Implementations must make [`Ledger::mark_processed`] a single atomic
/// insert-if-absent, so two concurrent passes can never both claim a pair.
pub trait Ledger: Send + Sync {
    /// Check whether the pair already has an entry
    fn is_processed(&self, record_id: &RecordId, ruleset: &RulesetHash) -> Result<bool>;

    /// Insert the pair if absent
    ///
    /// Returns `true` when this call created the entry, `false` when it
    /// already existed. Marking twice is not an error.
    fn mark_processed(&self, record_id: &RecordId, ruleset: &RulesetHash) -> Result<bool>;

    /// Remove the pair so a later pass re-evaluates it
    fn release(&self, record_id: &RecordId, ruleset: &RulesetHash) -> Result<()>;

    /// All entries, oldest first
    fn entries(&self) -> Result<Vec<LedgerEntry>>;

    /// Number of entries
    fn count(&self) -> Result<usize> {
        Ok(self.entries()?.len())
    }
}

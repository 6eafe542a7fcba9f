//! In-memory ledger, for tests and dry runs

use anyhow::Result;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{Ledger, LedgerEntry};
use crate::models::RecordId;
use crate::rules::RulesetHash;

/// Ledger kept in a HashMap behind a RwLock
///
/// The write lock covers the whole check-and-insert, which is what makes
/// `mark_processed` atomic.
#[derive(Default)]
pub struct InMemoryLedger {
    entries: RwLock<HashMap<(RecordId, RulesetHash), LedgerEntry>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Ledger for InMemoryLedger {
    fn is_processed(&self, record_id: &RecordId, ruleset: &RulesetHash) -> Result<bool> {
        let entries = self.entries.read().unwrap();
        Ok(entries.contains_key(&(record_id.clone(), ruleset.clone())))
    }

    fn mark_processed(&self, record_id: &RecordId, ruleset: &RulesetHash) -> Result<bool> {
        let mut entries = self.entries.write().unwrap();
        let key = (record_id.clone(), ruleset.clone());
        if entries.contains_key(&key) {
            return Ok(false);
        }
        entries.insert(
            key,
            LedgerEntry {
                record_id: record_id.clone(),
                ruleset_hash: ruleset.clone(),
                processed_at: Utc::now(),
            },
        );
        Ok(true)
    }

    fn release(&self, record_id: &RecordId, ruleset: &RulesetHash) -> Result<()> {
        let mut entries = self.entries.write().unwrap();
        entries.remove(&(record_id.clone(), ruleset.clone()));
        Ok(())
    }

    fn entries(&self) -> Result<Vec<LedgerEntry>> {
        let entries = self.entries.read().unwrap();
        let mut list: Vec<LedgerEntry> = entries.values().cloned().collect();
        list.sort_by(|a, b| a.processed_at.cmp(&b.processed_at));
        Ok(list)
    }

    fn count(&self) -> Result<usize> {
        Ok(self.entries.read().unwrap().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn hash(s: &str) -> RulesetHash {
        RulesetHash::from_hex(s)
    }

    #[test]
    fn test_mark_is_idempotent() {
        let ledger = InMemoryLedger::new();
        let id = RecordId::new("m1");

        assert!(!ledger.is_processed(&id, &hash("h1")).unwrap());
        assert!(ledger.mark_processed(&id, &hash("h1")).unwrap());
        assert!(!ledger.mark_processed(&id, &hash("h1")).unwrap());
        assert!(ledger.is_processed(&id, &hash("h1")).unwrap());
        assert!(!ledger.is_processed(&id, &hash("h2")).unwrap());
        assert_eq!(ledger.count().unwrap(), 1);
    }

    #[test]
    fn test_release() {
        let ledger = InMemoryLedger::new();
        let id = RecordId::new("m1");

        ledger.mark_processed(&id, &hash("h1")).unwrap();
        ledger.release(&id, &hash("h1")).unwrap();
        assert!(!ledger.is_processed(&id, &hash("h1")).unwrap());
        // Releasing a missing pair is fine
        ledger.release(&id, &hash("h1")).unwrap();
    }

    #[test]
    fn test_concurrent_claims_have_one_winner() {
        let ledger = Arc::new(InMemoryLedger::new());
        let winners = Arc::new(AtomicUsize::new(0));

        std::thread::scope(|s| {
            for _ in 0..8 {
                let ledger = Arc::clone(&ledger);
                let winners = Arc::clone(&winners);
                s.spawn(move || {
                    if ledger.mark_processed(&RecordId::new("m1"), &hash("h1")).unwrap() {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert_eq!(ledger.count().unwrap(), 1);
    }
}

//! In-memory record storage
//!
//! Used by tests and anywhere a throwaway store is enough.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::RwLock;

use super::RecordStore;
use crate::models::{Record, RecordId};

/// In-memory implementation of RecordStore
///
/// Keeps records in a Vec to preserve insertion order, with an index by ID
/// so replacing a record keeps its original position.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<Vec<Record>>,
    index: RwLock<HashMap<RecordId, usize>>,
}

impl InMemoryRecordStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-filled with records
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        let store = Self::new();
        for record in records {
            // Infallible for the in-memory store
            let _ = store.upsert_record(record);
        }
        store
    }
}

impl RecordStore for InMemoryRecordStore {
    fn upsert_record(&self, record: Record) -> Result<()> {
        let mut records = self.records.write().unwrap();
        let mut index = self.index.write().unwrap();

        match index.get(&record.id) {
            Some(&pos) => records[pos] = record,
            None => {
                index.insert(record.id.clone(), records.len());
                records.push(record);
            }
        }
        Ok(())
    }

    fn get_record(&self, id: &RecordId) -> Result<Option<Record>> {
        let records = self.records.read().unwrap();
        let index = self.index.read().unwrap();
        Ok(index.get(id).map(|&pos| records[pos].clone()))
    }

    fn list_records(&self) -> Result<Vec<Record>> {
        Ok(self.records.read().unwrap().clone())
    }

    fn has_record(&self, id: &RecordId) -> Result<bool> {
        Ok(self.index.read().unwrap().contains_key(id))
    }

    fn count_records(&self) -> Result<usize> {
        Ok(self.records.read().unwrap().len())
    }
}

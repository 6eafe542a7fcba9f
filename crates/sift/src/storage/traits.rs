//! Storage trait definitions

use crate::models::{Record, RecordId};
use anyhow::Result;

/// Trait for record storage
///
/// The fetch step writes records; a rule-engine pass only reads them.
pub trait RecordStore: Send + Sync {
    /// Insert or replace a record
    fn upsert_record(&self, record: Record) -> Result<()>;

    /// Get a record by ID
    fn get_record(&self, id: &RecordId) -> Result<Option<Record>>;

    /// List all records in insertion order
    fn list_records(&self) -> Result<Vec<Record>>;

    /// Check if a record exists
    fn has_record(&self, id: &RecordId) -> Result<bool>;

    /// Count stored records
    fn count_records(&self) -> Result<usize>;
}

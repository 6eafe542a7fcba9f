//! Storage traits and implementations
//!
//! Records come from the fetch step and are read by rule-engine passes.
//! The SQLite backend also carries the idempotency ledger.

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryRecordStore;
pub use sqlite::SqliteStore;
pub use traits::RecordStore;

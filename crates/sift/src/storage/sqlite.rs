//! SQLite storage for records and the idempotency ledger
//!
//! Both live in one database file so a single migration history covers
//! the whole schema.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use rusqlite_migration::{M, Migrations};

use super::traits::RecordStore;
use crate::ledger::{Ledger, LedgerEntry};
use crate::models::{Record, RecordId};
use crate::rules::RulesetHash;

/// How long a writer waits on another process holding the database lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database migrations
///
/// Each migration is applied in order. The user_version pragma tracks which
/// migrations have been applied.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        // Migration 1: fetched messages
        M::up(
            r#"
            CREATE TABLE emails (
                id TEXT PRIMARY KEY,
                thread_id TEXT NOT NULL DEFAULT '',
                sender TEXT NOT NULL DEFAULT '',
                recipient TEXT NOT NULL DEFAULT '',
                subject TEXT NOT NULL DEFAULT '',
                snippet TEXT NOT NULL DEFAULT '',
                message_body TEXT NOT NULL DEFAULT '',
                received_at TEXT NOT NULL DEFAULT '',
                is_read INTEGER NOT NULL DEFAULT 0,
                label_ids TEXT NOT NULL DEFAULT ''
            );
            "#,
        ),
        // Migration 2: (record, ruleset) pairs whose actions were dispatched
        M::up(
            r#"
            CREATE TABLE processed_rules (
                record_id TEXT NOT NULL,
                ruleset_hash TEXT NOT NULL,
                processed_at TEXT NOT NULL,
                PRIMARY KEY (record_id, ruleset_hash)
            );

            CREATE INDEX idx_processed_rules_processed_at
                ON processed_rules(processed_at ASC);
            "#,
        ),
    ])
}

/// SQLite-backed record store and ledger
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `db_path` and bring the schema up to date
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        let mut conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database at {:?}", db_path))?;

        // WAL lets readers proceed while another pass writes ledger entries.
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            "#,
        )?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        migrations()
            .to_latest(&mut conn)
            .context("Failed to run database migrations")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn row_to_record(row: &Row<'_>) -> rusqlite::Result<Record> {
        Ok(Record {
            id: RecordId::new(row.get::<_, String>(0)?),
            thread_id: row.get(1)?,
            sender: row.get(2)?,
            recipient: row.get(3)?,
            subject: row.get(4)?,
            snippet: row.get(5)?,
            message_body: row.get(6)?,
            received_at: row.get(7)?,
            is_read: row.get(8)?,
            label_ids: row.get(9)?,
        })
    }
}

const RECORD_COLUMNS: &str = "id, thread_id, sender, recipient, subject, snippet, \
                              message_body, received_at, is_read, label_ids";

impl RecordStore for SqliteStore {
    fn upsert_record(&self, record: Record) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        // ON CONFLICT keeps the rowid, so re-fetching doesn't reorder records
        conn.execute(
            r#"
            INSERT INTO emails (id, thread_id, sender, recipient, subject, snippet,
                                message_body, received_at, is_read, label_ids)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(id) DO UPDATE SET
                thread_id = excluded.thread_id,
                sender = excluded.sender,
                recipient = excluded.recipient,
                subject = excluded.subject,
                snippet = excluded.snippet,
                message_body = excluded.message_body,
                received_at = excluded.received_at,
                is_read = excluded.is_read,
                label_ids = excluded.label_ids
            "#,
            params![
                record.id.as_str(),
                record.thread_id,
                record.sender,
                record.recipient,
                record.subject,
                record.snippet,
                record.message_body,
                record.received_at,
                record.is_read,
                record.label_ids,
            ],
        )
        .with_context(|| format!("Failed to store record {}", record.id))?;
        Ok(())
    }

    fn get_record(&self, id: &RecordId) -> Result<Option<Record>> {
        let conn = self.conn.lock().unwrap();
        let record = conn
            .query_row(
                &format!("SELECT {} FROM emails WHERE id = ?", RECORD_COLUMNS),
                [id.as_str()],
                Self::row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    fn list_records(&self) -> Result<Vec<Record>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM emails ORDER BY rowid ASC",
            RECORD_COLUMNS
        ))?;
        let records = stmt
            .query_map([], Self::row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn has_record(&self, id: &RecordId) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM emails WHERE id = ?)",
            [id.as_str()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn count_records(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM emails", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl Ledger for SqliteStore {
    fn is_processed(&self, record_id: &RecordId, ruleset: &RulesetHash) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM processed_rules
                 WHERE record_id = ? AND ruleset_hash = ?)",
                params![record_id.as_str(), ruleset.as_str()],
                |row| row.get(0),
            )
            .context("Failed to query ledger")?;
        Ok(exists)
    }

    fn mark_processed(&self, record_id: &RecordId, ruleset: &RulesetHash) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        // The primary key makes this a single atomic claim, across processes too
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO processed_rules (record_id, ruleset_hash, processed_at)
                 VALUES (?, ?, ?)",
                params![record_id.as_str(), ruleset.as_str(), Utc::now().to_rfc3339()],
            )
            .context("Failed to write ledger entry")?;
        Ok(inserted == 1)
    }

    fn release(&self, record_id: &RecordId, ruleset: &RulesetHash) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM processed_rules WHERE record_id = ? AND ruleset_hash = ?",
            params![record_id.as_str(), ruleset.as_str()],
        )
        .context("Failed to release ledger entry")?;
        Ok(())
    }

    fn entries(&self) -> Result<Vec<LedgerEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT record_id, ruleset_hash, processed_at FROM processed_rules
             ORDER BY processed_at ASC, rowid ASC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(record_id, hash, processed_at)| {
                let processed_at = DateTime::parse_from_rfc3339(&processed_at)
                    .with_context(|| format!("Bad processed_at in ledger: {}", processed_at))?
                    .with_timezone(&Utc);
                Ok(LedgerEntry {
                    record_id: RecordId::new(record_id),
                    ruleset_hash: RulesetHash::from_hex(hash),
                    processed_at,
                })
            })
            .collect()
    }

    fn count(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM processed_rules", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

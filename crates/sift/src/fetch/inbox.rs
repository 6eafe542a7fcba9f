//! Inbox fetch implementation

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::time::Instant;

use crate::gmail::api::GmailMessage;
use crate::gmail::{GmailClient, normalize_message};
use crate::models::RecordId;
use crate::storage::RecordStore;

/// Statistics from a fetch operation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FetchStats {
    /// Message IDs returned by the listing
    pub listed: usize,
    /// Records written to the store
    pub stored: usize,
    /// Messages that could not be fetched or normalized
    pub errors: usize,
    /// Duration of the fetch operation
    pub duration_ms: u64,
}

/// Where fetched messages come from
pub trait MessageSource {
    /// IDs of the newest `max` messages, newest first
    fn list_message_ids(&self, max: usize) -> Result<Vec<RecordId>>;

    /// Full message by ID
    fn fetch_message(&self, id: &RecordId) -> Result<GmailMessage>;
}

impl MessageSource for GmailClient {
    fn list_message_ids(&self, max: usize) -> Result<Vec<RecordId>> {
        let response = self.list_messages(max)?;
        Ok(response
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|m| RecordId::new(m.id))
            .collect())
    }

    fn fetch_message(&self, id: &RecordId) -> Result<GmailMessage> {
        self.get_message_with_retry(id)
    }
}

/// Fetch the newest `count` messages and upsert them as records
///
/// A message that fails to fetch or normalize is logged and counted;
/// only the listing and store writes are fatal.
///
/// # Arguments
/// * `source` - Gmail API client (or any other message source)
/// * `store` - Record store
/// * `count` - Maximum number of messages to fetch
pub fn fetch_records(
    source: &dyn MessageSource,
    store: &dyn RecordStore,
    count: usize,
) -> Result<FetchStats> {
    let start = Instant::now();
    let mut stats = FetchStats::default();

    let ids = source
        .list_message_ids(count)
        .context("Failed to list messages")?;
    stats.listed = ids.len();
    debug!("Listed {} message(s)", ids.len());

    for id in &ids {
        let record = match source.fetch_message(id) {
            Ok(message) => match normalize_message(message) {
                Ok(record) => record,
                Err(e) => {
                    warn!("Failed to normalize message {}: {:#}", id, e);
                    stats.errors += 1;
                    continue;
                }
            },
            Err(e) => {
                warn!("Failed to fetch message {}: {:#}", id, e);
                stats.errors += 1;
                continue;
            }
        };

        store
            .upsert_record(record)
            .with_context(|| format!("Failed to store message {}", id))?;
        stats.stored += 1;
    }

    stats.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Fetched {} of {} message(s) ({} errors) in {}ms",
        stats.stored, stats.listed, stats.errors, stats.duration_ms
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmail::api::{Header, MessagePayload};
    use crate::storage::InMemoryRecordStore;

    /// Serves canned messages; IDs without a message fail to fetch
    struct FakeSource {
        ids: Vec<&'static str>,
        messages: Vec<(&'static str, &'static str)>,
    }

    impl MessageSource for FakeSource {
        fn list_message_ids(&self, max: usize) -> Result<Vec<RecordId>> {
            Ok(self.ids.iter().take(max).map(|id| RecordId::new(*id)).collect())
        }

        fn fetch_message(&self, id: &RecordId) -> Result<GmailMessage> {
            let (_, subject) = self
                .messages
                .iter()
                .find(|(m, _)| *m == id.as_str())
                .context("not found")?;
            Ok(GmailMessage {
                id: id.to_string(),
                thread_id: format!("t-{}", id),
                label_ids: Some(vec!["INBOX".into()]),
                snippet: String::new(),
                internal_date: "0".into(),
                payload: Some(MessagePayload {
                    headers: Some(vec![Header {
                        name: "Subject".into(),
                        value: subject.to_string(),
                    }]),
                    body: None,
                    parts: None,
                    mime_type: Some("text/plain".into()),
                }),
            })
        }
    }

    #[test]
    fn test_fetch_stores_records() {
        let source = FakeSource {
            ids: vec!["m1", "m2"],
            messages: vec![("m1", "Invoice"), ("m2", "Lunch")],
        };
        let store = InMemoryRecordStore::new();

        let stats = fetch_records(&source, &store, 10).unwrap();

        assert_eq!(stats.listed, 2);
        assert_eq!(stats.stored, 2);
        assert_eq!(stats.errors, 0);
        let record = store.get_record(&RecordId::new("m1")).unwrap().unwrap();
        assert_eq!(record.subject, "Invoice");
        assert!(record.is_read);
    }

    #[test]
    fn test_fetch_failures_are_counted_not_fatal() {
        let source = FakeSource {
            ids: vec!["m1", "missing", "m2"],
            messages: vec![("m1", "Invoice"), ("m2", "Lunch")],
        };
        let store = InMemoryRecordStore::new();

        let stats = fetch_records(&source, &store, 10).unwrap();

        assert_eq!(stats.listed, 3);
        assert_eq!(stats.stored, 2);
        assert_eq!(stats.errors, 1);
        assert_eq!(store.count_records().unwrap(), 2);
    }

    #[test]
    fn test_refetch_is_idempotent() {
        let source = FakeSource {
            ids: vec!["m1"],
            messages: vec![("m1", "Invoice")],
        };
        let store = InMemoryRecordStore::new();

        fetch_records(&source, &store, 10).unwrap();
        fetch_records(&source, &store, 10).unwrap();

        assert_eq!(store.count_records().unwrap(), 1);
    }

    #[test]
    fn test_fetch_respects_count() {
        let source = FakeSource {
            ids: vec!["m1", "m2"],
            messages: vec![("m1", "Invoice"), ("m2", "Lunch")],
        };
        let store = InMemoryRecordStore::new();

        let stats = fetch_records(&source, &store, 1).unwrap();
        assert_eq!(stats.listed, 1);
        assert_eq!(store.count_records().unwrap(), 1);
    }
}

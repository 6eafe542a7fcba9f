//! Record model: a fetched message as the rule engine sees it

use serde::{Deserialize, Serialize};

/// Unique identifier for a record (Gmail message ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single message with normalized, textual fields
///
/// Header values are kept verbatim, so `sender` is e.g.
/// `"Billing <billing@x.com>"` and `received_at` is the raw `Date` header
/// (`"Tue, 25 Jun 2024 15:00:00 +0000"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub thread_id: String,
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub snippet: String,
    pub message_body: String,
    pub received_at: String,
    pub is_read: bool,
    /// Comma-joined Gmail label IDs (e.g. "INBOX,UNREAD")
    pub label_ids: String,
}

impl Record {
    /// Create a new record builder
    pub fn builder(id: impl Into<RecordId>) -> RecordBuilder {
        RecordBuilder::new(id.into())
    }

    /// Iterate the individual label IDs
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.label_ids.split(',').map(str::trim).filter(|l| !l.is_empty())
    }
}

/// Builder for creating Record instances
pub struct RecordBuilder {
    record: Record,
}

impl RecordBuilder {
    fn new(id: RecordId) -> Self {
        Self {
            record: Record {
                id,
                thread_id: String::new(),
                sender: String::new(),
                recipient: String::new(),
                subject: String::new(),
                snippet: String::new(),
                message_body: String::new(),
                received_at: String::new(),
                is_read: false,
                label_ids: String::new(),
            },
        }
    }

    pub fn thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.record.thread_id = thread_id.into();
        self
    }

    pub fn sender(mut self, sender: impl Into<String>) -> Self {
        self.record.sender = sender.into();
        self
    }

    pub fn recipient(mut self, recipient: impl Into<String>) -> Self {
        self.record.recipient = recipient.into();
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.record.subject = subject.into();
        self
    }

    pub fn snippet(mut self, snippet: impl Into<String>) -> Self {
        self.record.snippet = snippet.into();
        self
    }

    pub fn message_body(mut self, body: impl Into<String>) -> Self {
        self.record.message_body = body.into();
        self
    }

    pub fn received_at(mut self, received_at: impl Into<String>) -> Self {
        self.record.received_at = received_at.into();
        self
    }

    pub fn is_read(mut self, is_read: bool) -> Self {
        self.record.is_read = is_read;
        self
    }

    /// Set labels from individual IDs; they are stored comma-joined
    pub fn labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.record.label_ids = labels
            .into_iter()
            .map(|l| l.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(",");
        self
    }

    pub fn build(self) -> Record {
        self.record
    }
}

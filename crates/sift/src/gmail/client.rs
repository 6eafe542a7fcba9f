//! Gmail API HTTP client
//!
//! Fetches messages and changes labels through the Gmail REST API.
//! Uses synchronous HTTP (ureq) with a global per-request timeout, so a
//! stalled call surfaces as an error instead of hanging a pass.

use anyhow::{Context, Result};
use log::{debug, warn};
use std::time::Duration;
use ureq::Agent;

use super::GmailAuth;
use super::api::{
    CreateLabelRequest, GmailLabel, GmailMessage, ListLabelsResponse, ListMessagesResponse,
    ModifyMessageRequest,
};
use crate::actions::MailActions;
use crate::models::{Label, LabelId, RecordId};

/// Gmail API client
pub struct GmailClient {
    auth: GmailAuth,
    agent: Agent,
}

impl GmailClient {
    /// Gmail API base URL
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1";

    /// Attempts for fetching a single message
    const MAX_RETRIES: u32 = 3;

    /// Create a new Gmail client whose requests give up after `timeout`
    pub fn new(auth: GmailAuth, timeout: Duration) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();

        Self {
            auth,
            agent: Agent::new_with_config(config),
        }
    }

    fn bearer(&self) -> Result<String> {
        Ok(format!("Bearer {}", self.auth.get_access_token()?))
    }

    /// List the newest message IDs in the user's mailbox
    ///
    /// # Arguments
    /// * `max_results` - Maximum number of messages to return (1-500)
    pub fn list_messages(&self, max_results: usize) -> Result<ListMessagesResponse> {
        let url = format!(
            "{}/users/me/messages?maxResults={}",
            Self::BASE_URL,
            max_results.clamp(1, 500)
        );

        let mut response = self
            .agent
            .get(&url)
            .header("Authorization", &self.bearer()?)
            .call()
            .context("Failed to send list messages request")?;

        response
            .body_mut()
            .read_json()
            .context("Failed to parse list messages response")
    }

    /// Get full message details by ID
    pub fn get_message(&self, id: &RecordId) -> Result<GmailMessage> {
        let url = format!(
            "{}/users/me/messages/{}?format=full",
            Self::BASE_URL,
            id.as_str()
        );

        let mut response = self
            .agent
            .get(&url)
            .header("Authorization", &self.bearer()?)
            .call()
            .context("Failed to send get message request")?;

        response
            .body_mut()
            .read_json()
            .context("Failed to parse message response")
    }

    /// Get a message with exponential backoff retry
    pub fn get_message_with_retry(&self, id: &RecordId) -> Result<GmailMessage> {
        let mut delay = Duration::from_millis(100);
        let mut attempt = 1;

        loop {
            match self.get_message(id) {
                Ok(msg) => return Ok(msg),
                Err(e) if attempt >= Self::MAX_RETRIES => return Err(e),
                Err(e) => {
                    debug!("Fetching {} failed (attempt {}): {}", id, attempt, e);
                    let jitter = Duration::from_millis(rand_jitter());
                    std::thread::sleep(delay + jitter);
                    delay *= 2;
                    attempt += 1;
                }
            }
        }
    }

    /// Check if the client is authenticated
    pub fn is_authenticated(&self) -> bool {
        self.auth.is_authenticated()
    }

    // === Labels API ===

    /// List all labels in the user's mailbox
    pub fn fetch_labels(&self) -> Result<ListLabelsResponse> {
        let url = format!("{}/users/me/labels", Self::BASE_URL);

        let mut response = self
            .agent
            .get(&url)
            .header("Authorization", &self.bearer()?)
            .call()
            .context("Failed to send list labels request")?;

        response
            .body_mut()
            .read_json()
            .context("Failed to parse labels response")
    }

    /// Create a user label shown in both the label list and message list
    pub fn create_user_label(&self, name: &str) -> Result<GmailLabel> {
        let url = format!("{}/users/me/labels", Self::BASE_URL);
        let body = CreateLabelRequest {
            name,
            label_list_visibility: "labelShow",
            message_list_visibility: "show",
        };

        let mut response = self
            .agent
            .post(&url)
            .header("Authorization", &self.bearer()?)
            .send_json(&body)
            .with_context(|| format!("Failed to create label '{}'", name))?;

        response
            .body_mut()
            .read_json()
            .context("Failed to parse create label response")
    }

    /// Add and remove labels on a single message
    pub fn modify_message(&self, id: &RecordId, add: &[&str], remove: &[&str]) -> Result<()> {
        let url = format!(
            "{}/users/me/messages/{}/modify",
            Self::BASE_URL,
            id.as_str()
        );
        let body = ModifyMessageRequest {
            add_label_ids: add.to_vec(),
            remove_label_ids: remove.to_vec(),
        };

        self.agent
            .post(&url)
            .header("Authorization", &self.bearer()?)
            .send_json(&body)
            .with_context(|| format!("Failed to modify message {}", id))?;

        Ok(())
    }
}

impl MailActions for GmailClient {
    fn mark_as_read(&self, id: &RecordId) -> Result<()> {
        self.modify_message(id, &[], &[LabelId::UNREAD])
    }

    fn mark_as_unread(&self, id: &RecordId) -> Result<()> {
        self.modify_message(id, &[LabelId::UNREAD], &[])
    }

    fn list_labels(&self) -> Result<Vec<Label>> {
        let labels = self.fetch_labels()?.labels.unwrap_or_default();
        Ok(labels
            .into_iter()
            .map(|l| Label::new(l.id, l.name))
            .collect())
    }

    fn create_label(&self, name: &str) -> Result<Label> {
        let created = self.create_user_label(name)?;
        if created.name != name {
            warn!("Gmail created label '{}' as '{}'", name, created.name);
        }
        Ok(Label::new(created.id, created.name))
    }

    fn add_label(&self, id: &RecordId, label: &LabelId) -> Result<()> {
        self.modify_message(id, &[label.as_str()], &[])
    }
}

/// Generate a random jitter value (0-100ms)
fn rand_jitter() -> u64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let hasher = RandomState::new().build_hasher();
    hasher.finish() % 100
}

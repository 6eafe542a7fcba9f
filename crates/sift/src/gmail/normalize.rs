//! Gmail API response normalization
//!
//! Converts Gmail API messages into the flat records the rule engine reads.

use anyhow::{Context, Result};
use base64::prelude::*;

use super::api::{GmailMessage, MessagePart, MessagePayload};
use crate::models::{LabelId, Record};

/// Normalize a Gmail API message into a Record
///
/// Header values are kept verbatim; `received_at` is the raw `Date` header.
pub fn normalize_message(gmail_msg: GmailMessage) -> Result<Record> {
    let payload = gmail_msg
        .payload
        .as_ref()
        .context("Message has no payload")?;

    let header = |name: &str| extract_header(payload, name).unwrap_or_default();
    let labels = gmail_msg.label_ids.clone().unwrap_or_default();
    let is_read = !labels.iter().any(|l| l == LabelId::UNREAD);

    Ok(Record::builder(gmail_msg.id.as_str())
        .thread_id(gmail_msg.thread_id.as_str())
        .sender(header("From"))
        .recipient(header("To"))
        .subject(header("Subject"))
        .received_at(header("Date"))
        .snippet(decode_html_entities(&gmail_msg.snippet))
        .message_body(extract_plain_text_body(payload).unwrap_or_default())
        .is_read(is_read)
        .labels(labels)
        .build())
}

/// Extract a header value by name
fn extract_header(payload: &MessagePayload, name: &str) -> Option<String> {
    payload.headers.as_ref()?.iter().find_map(|h| {
        if h.name.eq_ignore_ascii_case(name) {
            Some(h.value.clone())
        } else {
            None
        }
    })
}

/// Extract the plain text body: the first text/plain part, or the
/// top-level body of a single-part message
fn extract_plain_text_body(payload: &MessagePayload) -> Option<String> {
    if let Some(parts) = &payload.parts {
        return find_plain_text_in_parts(parts);
    }

    payload
        .body
        .as_ref()
        .and_then(|body| body.data.as_deref())
        .and_then(decode_base64_body)
}

/// Recursively search message parts for text/plain content
fn find_plain_text_in_parts(parts: &[MessagePart]) -> Option<String> {
    for part in parts {
        if part
            .mime_type
            .as_ref()
            .is_some_and(|m| m.starts_with("text/plain"))
            && let Some(body) = &part.body
            && let Some(data) = &body.data
            && let Some(text) = decode_base64_body(data)
        {
            return Some(text);
        }

        if let Some(nested) = &part.parts
            && let Some(text) = find_plain_text_in_parts(nested)
        {
            return Some(text);
        }
    }

    None
}

/// Decode base64-encoded body data, replacing invalid UTF-8
///
/// Gmail uses URL-safe base64 but padding can vary, so we try multiple decoders.
fn decode_base64_body(data: &str) -> Option<String> {
    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE};

    let decoders: &[&base64::engine::GeneralPurpose] =
        &[&BASE64_URL_SAFE_NO_PAD, &URL_SAFE, &STANDARD, &STANDARD_NO_PAD];

    decoders
        .iter()
        .find_map(|decoder| decoder.decode(data).ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

/// Decode HTML entities in snippet text
fn decode_html_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

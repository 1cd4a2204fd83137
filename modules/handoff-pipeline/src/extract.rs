//! Embedded message-list extraction.
//!
//! Transcript pages embed the conversation state as a JSON object inside a
//! `<script>` block; the message list is the slice of that block between two
//! literal markers. The markers are upstream-page-specific and can change
//! without notice, so everything format-specific lives in this module behind
//! `messages_from_document`; if the page format shifts, this is the only
//! file that changes.

use regex::Regex;
use serde::Deserialize;

/// Key that opens the message list inside the embedding object.
const MESSAGES_KEY: &str = "\"messages\"";
/// Token that closes the message array inside the embedding object.
const TAIL_MARKER: &str = "],\"messageId\":null}";

/// One message as it appears on the wire. The embedding object is a
/// superset; unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    pub time_created: String,
    pub is_inbound: bool,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub message_type: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("document contains no <script> block")]
    ScriptBlockMissing,

    #[error("no script block carries a \"messages\" key")]
    MessagesKeyMissing,

    #[error("message list tail marker not found")]
    TailMarkerMissing,

    #[error("message list is not valid JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),
}

/// Pull the embedded message list out of a transcript page.
///
/// Scans `<script>` blocks for the one carrying the `"messages"` key, slices
/// the JSON array between the key and the tail marker, and decodes it.
pub fn messages_from_document(html: &str) -> Result<Vec<WireMessage>, ExtractError> {
    let script = script_block(html)?;
    let json = message_array_slice(script)?;
    Ok(serde_json::from_str(json)?)
}

/// First `<script>` block whose text contains the message key.
fn script_block(html: &str) -> Result<&str, ExtractError> {
    let script_re = Regex::new(r"(?is)<script[^>]*>(.*?)</script>").expect("valid regex");

    let mut saw_script = false;
    for cap in script_re.captures_iter(html) {
        saw_script = true;
        let body = cap.get(1).expect("capture group 1").as_str();
        if body.contains(MESSAGES_KEY) {
            return Ok(body);
        }
    }

    if saw_script {
        Err(ExtractError::MessagesKeyMissing)
    } else {
        Err(ExtractError::ScriptBlockMissing)
    }
}

/// Slice the JSON array between the markers: starts just after
/// `"messages":`, ends at the `]` the tail marker opens with.
fn message_array_slice(script: &str) -> Result<&str, ExtractError> {
    let key_idx = script
        .find(MESSAGES_KEY)
        .ok_or(ExtractError::MessagesKeyMissing)?;
    // +1 skips the colon separating key and value.
    let start = key_idx + MESSAGES_KEY.len() + 1;

    let rest = script.get(start..).ok_or(ExtractError::TailMarkerMissing)?;
    let tail_idx = rest
        .find(TAIL_MARKER)
        .ok_or(ExtractError::TailMarkerMissing)?;
    // +1 keeps the `]` that closes the array.
    Ok(&rest[..tail_idx + 1])
}

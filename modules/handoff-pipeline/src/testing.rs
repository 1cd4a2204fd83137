// Test mocks for the outreach pipeline.
//
// One mock per trait boundary:
// - MockProspectFeed (ProspectFeed) — fixed row list
// - MockTranscriptFetcher (TranscriptFetcher) — HashMap URL→document,
//   `Err` for unregistered URLs
// - RecordingSink (OutreachSink) — captures delivered transcript ids
// - RecordingAnnotator (SentimentAnnotator) — counts rows handed over
//
// Plus helpers for building prospect rows and transcript page documents.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use handoff_common::{DateSpec, MessageRecord, OutreachDecision, ProspectRow};

use crate::feed::ProspectFeed;
use crate::fetcher::TranscriptFetcher;
use crate::notify::OutreachSink;
use crate::sentiment::SentimentAnnotator;

// ---------------------------------------------------------------------------
// MockProspectFeed
// ---------------------------------------------------------------------------

pub struct MockProspectFeed {
    rows: Vec<ProspectRow>,
}

impl MockProspectFeed {
    pub fn new(rows: Vec<ProspectRow>) -> Self {
        Self { rows }
    }
}

#[async_trait]
impl ProspectFeed for MockProspectFeed {
    async fn daily_prospects(&self, _date: &DateSpec) -> Result<Vec<ProspectRow>> {
        Ok(self.rows.clone())
    }
}

// ---------------------------------------------------------------------------
// MockTranscriptFetcher
// ---------------------------------------------------------------------------

/// HashMap-based fetcher. Returns `Err` for unregistered URLs.
/// Builder pattern: `.on_url()`.
pub struct MockTranscriptFetcher {
    documents: HashMap<String, String>,
}

impl MockTranscriptFetcher {
    pub fn new() -> Self {
        Self {
            documents: HashMap::new(),
        }
    }

    pub fn on_url(mut self, url: &str, document: String) -> Self {
        self.documents.insert(url.to_string(), document);
        self
    }
}

impl Default for MockTranscriptFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscriptFetcher for MockTranscriptFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.documents
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("MockTranscriptFetcher: no document registered for {url}"))
    }
}

// ---------------------------------------------------------------------------
// RecordingSink
// ---------------------------------------------------------------------------

/// Captures each delivered ReadyNow batch as a list of transcript ids.
#[derive(Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<Vec<String>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> Vec<Vec<String>> {
        self.delivered.lock().expect("sink mutex").clone()
    }
}

#[async_trait]
impl OutreachSink for RecordingSink {
    async fn deliver(&self, ready: &[OutreachDecision]) -> Result<()> {
        let ids = ready
            .iter()
            .map(|d| d.transcript.transcript_id().to_string())
            .collect();
        self.delivered.lock().expect("sink mutex").push(ids);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingAnnotator
// ---------------------------------------------------------------------------

/// Counts the rows handed to the scoring collaborator.
#[derive(Default)]
pub struct RecordingAnnotator {
    rows_seen: Mutex<usize>,
}

impl RecordingAnnotator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows_seen(&self) -> usize {
        *self.rows_seen.lock().expect("annotator mutex")
    }
}

#[async_trait]
impl SentimentAnnotator for RecordingAnnotator {
    async fn annotate(&self, records: &[MessageRecord]) -> Result<()> {
        *self.rows_seen.lock().expect("annotator mutex") += records.len();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// A feed row pointing at `url`, with a couple of metadata columns.
pub fn prospect_row(url: &str) -> ProspectRow {
    let mut fields = BTreeMap::new();
    fields.insert("transcript".to_string(), url.to_string());
    fields.insert("name".to_string(), "Pat Doe".to_string());
    fields.insert("campaign".to_string(), "spring".to_string());
    ProspectRow {
        transcript_url: url.to_string(),
        fields,
    }
}

/// A transcript page in the upstream embedding format.
/// `messages` is (time, is_inbound, body).
pub fn transcript_document(messages: &[(DateTime<Utc>, bool, &str)]) -> String {
    let array: Vec<serde_json::Value> = messages
        .iter()
        .map(|(ts, inbound, text)| {
            serde_json::json!({
                "timeCreated": ts.to_rfc3339(),
                "isInbound": inbound,
                "text": text,
                "messageType": "TEXT",
            })
        })
        .collect();
    let array = serde_json::to_string(&array).expect("valid message array");
    format!(
        "<html><head><title>Transcript</title></head><body>\
         <script>({{\"conversation\":{{\"messages\":{array},\"messageId\":null}} }})</script>\
         </body></html>"
    )
}

//! Run log — persisted JSON timeline of every action taken during a run.
//!
//! Each run produces a single `{data_dir}/runs/{run_id}.json` file holding
//! an ordered list of events with timestamps, plus the final counters.

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::stats::RunStats;

pub struct RunLog {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    events: Vec<RunEvent>,
    seq: u32,
}

#[derive(Serialize)]
struct RunEvent {
    seq: u32,
    ts: DateTime<Utc>,
    #[serde(flatten)]
    kind: EventKind,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    ProspectFeed {
        prospects: u32,
    },
    FetchTranscript {
        url: String,
        success: bool,
        content_bytes: usize,
    },
    SourceUnchanged {
        url: String,
    },
    ExtractionFailed {
        url: String,
        reason: String,
    },
    TranscriptAssembled {
        transcript_id: String,
        messages: u32,
    },
    Classified {
        transcript_id: String,
        eligibility: String,
    },
    Routed {
        transcript_id: String,
        bucket: String,
        seconds_elapsed: i64,
    },
    SnapshotRotated {
        slot: String,
    },
    SnapshotPruned {
        removed: u32,
    },
}

impl RunLog {
    pub fn new(run_id: String) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            events: Vec::new(),
            seq: 0,
        }
    }

    pub fn log(&mut self, kind: EventKind) {
        self.events.push(RunEvent {
            seq: self.seq,
            ts: Utc::now(),
            kind,
        });
        self.seq += 1;
    }

    /// Serialize the run log to JSON and write it under `data_dir/runs/`.
    /// Returns the file path on success.
    pub fn save(&self, data_dir: &Path, stats: &RunStats) -> Result<PathBuf> {
        let dir = data_dir.join("runs");
        std::fs::create_dir_all(&dir)?;

        let path = dir.join(format!("{}.json", self.run_id));

        let output = SerializedRunLog {
            run_id: &self.run_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            stats: SerializedStats::from(stats),
            events: &self.events,
        };

        std::fs::write(&path, serde_json::to_string_pretty(&output)?)?;
        info!(path = %path.display(), events = self.events.len(), "Run log saved");

        Ok(path)
    }
}

#[derive(Serialize)]
struct SerializedRunLog<'a> {
    run_id: &'a str,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    stats: SerializedStats,
    events: &'a [RunEvent],
}

#[derive(Serialize)]
struct SerializedStats {
    prospects_listed: u32,
    sources_fetched: u32,
    sources_unchanged: u32,
    sources_failed: u32,
    sources_malformed: u32,
    messages_assembled: u32,
    transcripts_built: u32,
    transcripts_inconclusive: u32,
    targets_found: u32,
    ready_now: u32,
    waiting: u32,
}

impl From<&RunStats> for SerializedStats {
    fn from(s: &RunStats) -> Self {
        Self {
            prospects_listed: s.prospects_listed,
            sources_fetched: s.sources_fetched,
            sources_unchanged: s.sources_unchanged,
            sources_failed: s.sources_failed,
            sources_malformed: s.sources_malformed,
            messages_assembled: s.messages_assembled,
            transcripts_built: s.transcripts_built,
            transcripts_inconclusive: s.transcripts_inconclusive,
            targets_found: s.targets_found,
            ready_now: s.ready_now,
            waiting: s.waiting,
        }
    }
}

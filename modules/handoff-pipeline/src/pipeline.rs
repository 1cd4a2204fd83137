//! The per-run pipeline: fetch the prospect feed, pull transcript pages
//! with a bounded worker pool, skip unchanged sources, assemble transcripts,
//! classify, route, deliver, archive.
//!
//! The fetch stage is the only parallel part. Results come back over the
//! stream to this single coordinating task, which owns every fingerprint
//! mutation; no locking, no lost updates. Everything downstream runs
//! sequentially on the full batch. No step retries inside a run: a failed
//! run leaves the previous fingerprint store and snapshot as the recovery
//! point.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};
use uuid::Uuid;

use handoff_common::{
    Config, DateSpec, Eligibility, HandoffError, MessageRecord, OutreachBucket, OutreachDecision,
};

use crate::assembler;
use crate::classify;
use crate::extract;
use crate::feed::{HttpProspectFeed, ProspectFeed};
use crate::fetcher::{HttpTranscriptFetcher, TranscriptFetcher};
use crate::fingerprint::FingerprintStore;
use crate::notify::{NoopSink, OutreachSink};
use crate::router;
use crate::run_log::{EventKind, RunLog};
use crate::sentiment::{NoopAnnotator, SentimentAnnotator};
use crate::stats::RunStats;
use crate::waitlist::WaitlistArchive;

/// Ceiling on in-flight transcript fetches.
const MAX_CONCURRENT_FETCHES: usize = 16;

/// Everything a completed run hands back to its caller.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: String,
    pub stats: RunStats,
    /// Per-source fetch/extraction failures. These never abort the batch;
    /// the affected sources retry next run.
    pub failures: Vec<HandoffError>,
    pub ready_now: Vec<OutreachDecision>,
    pub waiting: Vec<OutreachDecision>,
}

pub struct OutreachPipeline {
    feed: Arc<dyn ProspectFeed>,
    fetcher: Arc<dyn TranscriptFetcher>,
    annotator: Arc<dyn SentimentAnnotator>,
    sink: Arc<dyn OutreachSink>,
    data_dir: PathBuf,
}

impl OutreachPipeline {
    pub fn new(
        feed: Arc<dyn ProspectFeed>,
        fetcher: Arc<dyn TranscriptFetcher>,
        annotator: Arc<dyn SentimentAnnotator>,
        sink: Arc<dyn OutreachSink>,
        data_dir: PathBuf,
    ) -> Self {
        Self {
            feed,
            fetcher,
            annotator,
            sink,
            data_dir,
        }
    }

    /// Wire up the production collaborators from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(HttpProspectFeed::new(
                &config.transcript_api_url,
                config.data_dir.join("feed"),
            )),
            Arc::new(HttpTranscriptFetcher::new()),
            Arc::new(NoopAnnotator),
            Arc::new(NoopSink),
            config.data_dir.clone(),
        )
    }

    /// Run one full cycle for the given date range.
    pub async fn run(&self, date: &DateSpec) -> Result<RunReport, HandoffError> {
        let run_id = Uuid::new_v4().to_string();
        let mut run_log = RunLog::new(run_id.clone());
        let mut stats = RunStats::default();
        let mut failures: Vec<HandoffError> = Vec::new();

        info!(run_id, "Starting outreach run");

        // --- Fetching: prospect listing, then bounded-parallel transcripts ---
        let prospects = self.feed.daily_prospects(date).await?;
        stats.prospects_listed = prospects.len() as u32;
        run_log.log(EventKind::ProspectFeed {
            prospects: stats.prospects_listed,
        });

        let fetcher = self.fetcher.clone();
        let fetch_results: Vec<_> = stream::iter(prospects.into_iter().map(|row| {
            let fetcher = fetcher.clone();
            async move {
                let result = fetcher.fetch(&row.transcript_url).await;
                (row, result)
            }
        }))
        .buffer_unordered(MAX_CONCURRENT_FETCHES)
        .collect()
        .await;

        // --- Filtering + assembling: this task owns the fingerprint map ---
        let mut fingerprints = FingerprintStore::load(self.data_dir.join("fingerprints.json"));
        let mut records: Vec<MessageRecord> = Vec::new();

        for (row, result) in fetch_results {
            let url = row.transcript_url.clone();
            let body = match result {
                Ok(body) => {
                    run_log.log(EventKind::FetchTranscript {
                        url: url.clone(),
                        success: true,
                        content_bytes: body.len(),
                    });
                    stats.sources_fetched += 1;
                    body
                }
                Err(e) => {
                    run_log.log(EventKind::FetchTranscript {
                        url: url.clone(),
                        success: false,
                        content_bytes: 0,
                    });
                    warn!(url, error = %e, "Transcript fetch failed");
                    stats.sources_failed += 1;
                    failures.push(HandoffError::Fetch {
                        url,
                        message: format!("{e:#}"),
                    });
                    continue;
                }
            };

            if fingerprints.check(&url, &body) {
                info!(url, "Source unchanged, skipping");
                run_log.log(EventKind::SourceUnchanged { url });
                stats.sources_unchanged += 1;
                continue;
            }

            let wire = match extract::messages_from_document(&body) {
                Ok(wire) => wire,
                Err(e) => {
                    run_log.log(EventKind::ExtractionFailed {
                        url: url.clone(),
                        reason: e.to_string(),
                    });
                    warn!(url, error = %e, "Extraction failed, source retries next run");
                    stats.sources_malformed += 1;
                    failures.push(HandoffError::Extraction {
                        url,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            match assembler::build_records(&url, wire, &row) {
                Ok(built) => {
                    run_log.log(EventKind::TranscriptAssembled {
                        transcript_id: url.clone(),
                        messages: built.len() as u32,
                    });
                    stats.messages_assembled += built.len() as u32;
                    // Recorded only after successful extraction, so a
                    // failed source keeps its old fingerprint and retries.
                    fingerprints.record(&url, body.len());
                    records.extend(built);
                }
                Err(e) => {
                    run_log.log(EventKind::ExtractionFailed {
                        url: url.clone(),
                        reason: e.to_string(),
                    });
                    warn!(url, error = %e, "Record assembly failed, source retries next run");
                    stats.sources_malformed += 1;
                    failures.push(e);
                }
            }
        }

        // --- Export artifact + sentiment collaborator handoff ---
        assembler::export_records(&self.data_dir.join("all_transcripts.csv"), &records)?;
        if let Err(e) = self.annotator.annotate(&records).await {
            warn!(error = %e, "Sentiment collaborator failed (non-fatal)");
        }

        // --- Classifying + routing ---
        let now = Utc::now();
        let mut ready_now: Vec<OutreachDecision> = Vec::new();
        let mut waiting: Vec<OutreachDecision> = Vec::new();

        for transcript in assembler::group_into_transcripts(records) {
            stats.transcripts_built += 1;
            let eligibility = classify::classify(&transcript);
            run_log.log(EventKind::Classified {
                transcript_id: transcript.transcript_id().to_string(),
                eligibility: eligibility.to_string(),
            });
            match eligibility {
                Eligibility::Inconclusive => {
                    info!(
                        transcript_id = transcript.transcript_id(),
                        "Transcript too short to classify, skipping"
                    );
                    stats.transcripts_inconclusive += 1;
                }
                Eligibility::NotTarget => {}
                Eligibility::Target => {
                    stats.targets_found += 1;
                    let decision = router::route(transcript, now);
                    run_log.log(EventKind::Routed {
                        transcript_id: decision.transcript.transcript_id().to_string(),
                        bucket: decision.bucket.to_string(),
                        seconds_elapsed: decision.seconds_elapsed,
                    });
                    match decision.bucket {
                        OutreachBucket::ReadyNow => {
                            stats.ready_now += 1;
                            ready_now.push(decision);
                        }
                        OutreachBucket::Waiting => {
                            stats.waiting += 1;
                            waiting.push(decision);
                        }
                    }
                }
            }
        }

        // --- Delivery, then archiving ---
        if let Err(e) = self.sink.deliver(&ready_now).await {
            warn!(error = %e, "Outreach sink failed (non-fatal)");
        }

        let archive = WaitlistArchive::new(self.data_dir.join("waitlist"));
        let outcome = archive.write_snapshot(&waiting, now)?;
        if let Some(slot) = &outcome.rotated_to {
            run_log.log(EventKind::SnapshotRotated {
                slot: slot.display().to_string(),
            });
        }
        if outcome.pruned > 0 {
            run_log.log(EventKind::SnapshotPruned {
                removed: outcome.pruned as u32,
            });
        }

        // --- Persist run state ---
        fingerprints.save()?;
        if let Err(e) = run_log.save(&self.data_dir, &stats) {
            warn!(error = %e, "Failed to save run log (non-fatal)");
        }

        info!(run_id, "Outreach run complete. {stats}");

        Ok(RunReport {
            run_id,
            stats,
            failures,
            ready_now,
            waiting,
        })
    }
}

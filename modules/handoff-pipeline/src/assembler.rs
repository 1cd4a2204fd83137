//! Transcript assembly: wire messages + the prospect's feed row become
//! typed `MessageRecord`s, grouped into per-prospect transcripts, and the
//! whole run's flat collection is exported as a CSV artifact.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::info;

use handoff_common::{HandoffError, MessageRecord, OutreachDecision, ProspectRow, ProspectTranscript};

use crate::extract::WireMessage;
use crate::util::atomic_write;

/// Parse an upstream timestamp and normalize to UTC.
/// Accepts RFC 3339 (offset included) and the API's naive datetime forms,
/// which are taken as already-UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(naive.and_utc());
        }
    }
    Err(anyhow!("unrecognized timestamp: {raw}"))
}

/// Convert one source's wire messages into records, attaching the prospect's
/// feed row to every message. A bad timestamp makes the whole source an
/// extraction failure: its fingerprint stays unrecorded and it retries
/// next run.
pub fn build_records(
    url: &str,
    wire: Vec<WireMessage>,
    prospect: &ProspectRow,
) -> Result<Vec<MessageRecord>, HandoffError> {
    wire.into_iter()
        .map(|m| {
            let time_created =
                parse_timestamp(&m.time_created).map_err(|e| HandoffError::Extraction {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            Ok(MessageRecord {
                transcript_id: url.to_string(),
                time_created,
                is_inbound: m.is_inbound,
                body_text: m.text,
                message_type: m.message_type,
                prospect: prospect.fields.clone(),
            })
        })
        .collect()
}

/// Group the run's flat record collection into per-prospect transcripts.
/// Transcript order follows first appearance; messages inside each
/// transcript are stably time-sorted by construction.
pub fn group_into_transcripts(records: Vec<MessageRecord>) -> Vec<ProspectTranscript> {
    let mut order: Vec<String> = Vec::new();
    let mut by_id: std::collections::HashMap<String, Vec<MessageRecord>> =
        std::collections::HashMap::new();

    for record in records {
        if !by_id.contains_key(&record.transcript_id) {
            order.push(record.transcript_id.clone());
        }
        by_id
            .entry(record.transcript_id.clone())
            .or_default()
            .push(record);
    }

    order
        .into_iter()
        .filter_map(|id| {
            let messages = by_id.remove(&id)?;
            ProspectTranscript::new(id, messages)
        })
        .collect()
}

/// Column layout shared by the transcript export and waitlist snapshots:
/// fixed message columns first, then the sorted union of prospect metadata
/// keys (minus `transcript`, which is the first column already).
fn metadata_columns(records: &[MessageRecord]) -> Vec<String> {
    let mut keys: BTreeSet<&str> = BTreeSet::new();
    for record in records {
        keys.extend(record.prospect.keys().map(String::as_str));
    }
    keys.remove("transcript");
    keys.into_iter().map(str::to_string).collect()
}

fn message_row(record: &MessageRecord, meta_cols: &[String]) -> Vec<String> {
    let mut row = vec![
        record.transcript_id.clone(),
        record.time_created.to_rfc3339(),
        record.is_inbound.to_string(),
        record.message_type.clone().unwrap_or_default(),
        record.body_text.clone(),
    ];
    for key in meta_cols {
        row.push(record.prospect.get(key).cloned().unwrap_or_default());
    }
    row
}

/// Serialize the run's flat record collection as CSV.
pub fn records_to_csv(records: &[MessageRecord]) -> Result<String> {
    let meta_cols = metadata_columns(records);

    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut header = vec![
        "transcript".to_string(),
        "time_created".to_string(),
        "is_inbound".to_string(),
        "message_type".to_string(),
        "body_text".to_string(),
    ];
    header.extend(meta_cols.iter().cloned());
    writer.write_record(&header)?;

    for record in records {
        writer.write_record(message_row(record, &meta_cols))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow!("CSV writer flush failed: {e}"))?;
    String::from_utf8(bytes).context("CSV output was not UTF-8")
}

/// Serialize routed decisions as CSV: the bucket's flattened message rows,
/// each annotated with the decision's `seconds_elapsed`.
pub fn decisions_to_csv(decisions: &[OutreachDecision]) -> Result<String> {
    let all_records: Vec<MessageRecord> = decisions
        .iter()
        .flat_map(|d| d.transcript.messages().iter().cloned())
        .collect();
    let meta_cols = metadata_columns(&all_records);

    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut header = vec![
        "transcript".to_string(),
        "time_created".to_string(),
        "is_inbound".to_string(),
        "message_type".to_string(),
        "body_text".to_string(),
    ];
    header.extend(meta_cols.iter().cloned());
    header.push("seconds_elapsed".to_string());
    writer.write_record(&header)?;

    for decision in decisions {
        for record in decision.transcript.messages() {
            let mut row = message_row(record, &meta_cols);
            row.push(decision.seconds_elapsed.to_string());
            writer.write_record(row)?;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow!("CSV writer flush failed: {e}"))?;
    String::from_utf8(bytes).context("CSV output was not UTF-8")
}

/// Write the run's assembled records to the export artifact, replacing any
/// previous run's file wholesale.
pub fn export_records(path: &Path, records: &[MessageRecord]) -> Result<(), HandoffError> {
    let csv = records_to_csv(records).map_err(|e| HandoffError::Persistence(e.to_string()))?;
    atomic_write(path, csv.as_bytes()).map_err(|e| HandoffError::Persistence(e.to_string()))?;
    info!(path = %path.display(), rows = records.len(), "Transcript export written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use chrono::TimeZone;
    use handoff_common::OutreachBucket;

    fn wire(ts: &str, inbound: bool, text: &str) -> WireMessage {
        WireMessage {
            time_created: ts.to_string(),
            is_inbound: inbound,
            text: text.to_string(),
            message_type: Some("TEXT".to_string()),
        }
    }

    fn prospect(url: &str) -> ProspectRow {
        let mut fields = BTreeMap::new();
        fields.insert("transcript".to_string(), url.to_string());
        fields.insert("name".to_string(), "Pat".to_string());
        fields.insert("campaign".to_string(), "spring".to_string());
        ProspectRow {
            transcript_url: url.to_string(),
            fields,
        }
    }

    #[test]
    fn parse_timestamp_rfc3339() {
        let dt = parse_timestamp("2022-05-10T14:00:00Z").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2022, 5, 10, 14, 0, 0).unwrap());
    }

    #[test]
    fn parse_timestamp_with_offset_normalizes_to_utc() {
        let dt = parse_timestamp("2022-05-10T14:00:00+02:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2022, 5, 10, 12, 0, 0).unwrap());
    }

    #[test]
    fn parse_timestamp_naive_forms_assume_utc() {
        let a = parse_timestamp("2022-05-10T14:00:00.250").unwrap();
        let b = parse_timestamp("2022-05-10 14:00:00").unwrap();
        assert_eq!(a.timestamp_millis() % 1000, 250);
        assert_eq!(b, Utc.with_ymd_and_hms(2022, 5, 10, 14, 0, 0).unwrap());
    }

    #[test]
    fn parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("next tuesday").is_err());
    }

    #[test]
    fn build_records_attaches_prospect_metadata() {
        let url = "https://x.test/t/1";
        let records = build_records(
            url,
            vec![wire("2022-05-10T14:00:00Z", true, "hi")],
            &prospect(url),
        )
        .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].transcript_id, url);
        assert_eq!(records[0].prospect.get("name").unwrap(), "Pat");
    }

    #[test]
    fn build_records_bad_timestamp_is_extraction_error() {
        let url = "https://x.test/t/1";
        let err = build_records(url, vec![wire("???", true, "hi")], &prospect(url)).unwrap_err();
        assert!(matches!(err, HandoffError::Extraction { .. }));
    }

    #[test]
    fn grouping_splits_by_transcript_and_sorts_in_time() {
        let u1 = "https://x.test/t/1";
        let u2 = "https://x.test/t/2";
        let mut records = build_records(
            u1,
            vec![
                wire("2022-05-10T14:05:00Z", false, "late"),
                wire("2022-05-10T14:00:00Z", true, "early"),
            ],
            &prospect(u1),
        )
        .unwrap();
        records.extend(
            build_records(
                u2,
                vec![wire("2022-05-10T15:00:00Z", true, "solo")],
                &prospect(u2),
            )
            .unwrap(),
        );

        let transcripts = group_into_transcripts(records);
        assert_eq!(transcripts.len(), 2);
        assert_eq!(transcripts[0].transcript_id(), u1);
        assert_eq!(transcripts[0].messages()[0].body_text, "early");
        assert_eq!(transcripts[1].len(), 1);
    }

    #[test]
    fn records_csv_carries_metadata_columns() {
        let url = "https://x.test/t/1";
        let records = build_records(
            url,
            vec![wire("2022-05-10T14:00:00Z", true, "hi")],
            &prospect(url),
        )
        .unwrap();

        let csv = records_to_csv(&records).unwrap();
        let mut lines = csv.lines();
        let header = lines.next().unwrap();
        assert_eq!(
            header,
            "transcript,time_created,is_inbound,message_type,body_text,campaign,name"
        );
        let row = lines.next().unwrap();
        assert!(row.contains("spring"));
        assert!(row.contains("Pat"));
    }

    #[test]
    fn decisions_csv_annotates_seconds_elapsed() {
        let url = "https://x.test/t/1";
        let records = build_records(
            url,
            vec![
                wire("2022-05-10T14:00:00Z", true, "hi"),
                wire("2022-05-10T14:01:00Z", false, "hello"),
            ],
            &prospect(url),
        )
        .unwrap();
        let transcript = ProspectTranscript::new(url.to_string(), records).unwrap();
        let decision = OutreachDecision {
            transcript,
            seconds_elapsed: 600,
            bucket: OutreachBucket::Waiting,
        };

        let csv = decisions_to_csv(&[decision]).unwrap();
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().ends_with(",seconds_elapsed"));
        assert!(lines.next().unwrap().ends_with(",600"));
        assert!(lines.next().unwrap().ends_with(",600"));
    }

    #[test]
    fn export_overwrites_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("all_transcripts.csv");
        let url = "https://x.test/t/1";

        let first = build_records(
            url,
            vec![wire("2022-05-10T14:00:00Z", true, "first run")],
            &prospect(url),
        )
        .unwrap();
        export_records(&path, &first).unwrap();

        let second = build_records(
            url,
            vec![wire("2022-05-11T09:00:00Z", true, "second run")],
            &prospect(url),
        )
        .unwrap();
        export_records(&path, &second).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("second run"));
        assert!(!contents.contains("first run"));
    }
}

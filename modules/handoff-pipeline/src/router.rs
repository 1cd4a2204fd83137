//! Elapsed-time routing of target transcripts.

use chrono::{DateTime, Utc};

use handoff_common::{OutreachBucket, OutreachDecision, ProspectTranscript};

/// Targets whose last message is older than this go straight to outreach;
/// younger targets wait out the remainder of the hour.
pub const OUTREACH_THRESHOLD_SECS: i64 = 3600;

/// Bucket a target transcript by time since its last message.
///
/// Elapsed is now minus last message time. Negative elapsed (clock skew,
/// a future timestamp upstream) falls through to Waiting, never ReadyNow.
pub fn route(transcript: ProspectTranscript, now: DateTime<Utc>) -> OutreachDecision {
    let seconds_elapsed = (now - transcript.last_message().time_created).num_seconds();
    let bucket = if seconds_elapsed > OUTREACH_THRESHOLD_SECS {
        OutreachBucket::ReadyNow
    } else {
        OutreachBucket::Waiting
    };
    OutreachDecision {
        transcript,
        seconds_elapsed,
        bucket,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use chrono::{Duration, TimeZone};
    use handoff_common::MessageRecord;

    fn transcript_ending_at(last: DateTime<Utc>) -> ProspectTranscript {
        let messages = vec![
            MessageRecord {
                transcript_id: "https://x.test/t/1".to_string(),
                time_created: last - Duration::seconds(120),
                is_inbound: true,
                body_text: String::new(),
                message_type: None,
                prospect: BTreeMap::new(),
            },
            MessageRecord {
                transcript_id: "https://x.test/t/1".to_string(),
                time_created: last,
                is_inbound: false,
                body_text: String::new(),
                message_type: None,
                prospect: BTreeMap::new(),
            },
        ];
        ProspectTranscript::new("https://x.test/t/1".to_string(), messages).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 5, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn older_than_an_hour_is_ready_now() {
        let d = route(transcript_ending_at(now() - Duration::seconds(7200)), now());
        assert_eq!(d.bucket, OutreachBucket::ReadyNow);
        assert_eq!(d.seconds_elapsed, 7200);
    }

    #[test]
    fn within_the_hour_is_waiting() {
        let d = route(transcript_ending_at(now() - Duration::seconds(600)), now());
        assert_eq!(d.bucket, OutreachBucket::Waiting);
        assert_eq!(d.seconds_elapsed, 600);
    }

    #[test]
    fn exactly_one_hour_is_waiting() {
        // Strict `>`: the boundary itself has not yet aged out.
        let d = route(transcript_ending_at(now() - Duration::seconds(3600)), now());
        assert_eq!(d.bucket, OutreachBucket::Waiting);
    }

    #[test]
    fn zero_elapsed_is_waiting() {
        let d = route(transcript_ending_at(now()), now());
        assert_eq!(d.bucket, OutreachBucket::Waiting);
        assert_eq!(d.seconds_elapsed, 0);
    }

    #[test]
    fn future_timestamp_is_waiting() {
        // Clock skew: last message appears newer than now.
        let d = route(transcript_ending_at(now() + Duration::seconds(900)), now());
        assert_eq!(d.bucket, OutreachBucket::Waiting);
        assert_eq!(d.seconds_elapsed, -900);
    }
}

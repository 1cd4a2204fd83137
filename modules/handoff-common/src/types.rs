use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One chatbot interaction inside a prospect's conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Identifies the owning conversation: the prospect's transcript URL.
    pub transcript_id: String,
    /// When the message was created upstream, normalized to UTC.
    pub time_created: DateTime<Utc>,
    /// True when the prospect sent this message TO the chatbot,
    /// false when the chatbot/agent side sent it.
    pub is_inbound: bool,
    pub body_text: String,
    pub message_type: Option<String>,
    /// Prospect metadata copied verbatim from the daily feed row.
    /// BTreeMap keeps export column order deterministic.
    pub prospect: BTreeMap<String, String>,
}

/// One row of the daily prospect feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProspectRow {
    /// URL of this prospect's transcript page.
    pub transcript_url: String,
    /// Every feed column, including `transcript` itself.
    pub fields: BTreeMap<String, String>,
}

/// Ordered, non-empty sequence of messages sharing one transcript id.
/// Messages are ascending by `time_created`; ties keep input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProspectTranscript {
    transcript_id: String,
    messages: Vec<MessageRecord>,
}

impl ProspectTranscript {
    /// Build a transcript, stably sorting messages by creation time.
    /// Returns `None` for an empty message list; an empty transcript
    /// has no meaning anywhere downstream.
    pub fn new(transcript_id: String, mut messages: Vec<MessageRecord>) -> Option<Self> {
        if messages.is_empty() {
            return None;
        }
        // Vec::sort_by_key is stable: equal timestamps keep input order.
        messages.sort_by_key(|m| m.time_created);
        Some(Self {
            transcript_id,
            messages,
        })
    }

    pub fn transcript_id(&self) -> &str {
        &self.transcript_id
    }

    pub fn messages(&self) -> &[MessageRecord] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        false // by construction
    }

    /// The most recent message. Safe: a transcript is never empty.
    pub fn last_message(&self) -> &MessageRecord {
        self.messages.last().expect("transcript is non-empty")
    }
}

/// Outcome of inspecting a transcript's tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    /// The prospect spoke and the bot answered, with nothing after;
    /// the conversation now waits on a human.
    Target,
    /// Mid-exchange or bot-initiated tail.
    NotTarget,
    /// Fewer than two messages; no tail to inspect.
    Inconclusive,
}

impl std::fmt::Display for Eligibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Eligibility::Target => write!(f, "target"),
            Eligibility::NotTarget => write!(f, "not_target"),
            Eligibility::Inconclusive => write!(f, "inconclusive"),
        }
    }
}

/// Which outreach bucket a target transcript landed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutreachBucket {
    ReadyNow,
    Waiting,
}

impl std::fmt::Display for OutreachBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutreachBucket::ReadyNow => write!(f, "ready_now"),
            OutreachBucket::Waiting => write!(f, "waiting"),
        }
    }
}

/// A routed target transcript, annotated with the elapsed time that put it
/// in its bucket. Rebuilt fresh every run; only Waiting is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachDecision {
    pub transcript: ProspectTranscript,
    /// now minus last message time, in seconds. Negative under clock skew.
    pub seconds_elapsed: i64,
    pub bucket: OutreachBucket,
}

/// Target window for the prospect feed query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateSpec {
    /// Both bounds set to the current date.
    Today,
    /// A single day.
    Day(NaiveDate),
    /// A whole calendar month; `year: None` means the current year.
    /// `month` must be 1..=12.
    Month { year: Option<i32>, month: u32 },
    /// January 1 through December 31.
    Year(i32),
}

impl DateSpec {
    /// Resolve to inclusive (start, end) bounds. `today` anchors the
    /// relative variants so callers (and tests) control the clock.
    pub fn range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match *self {
            DateSpec::Today => (today, today),
            DateSpec::Day(d) => (d, d),
            DateSpec::Month { year, month } => {
                let year = year.unwrap_or_else(|| {
                    use chrono::Datelike;
                    today.year()
                });
                let start = NaiveDate::from_ymd_opt(year, month, 1).expect("month in 1..=12");
                (start, month_end(year, month))
            }
            DateSpec::Year(year) => (
                NaiveDate::from_ymd_opt(year, 1, 1).expect("valid year start"),
                NaiveDate::from_ymd_opt(year, 12, 31).expect("valid year end"),
            ),
        }
    }
}

/// Last day of a calendar month, leap years included.
fn month_end(year: i32, month: u32) -> NaiveDate {
    let (next_y, next_m) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_y, next_m, 1)
        .expect("month in 1..=12")
        .pred_opt()
        .expect("valid predecessor")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn msg(id: &str, secs: i64, inbound: bool, text: &str) -> MessageRecord {
        MessageRecord {
            transcript_id: id.to_string(),
            time_created: Utc.timestamp_opt(secs, 0).unwrap(),
            is_inbound: inbound,
            body_text: text.to_string(),
            message_type: None,
            prospect: BTreeMap::new(),
        }
    }

    #[test]
    fn transcript_rejects_empty() {
        assert!(ProspectTranscript::new("t".into(), vec![]).is_none());
    }

    #[test]
    fn transcript_sorts_by_time() {
        let t = ProspectTranscript::new(
            "t".into(),
            vec![msg("t", 30, false, "b"), msg("t", 10, true, "a")],
        )
        .unwrap();
        assert_eq!(t.messages()[0].body_text, "a");
        assert_eq!(t.last_message().body_text, "b");
    }

    #[test]
    fn transcript_sort_is_stable_for_equal_timestamps() {
        let t = ProspectTranscript::new(
            "t".into(),
            vec![
                msg("t", 10, true, "first"),
                msg("t", 10, false, "second"),
                msg("t", 10, true, "third"),
            ],
        )
        .unwrap();
        let texts: Vec<_> = t.messages().iter().map(|m| m.body_text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn date_spec_today() {
        let today = NaiveDate::from_ymd_opt(2022, 5, 10).unwrap();
        assert_eq!(DateSpec::Today.range(today), (today, today));
    }

    #[test]
    fn date_spec_month_uses_true_month_length() {
        let today = NaiveDate::from_ymd_opt(2022, 5, 10).unwrap();
        let (start, end) = DateSpec::Month {
            year: Some(2022),
            month: 2,
        }
        .range(today);
        assert_eq!(start, NaiveDate::from_ymd_opt(2022, 2, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2022, 2, 28).unwrap());
    }

    #[test]
    fn date_spec_month_handles_leap_february() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let (_, end) = DateSpec::Month {
            year: Some(2024),
            month: 2,
        }
        .range(today);
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn date_spec_month_defaults_to_current_year() {
        let today = NaiveDate::from_ymd_opt(2022, 5, 10).unwrap();
        let (start, end) = DateSpec::Month {
            year: None,
            month: 12,
        }
        .range(today);
        assert_eq!(start, NaiveDate::from_ymd_opt(2022, 12, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2022, 12, 31).unwrap());
    }

    #[test]
    fn date_spec_year_spans_full_year() {
        let today = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        let (start, end) = DateSpec::Year(2022).range(today);
        assert_eq!(start, NaiveDate::from_ymd_opt(2022, 1, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2022, 12, 31).unwrap());
    }
}

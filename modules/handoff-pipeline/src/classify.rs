//! Outreach-eligibility classification.
//!
//! A prospect is a target exactly when the prospect spoke, the bot
//! answered, and nothing followed: last message outbound, second-to-last
//! inbound. Anything shorter than two messages has no tail to inspect and
//! is inconclusive.

use handoff_common::{Eligibility, MessageRecord, ProspectTranscript};

/// The last two messages in chronological order, or `None` when the
/// transcript is too short. Returned as (second_to_last, last).
pub fn last_two(messages: &[MessageRecord]) -> Option<(&MessageRecord, &MessageRecord)> {
    match messages {
        [.., prior, last] => Some((prior, last)),
        _ => None,
    }
}

/// Inspect a transcript's tail and classify the prospect.
pub fn classify(transcript: &ProspectTranscript) -> Eligibility {
    let Some((prior, last)) = last_two(transcript.messages()) else {
        return Eligibility::Inconclusive;
    };

    if !last.is_inbound && prior.is_inbound {
        Eligibility::Target
    } else {
        Eligibility::NotTarget
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};

    fn msg(secs: i64, inbound: bool) -> MessageRecord {
        MessageRecord {
            transcript_id: "https://x.test/t/1".to_string(),
            time_created: Utc.timestamp_opt(secs, 0).unwrap(),
            is_inbound: inbound,
            body_text: String::new(),
            message_type: None,
            prospect: BTreeMap::new(),
        }
    }

    fn transcript(tail: &[bool]) -> ProspectTranscript {
        let messages = tail
            .iter()
            .enumerate()
            .map(|(i, &inbound)| msg(i as i64 * 60, inbound))
            .collect();
        ProspectTranscript::new("https://x.test/t/1".to_string(), messages).unwrap()
    }

    #[test]
    fn inbound_then_outbound_is_target() {
        assert_eq!(classify(&transcript(&[true, false])), Eligibility::Target);
    }

    #[test]
    fn tail_governs_regardless_of_earlier_messages() {
        assert_eq!(
            classify(&transcript(&[false, false, true, false])),
            Eligibility::Target
        );
    }

    #[test]
    fn last_message_inbound_is_not_target() {
        // Prospect spoke last; the bot still owes a reply.
        assert_eq!(
            classify(&transcript(&[true, false, true])),
            Eligibility::NotTarget
        );
    }

    #[test]
    fn two_outbound_is_not_target() {
        assert_eq!(
            classify(&transcript(&[false, false])),
            Eligibility::NotTarget
        );
    }

    #[test]
    fn two_inbound_is_not_target() {
        assert_eq!(classify(&transcript(&[true, true])), Eligibility::NotTarget);
    }

    #[test]
    fn single_message_is_inconclusive() {
        assert_eq!(classify(&transcript(&[true])), Eligibility::Inconclusive);
        assert_eq!(classify(&transcript(&[false])), Eligibility::Inconclusive);
    }

    #[test]
    fn last_two_returns_chronological_pair() {
        let t = transcript(&[true, false, true]);
        let (prior, last) = last_two(t.messages()).unwrap();
        assert!(!prior.is_inbound);
        assert!(last.is_inbound);
    }

    #[test]
    fn last_two_rejects_short_slices() {
        let t = transcript(&[true]);
        assert!(last_two(t.messages()).is_none());
        assert!(last_two(&[]).is_none());
    }
}

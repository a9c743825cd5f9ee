//! Pure projection of a raw message feed into day sections.
//!
//! All defaulting of missing or odd fields lives in [`normalize_record`];
//! [`group_into_sections`] only ever sees well-formed [`Message`]s.

use std::collections::BTreeMap;

use chrono::{DateTime, Days, FixedOffset, NaiveDate, Utc};

use parley_shared::constants::{
    FIELD_BODY, FIELD_SENDER_ID, FIELD_STATUS, FIELD_TIMESTAMP, SECTION_LABEL_FORMAT,
};
use parley_shared::{Document, Message, MessageId, MessageSection, MessageStatus, UserId};

/// Turn one feed record into a [`Message`], or `None` if it must be skipped.
///
/// - sender and body are required strings;
/// - a missing, null, or not yet server-resolved timestamp becomes `now`, so
///   a pending local write still shows up immediately;
/// - status falls back to `Sent`.
pub fn normalize_record(doc: &Document, now: DateTime<Utc>) -> Option<Message> {
    let sender = doc.get_str(FIELD_SENDER_ID)?;
    let text = doc.get_str(FIELD_BODY)?;

    Some(Message {
        id: MessageId(doc.id.clone()),
        sender_id: UserId::from(sender),
        text: text.to_string(),
        timestamp: doc.get_timestamp(FIELD_TIMESTAMP).unwrap_or(now),
        status: MessageStatus::parse_or_default(doc.get_str(FIELD_STATUS)),
    })
}

/// Calendar day of `ts` as seen from `offset`.
pub fn day_of(ts: DateTime<Utc>, offset: &FixedOffset) -> NaiveDate {
    ts.with_timezone(offset).date_naive()
}

/// Medium-form label for a day, e.g. `Oct 17, 2026`.
pub fn section_label(day: NaiveDate) -> String {
    day.format(SECTION_LABEL_FORMAT).to_string()
}

/// `Today` / `Yesterday` for recent days, the medium date otherwise.
pub fn relative_label(day: NaiveDate, today: NaiveDate) -> String {
    if day == today {
        "Today".to_string()
    } else if today.checked_sub_days(Days::new(1)) == Some(day) {
        "Yesterday".to_string()
    } else {
        section_label(day)
    }
}

/// Group messages by calendar day.
///
/// Messages inside a section are sorted by timestamp, ties broken by message
/// id; sections are sorted by their first message.  Every section holds at
/// least one message.
pub fn group_into_sections(messages: Vec<Message>, offset: &FixedOffset) -> Vec<MessageSection> {
    let mut by_day: BTreeMap<NaiveDate, Vec<Message>> = BTreeMap::new();
    for message in messages {
        by_day
            .entry(day_of(message.timestamp, offset))
            .or_default()
            .push(message);
    }

    let mut sections: Vec<MessageSection> = by_day
        .into_iter()
        .map(|(day, mut messages)| {
            messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
            MessageSection {
                day,
                title: section_label(day),
                messages,
            }
        })
        .collect();

    sections.sort_by_key(|s| s.first_timestamp());
    sections
}

/// Full pipeline: normalize every record, drop the invalid ones, group.
pub fn project(documents: &[Document], now: DateTime<Utc>, offset: &FixedOffset) -> Vec<MessageSection> {
    let messages = documents
        .iter()
        .filter_map(|doc| {
            let message = normalize_record(doc, now);
            if message.is_none() {
                tracing::debug!(id = %doc.id, "skipping malformed message record");
            }
            message
        })
        .collect();
    group_into_sections(messages, offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use parley_shared::{fields, FieldValue};

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn record(id: &str, sender: &str, body: &str, ts: DateTime<Utc>) -> Document {
        Document::new(
            id,
            fields! {
                "senderID" => sender,
                "message" => body,
                "timestamp" => ts,
                "status" => "delivered",
            },
        )
    }

    fn message(id: &str, ts: DateTime<Utc>) -> Message {
        Message {
            id: MessageId(id.to_string()),
            sender_id: "u1".into(),
            text: id.to_string(),
            timestamp: ts,
            status: MessageStatus::Sent,
        }
    }

    #[test]
    fn test_normalize_defaults() {
        let now = at(2025, 6, 11, 9, 0);
        let doc = Document::new(
            "m1",
            fields! {
                "senderID" => "u1",
                "message" => "hi",
                "timestamp" => FieldValue::ServerTimestamp,
                "status" => "bogus",
            },
        );
        let msg = normalize_record(&doc, now).unwrap();
        assert_eq!(msg.timestamp, now);
        assert_eq!(msg.status, MessageStatus::Sent);

        let full = normalize_record(&record("m2", "u2", "yo", at(2025, 6, 10, 8, 0)), now).unwrap();
        assert_eq!(full.timestamp, at(2025, 6, 10, 8, 0));
        assert_eq!(full.status, MessageStatus::Delivered);
        assert_eq!(full.sender_id, UserId::from("u2"));
    }

    #[test]
    fn test_normalize_drops_missing_sender_or_body() {
        let now = at(2025, 6, 11, 9, 0);
        let no_sender = Document::new("a", fields! { "message" => "hi" });
        let no_body = Document::new("b", fields! { "senderID" => "u1" });
        let wrong_type = Document::new(
            "c",
            fields! { "senderID" => FieldValue::Integer(7), "message" => "hi" },
        );
        assert!(normalize_record(&no_sender, now).is_none());
        assert!(normalize_record(&no_body, now).is_none());
        assert!(normalize_record(&wrong_type, now).is_none());
    }

    #[test]
    fn test_two_days_two_sections() {
        let t0 = at(2025, 6, 10, 15, 30);
        let docs = vec![
            record("b", "u2", "yo", t0 + Duration::days(1)),
            record("a", "u1", "hi", t0),
        ];
        let sections = project(&docs, t0, &utc());

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].messages.len(), 1);
        assert_eq!(sections[1].messages.len(), 1);
        assert_eq!(sections[0].messages[0].text, "hi");
        assert_eq!(sections[1].messages[0].text, "yo");
        assert_eq!(sections[0].title, "Jun 10, 2025");
        assert_eq!(sections[0].day_key(), "2025-06-10");
    }

    #[test]
    fn test_concatenation_matches_global_sort_and_is_idempotent() {
        let base = at(2024, 12, 31, 22, 0);
        let messages: Vec<Message> = [
            ("m5", 300),
            ("m1", 0),
            ("m3", 90),
            ("m2", 90),
            ("m4", 125),
            ("m0", -1500),
        ]
        .iter()
        .map(|(id, mins)| message(id, base + Duration::minutes(*mins)))
        .collect();

        let mut expected = messages.clone();
        expected.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));

        let sections = group_into_sections(messages.clone(), &utc());
        let flat: Vec<Message> = sections.iter().flat_map(|s| s.messages.clone()).collect();
        assert_eq!(flat, expected);
        assert!(sections.iter().all(|s| !s.messages.is_empty()));
        assert_eq!(sections.len(), 3);

        assert_eq!(group_into_sections(flat, &utc()), sections);
    }

    #[test]
    fn test_ties_broken_by_id() {
        let t = at(2025, 1, 1, 12, 0);
        let sections = group_into_sections(vec![message("b", t), message("a", t)], &utc());
        let ids: Vec<_> = sections[0].messages.iter().map(|m| m.id.0.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn test_day_boundary_follows_offset() {
        // 23:30 UTC on Jan 1 is already Jan 2 in UTC+1.
        let t = at(2025, 1, 1, 23, 30);
        let plus_one = FixedOffset::east_opt(3600).unwrap();
        assert_eq!(day_of(t, &utc()), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(day_of(t, &plus_one), NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
    }

    #[test]
    fn test_empty_feed_projects_empty() {
        assert!(project(&[], at(2025, 1, 1, 0, 0), &utc()).is_empty());
    }

    #[test]
    fn test_relative_label() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        assert_eq!(relative_label(today, today), "Today");
        assert_eq!(relative_label(today.pred_opt().unwrap(), today), "Yesterday");
        assert_eq!(
            relative_label(NaiveDate::from_ymd_opt(2026, 3, 5).unwrap(), today),
            "Mar 5, 2026"
        );
    }
}

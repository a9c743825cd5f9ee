//! Domain model structs shared by the store and the client.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the UI layer.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::document::{Document, FieldValue};
use crate::error::SharedError;
use crate::types::{ConversationId, MessageId, MessageStatus, UserId};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A directory entry.  Immutable snapshot of the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub avatar_url: Option<String>,
}

impl User {
    /// Parse a `users` document.  Returns `None` for incomplete records
    /// (missing name or email), which callers skip.
    pub fn from_document(doc: &Document) -> Option<Self> {
        let name = doc.get_str(FIELD_USER_NAME)?;
        let email = doc.get_str(FIELD_USER_EMAIL)?;
        Some(Self {
            id: UserId(doc.id.clone()),
            name: name.to_string(),
            email: email.to_string(),
            avatar_url: doc.get_str(FIELD_USER_AVATAR).map(str::to_string),
        })
    }

    /// Case-insensitive substring match over name and email.
    /// `query` must already be lower-cased.
    pub fn matches(&self, query: &str) -> bool {
        self.name.to_lowercase().contains(query) || self.email.to_lowercase().contains(query)
    }
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// A two-party conversation record from the `chats` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    pub id: ConversationId,
    /// Participant ids in the order they were recorded at creation.
    pub participants: [UserId; 2],
    pub last_message: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Conversation {
    pub fn from_document(doc: &Document) -> Result<Self, SharedError> {
        let bad_participants = || SharedError::FieldType {
            field: FIELD_PARTICIPANTS.to_string(),
            expected: "array of two strings",
        };

        let ids: Vec<&str> = doc
            .get_array(FIELD_PARTICIPANTS)
            .ok_or_else(bad_participants)?
            .iter()
            .map(FieldValue::as_str)
            .collect::<Option<_>>()
            .ok_or_else(bad_participants)?;

        let [a, b] = ids.as_slice() else {
            return Err(bad_participants());
        };

        Ok(Self {
            id: ConversationId(doc.id.clone()),
            participants: [UserId::from(*a), UserId::from(*b)],
            last_message: doc.get_str(FIELD_LAST_MESSAGE).map(str::to_string),
            last_updated: doc.get_timestamp(FIELD_LAST_UPDATED),
            created_at: doc.get_timestamp(FIELD_CREATED_AT),
        })
    }

    pub fn includes(&self, user: &UserId) -> bool {
        self.participants.contains(user)
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message, normalized from a feed record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub status: MessageStatus,
}

// ---------------------------------------------------------------------------
// MessageSection
// ---------------------------------------------------------------------------

/// Messages of one calendar day, ascending by timestamp.  Never empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageSection {
    pub day: NaiveDate,
    pub title: String,
    pub messages: Vec<Message>,
}

impl MessageSection {
    /// Stable grouping key, e.g. `2026-10-17`.
    pub fn day_key(&self) -> String {
        self.day.format(DAY_KEY_FORMAT).to_string()
    }

    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.messages.first().map(|m| m.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields;

    #[test]
    fn test_user_requires_name_and_email() {
        let ok = Document::new("u1", fields! { "name" => "Ann", "email" => "ann@x.io" });
        let no_email = Document::new("u2", fields! { "name" => "Bob" });
        let bad_type = Document::new(
            "u3",
            fields! { "name" => FieldValue::Integer(1), "email" => "c@x.io" },
        );

        let user = User::from_document(&ok).unwrap();
        assert_eq!(user.id, UserId::from("u1"));
        assert!(user.avatar_url.is_none());
        assert!(User::from_document(&no_email).is_none());
        assert!(User::from_document(&bad_type).is_none());
    }

    #[test]
    fn test_user_matches_case_insensitive() {
        let user = User {
            id: "u1".into(),
            name: "Ankit Madan".into(),
            email: "Ankit@Example.com".into(),
            avatar_url: None,
        };
        assert!(user.matches("madan"));
        assert!(user.matches("example"));
        assert!(!user.matches("zoe"));
    }

    #[test]
    fn test_conversation_from_document() {
        let doc = Document::new(
            "u1_u2",
            fields! {
                "participants" => vec!["u2", "u1"],
                "lastMessage" => "hey",
            },
        );
        let conv = Conversation::from_document(&doc).unwrap();
        assert_eq!(conv.participants, [UserId::from("u2"), UserId::from("u1")]);
        assert!(conv.includes(&"u1".into()));
        assert_eq!(conv.last_message.as_deref(), Some("hey"));
        assert!(conv.created_at.is_none());

        let broken = Document::new("x", fields! { "participants" => vec!["only"] });
        assert!(Conversation::from_document(&broken).is_err());
    }
}

//! Conversation identity: canonical ids and lazy creation of chat records.

use tracing::{debug, info, warn};

use parley_shared::constants::{CHATS_COLLECTION, FIELD_CREATED_AT, FIELD_PARTICIPANTS};
use parley_shared::{fields, Conversation, ConversationId, FieldValue, UserId};
use parley_store::DocumentStore;

use crate::error::Result;

pub use parley_shared::derive_conversation_id;

/// Make sure a well-formed chat record exists for `conversation_id`.
///
/// The existence check and the write are not atomic.  Two callers racing on
/// the same id may both see it missing and both write; because the write is an
/// overwrite keyed by the id, the outcome is still one record holding both
/// participants.  A well-formed record is never touched.  A record without
/// valid participants (e.g. one holding only preview fields) gets them merged
/// in, keeping its other fields.
pub async fn ensure_conversation(
    store: &dyn DocumentStore,
    conversation_id: &ConversationId,
    participant_a: &UserId,
    participant_b: &UserId,
) -> Result<()> {
    let existing = store
        .get_document(CHATS_COLLECTION, conversation_id.as_str())
        .await?;

    let participants = fields! {
        FIELD_PARTICIPANTS => vec![participant_a.as_str(), participant_b.as_str()],
        FIELD_CREATED_AT => FieldValue::ServerTimestamp,
    };

    match existing {
        Some(doc) => match Conversation::from_document(&doc) {
            Ok(_) => {
                debug!(conversation = %conversation_id, "conversation already exists");
            }
            Err(e) => {
                warn!(conversation = %conversation_id, error = %e, "repairing conversation record");
                store
                    .update_document(CHATS_COLLECTION, conversation_id.as_str(), participants)
                    .await?;
            }
        },
        None => {
            store
                .set_document(CHATS_COLLECTION, conversation_id.as_str(), participants)
                .await?;
            info!(conversation = %conversation_id, "conversation created");
        }
    }

    Ok(())
}

/// Load and parse a chat record.  A malformed record reads as absent.
pub async fn load_conversation(
    store: &dyn DocumentStore,
    conversation_id: &ConversationId,
) -> Result<Option<Conversation>> {
    let Some(doc) = store
        .get_document(CHATS_COLLECTION, conversation_id.as_str())
        .await?
    else {
        return Ok(None);
    };

    match Conversation::from_document(&doc) {
        Ok(conversation) => Ok(Some(conversation)),
        Err(e) => {
            debug!(conversation = %conversation_id, error = %e, "skipping malformed conversation record");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parley_shared::constants::{FIELD_LAST_MESSAGE, FIELD_LAST_UPDATED};
    use parley_shared::{Document, FieldMap};
    use parley_store::{QuerySubscription, SqliteDocumentStore};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Barrier;

    #[tokio::test]
    async fn test_ensure_creates_once() {
        let store = SqliteDocumentStore::in_memory().unwrap();
        let (a, b) = (UserId::from("u1"), UserId::from("u2"));
        let id = derive_conversation_id(&a, &b);

        ensure_conversation(&store, &id, &a, &b).await.unwrap();
        let created = load_conversation(&store, &id).await.unwrap().unwrap();
        assert_eq!(created.participants, [a.clone(), b.clone()]);
        assert!(created.created_at.is_some());

        // The second call sees the record and leaves it alone.
        ensure_conversation(&store, &id, &b, &a).await.unwrap();
        let again = load_conversation(&store, &id).await.unwrap().unwrap();
        assert_eq!(again, created);
    }

    /// Holds every `get_document` caller at a barrier after its read, so
    /// two concurrent ensures both see the same (absent) record.
    struct RacingStore {
        inner: SqliteDocumentStore,
        barrier: Barrier,
        saw_absent: AtomicUsize,
    }

    impl RacingStore {
        fn new() -> Self {
            Self {
                inner: SqliteDocumentStore::in_memory().unwrap(),
                barrier: Barrier::new(2),
                saw_absent: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DocumentStore for RacingStore {
        async fn get_all_documents(&self, c: &str) -> parley_store::Result<Vec<Document>> {
            self.inner.get_all_documents(c).await
        }
        async fn get_document(&self, c: &str, id: &str) -> parley_store::Result<Option<Document>> {
            let doc = self.inner.get_document(c, id).await?;
            if doc.is_none() {
                self.saw_absent.fetch_add(1, Ordering::SeqCst);
            }
            self.barrier.wait().await;
            Ok(doc)
        }
        async fn add_document(&self, c: &str, f: FieldMap) -> parley_store::Result<String> {
            self.inner.add_document(c, f).await
        }
        async fn set_document(&self, c: &str, id: &str, f: FieldMap) -> parley_store::Result<()> {
            self.inner.set_document(c, id, f).await
        }
        async fn update_document(&self, c: &str, id: &str, f: FieldMap) -> parley_store::Result<()> {
            self.inner.update_document(c, id, f).await
        }
        async fn subscribe(&self, c: &str, o: &str) -> parley_store::Result<QuerySubscription> {
            self.inner.subscribe(c, o).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_ensure_yields_single_record() {
        let store = RacingStore::new();
        let (a, b) = (UserId::from("zoe"), UserId::from("adam"));
        let from_a = derive_conversation_id(&a, &b);
        let from_b = derive_conversation_id(&b, &a);
        assert_eq!(from_a, from_b);

        let (r1, r2) = tokio::join!(
            ensure_conversation(&store, &from_a, &a, &b),
            ensure_conversation(&store, &from_b, &b, &a),
        );
        r1.unwrap();
        r2.unwrap();

        // Both callers took the create path.
        assert_eq!(store.saw_absent.load(Ordering::SeqCst), 2);

        let chats = store.inner.get_all_documents(CHATS_COLLECTION).await.unwrap();
        assert_eq!(chats.len(), 1);

        let conversation = load_conversation(&store.inner, &from_a).await.unwrap().unwrap();
        assert!(conversation.includes(&a));
        assert!(conversation.includes(&b));
    }

    #[tokio::test]
    async fn test_ensure_repairs_record_without_participants() {
        let store = SqliteDocumentStore::in_memory().unwrap();
        let (a, b) = (UserId::from("u1"), UserId::from("u2"));
        let id = derive_conversation_id(&a, &b);

        store
            .set_document(
                CHATS_COLLECTION,
                id.as_str(),
                fields! { FIELD_LAST_MESSAGE => "early", FIELD_LAST_UPDATED => FieldValue::ServerTimestamp },
            )
            .await
            .unwrap();
        assert!(load_conversation(&store, &id).await.unwrap().is_none());

        ensure_conversation(&store, &id, &a, &b).await.unwrap();

        let repaired = load_conversation(&store, &id).await.unwrap().unwrap();
        assert_eq!(repaired.participants, [a, b]);
        assert_eq!(repaired.last_message.as_deref(), Some("early"));
        assert!(repaired.created_at.is_some());
        assert_eq!(store.get_all_documents(CHATS_COLLECTION).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_load_missing_or_malformed() {
        let store = SqliteDocumentStore::in_memory().unwrap();
        let id = derive_conversation_id(&"a".into(), &"b".into());
        assert!(load_conversation(&store, &id).await.unwrap().is_none());

        store
            .set_document(CHATS_COLLECTION, id.as_str(), fields! { "participants" => "nope" })
            .await
            .unwrap();
        assert!(load_conversation(&store, &id).await.unwrap().is_none());
    }
}

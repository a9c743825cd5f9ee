use tracing::{debug, info, warn};

use parley_shared::constants::{
    CHATS_COLLECTION, FIELD_BODY, FIELD_LAST_MESSAGE, FIELD_LAST_UPDATED, FIELD_SENDER_ID,
    FIELD_STATUS, FIELD_TIMESTAMP,
};
use parley_shared::{fields, ConversationId, FieldValue, MessageId, MessageStatus, UserId};
use parley_store::DocumentStore;

use crate::error::{ClientError, Result};

/// Append a message to a conversation's feed.
///
/// Blank text (after trimming) is rejected before the store is touched.  The
/// message is not added to any projected sections here: it appears once the
/// feed subscription delivers the snapshot containing it.
///
/// After the append, the chat record's preview fields are refreshed on a
/// best-effort basis; a failure there is logged and does not fail the send.
/// A missing chat record is left missing.
pub async fn send_message(
    store: &dyn DocumentStore,
    conversation_id: &ConversationId,
    sender: &UserId,
    text: &str,
) -> Result<MessageId> {
    if text.trim().is_empty() {
        return Err(ClientError::Validation("message text is empty".into()));
    }

    let id = store
        .add_document(
            &conversation_id.messages_path(),
            fields! {
                FIELD_SENDER_ID => sender.as_str(),
                FIELD_BODY => text,
                FIELD_TIMESTAMP => FieldValue::ServerTimestamp,
                FIELD_STATUS => MessageStatus::Sent.as_str(),
            },
        )
        .await?;

    info!(msg_id = %id, conversation = %conversation_id, "Message sent");

    match update_preview(store, conversation_id, text).await {
        Ok(true) => {}
        Ok(false) => {
            debug!(conversation = %conversation_id, "no conversation record, preview not updated");
        }
        Err(e) => {
            warn!(conversation = %conversation_id, error = %e, "Failed to update conversation preview");
        }
    }

    Ok(MessageId(id))
}

/// Merge the preview fields into an existing chat record.  Returns `false`
/// without writing when the record is missing, so a send can never create a
/// chat record that lacks its participants.
async fn update_preview(
    store: &dyn DocumentStore,
    conversation_id: &ConversationId,
    text: &str,
) -> parley_store::Result<bool> {
    if store
        .get_document(CHATS_COLLECTION, conversation_id.as_str())
        .await?
        .is_none()
    {
        return Ok(false);
    }

    store
        .update_document(
            CHATS_COLLECTION,
            conversation_id.as_str(),
            fields! {
                FIELD_LAST_MESSAGE => text,
                FIELD_LAST_UPDATED => FieldValue::ServerTimestamp,
            },
        )
        .await?;
    Ok(true)
}

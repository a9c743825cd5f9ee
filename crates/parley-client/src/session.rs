//! One open conversation: its projector plus the send path.

use std::sync::Arc;

use chrono::FixedOffset;

use parley_shared::{ConversationId, MessageId, MessageSection, User, UserId};
use parley_store::DocumentStore;

use crate::error::{ClientError, Result};
use crate::messaging;
use crate::projector::{MessageProjector, ProjectorState};

/// A chat between the signed-in user and `other_user`.
///
/// The conversation id is always supplied by the caller; sessions never fall
/// back to a shared default.  Closing (or dropping) the session releases the
/// feed subscription.
pub struct ChatSession {
    store: Arc<dyn DocumentStore>,
    current_user: UserId,
    other_user: User,
    projector: MessageProjector,
}

impl ChatSession {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        conversation_id: ConversationId,
        current_user: UserId,
        other_user: User,
        offset: FixedOffset,
    ) -> Self {
        let projector = MessageProjector::new(store.clone(), conversation_id, offset);
        Self {
            store,
            current_user,
            other_user,
            projector,
        }
    }

    pub fn conversation_id(&self) -> &ConversationId {
        self.projector.conversation_id()
    }

    pub fn current_user(&self) -> &UserId {
        &self.current_user
    }

    pub fn other_user(&self) -> &User {
        &self.other_user
    }

    /// Start delivering day sections to `listener`.  See
    /// [`MessageProjector::observe`].
    pub async fn observe_sections(
        &mut self,
        listener: impl FnMut(&[MessageSection]) + Send + 'static,
    ) -> Result<bool> {
        self.projector.observe(listener).await
    }

    pub fn on_error(&self, listener: impl FnMut(&ClientError) + Send + 'static) {
        self.projector.on_error(listener);
    }

    /// Send `text` as the current user.
    pub async fn send_message(&self, text: &str) -> Result<MessageId> {
        messaging::send_message(
            self.store.as_ref(),
            self.conversation_id(),
            &self.current_user,
            text,
        )
        .await
    }

    /// Latest sections delivered by the feed.
    pub fn sections(&self) -> Vec<MessageSection> {
        self.projector.sections()
    }

    pub fn state(&self) -> ProjectorState {
        self.projector.state()
    }

    /// End the session.  No section callbacks fire after this returns.
    pub fn close(&mut self) {
        self.projector.dispose();
    }
}

//! Live projection of a conversation's message feed.
//!
//! A [`MessageProjector`] moves through three states:
//!
//! ```text
//! Unsubscribed --observe--> Subscribed --dispose--> Disposed
//! ```
//!
//! While subscribed, a single background task pulls whole snapshots from the
//! store subscription and runs each through [`sections::project`], replacing
//! the previous sections and handing the new ones to the listener.  Snapshots
//! are applied one at a time, never concurrently.
//!
//! Disposal takes the listener out from under the same lock that guards
//! delivery, so once [`MessageProjector::dispose`] returns no callback can
//! run, including one for a snapshot that was already in flight.
//!
//! [`sections::project`]: crate::sections::project

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{FixedOffset, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use parley_shared::constants::FIELD_TIMESTAMP;
use parley_shared::{ConversationId, Document, MessageSection};
use parley_store::DocumentStore;

use crate::error::{ClientError, Result};
use crate::sections;

pub type SectionsListener = Box<dyn FnMut(&[MessageSection]) + Send>;
pub type ErrorListener = Box<dyn FnMut(&ClientError) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectorState {
    Unsubscribed,
    Subscribed,
    Disposed,
}

/// State reachable from both the projector handle and its feed task.
struct Shared {
    conversation_id: ConversationId,
    offset: FixedOffset,
    state: Mutex<ProjectorState>,
    sections: Mutex<Vec<MessageSection>>,
    /// Delivery lock: held for the whole listener call.
    listener: Mutex<Option<SectionsListener>>,
    error_listener: Mutex<Option<ErrorListener>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking listener must not wedge the projector.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn state(&self) -> ProjectorState {
        *lock(&self.state)
    }

    fn apply(&self, documents: &[Document]) -> bool {
        if self.state() != ProjectorState::Subscribed {
            return false;
        }

        let projected = sections::project(documents, Utc::now(), &self.offset);

        let mut delivery = lock(&self.listener);
        let Some(listener) = delivery.as_mut() else {
            return false;
        };

        *lock(&self.sections) = projected.clone();
        debug!(
            conversation = %self.conversation_id,
            records = documents.len(),
            sections = projected.len(),
            "publishing sections"
        );
        listener(projected.as_slice());
        true
    }

    fn report(&self, error: ClientError) {
        warn!(conversation = %self.conversation_id, error = %error, "message feed error");
        if self.state() != ProjectorState::Subscribed {
            return;
        }
        if let Some(listener) = lock(&self.error_listener).as_mut() {
            listener(&error);
        }
    }
}

pub struct MessageProjector {
    store: Arc<dyn DocumentStore>,
    shared: Arc<Shared>,
    task: Option<JoinHandle<()>>,
}

impl MessageProjector {
    /// Create an idle projector for one conversation.  `offset` decides
    /// which calendar day each message falls on.
    pub fn new(store: Arc<dyn DocumentStore>, conversation_id: ConversationId, offset: FixedOffset) -> Self {
        Self {
            store,
            shared: Arc::new(Shared {
                conversation_id,
                offset,
                state: Mutex::new(ProjectorState::Unsubscribed),
                sections: Mutex::new(Vec::new()),
                listener: Mutex::new(None),
                error_listener: Mutex::new(None),
            }),
            task: None,
        }
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.shared.conversation_id
    }

    pub fn state(&self) -> ProjectorState {
        self.shared.state()
    }

    /// Latest published sections (empty before the first snapshot).
    pub fn sections(&self) -> Vec<MessageSection> {
        lock(&self.shared.sections).clone()
    }

    /// Register a listener for feed errors.  Errors do not end the
    /// subscription.
    pub fn on_error(&self, listener: impl FnMut(&ClientError) + Send + 'static) {
        *lock(&self.shared.error_listener) = Some(Box::new(listener));
    }

    /// Start observing the message feed.
    ///
    /// Returns `Ok(false)` without doing anything if the projector is already
    /// subscribed or has been disposed.  Must be called from within a tokio
    /// runtime.
    pub async fn observe(
        &mut self,
        listener: impl FnMut(&[MessageSection]) + Send + 'static,
    ) -> Result<bool> {
        match self.state() {
            ProjectorState::Unsubscribed => {}
            state => {
                debug!(conversation = %self.shared.conversation_id, ?state, "observe ignored");
                return Ok(false);
            }
        }

        let path = self.shared.conversation_id.messages_path();
        let mut subscription = self.store.subscribe(&path, FIELD_TIMESTAMP).await?;

        *lock(&self.shared.listener) = Some(Box::new(listener));
        *lock(&self.shared.state) = ProjectorState::Subscribed;

        let shared = self.shared.clone();
        self.task = Some(tokio::spawn(async move {
            while let Some(snapshot) = subscription.next().await {
                match snapshot {
                    Ok(documents) => {
                        shared.apply(&documents);
                    }
                    Err(e) => shared.report(e.into()),
                }
            }
            debug!(conversation = %shared.conversation_id, "feed task finished");
        }));

        info!(conversation = %self.shared.conversation_id, "observing messages");
        Ok(true)
    }

    /// Run one snapshot through the pipeline as if the feed had delivered
    /// it.  Returns whether a listener was invoked.
    pub fn apply_snapshot(&self, documents: &[Document]) -> bool {
        self.shared.apply(documents)
    }

    /// Stop observing for good.  Idempotent.
    pub fn dispose(&mut self) {
        let previous = std::mem::replace(&mut *lock(&self.shared.state), ProjectorState::Disposed);
        if previous == ProjectorState::Disposed {
            return;
        }

        // Waits for an in-flight delivery to finish.
        lock(&self.shared.listener).take();
        lock(&self.shared.error_listener).take();

        // Dropping the aborted task drops its store subscription.
        if let Some(task) = self.task.take() {
            task.abort();
        }

        if previous == ProjectorState::Subscribed {
            info!(conversation = %self.shared.conversation_id, "projector disposed");
        }
    }
}

impl Drop for MessageProjector {
    fn drop(&mut self) {
        self.dispose();
    }
}

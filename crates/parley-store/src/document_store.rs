//! The document-store abstraction the client core is written against.
//!
//! Collections are addressed by path (`users`, `chats/<id>/messages`), and
//! documents are schemaless [`FieldMap`]s.  Queries are delivered as whole
//! snapshots rather than deltas.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use parley_shared::document::{Document, FieldMap};

use crate::error::Result;

/// A full query result, in query order.
pub type Snapshot = Vec<Document>;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents of a collection, in insertion order.
    async fn get_all_documents(&self, collection: &str) -> Result<Vec<Document>>;

    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Append a document under a store-generated id.
    async fn add_document(&self, collection: &str, fields: FieldMap) -> Result<String>;

    /// Upsert: create the document or overwrite it entirely.
    async fn set_document(&self, collection: &str, id: &str, fields: FieldMap) -> Result<()>;

    /// Merge the given fields into the document, creating it if absent.
    async fn update_document(&self, collection: &str, id: &str, fields: FieldMap) -> Result<()>;

    /// Subscribe to a collection ordered by `order_by`.  The current snapshot
    /// is delivered first, then one snapshot per change.
    async fn subscribe(&self, collection: &str, order_by: &str) -> Result<QuerySubscription>;
}

/// Sort a snapshot by a field: documents missing the field come first, ties
/// keep their incoming (insertion) order.
pub fn order_snapshot(documents: &mut Snapshot, order_by: &str) {
    documents.sort_by(|a, b| match (a.get(order_by), b.get(order_by)) {
        (Some(x), Some(y)) => x.query_cmp(y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Handle to a live query.
///
/// Snapshots are produced by a background task and buffered in a channel.
/// [`QuerySubscription::cancel`] stops the producer and closes the feed;
/// dropping the handle cancels it as well.
pub struct QuerySubscription {
    receiver: mpsc::Receiver<Result<Snapshot>>,
    cancelled: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl QuerySubscription {
    /// Wrap a producer task.  The task should stop sending once `cancelled`
    /// is set; it is aborted on cancel regardless.
    pub fn new(
        receiver: mpsc::Receiver<Result<Snapshot>>,
        cancelled: Arc<AtomicBool>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            receiver,
            cancelled,
            task: Some(task),
        }
    }

    /// Next snapshot, or `None` once the subscription is cancelled or the
    /// producer has stopped.
    pub async fn next(&mut self) -> Option<Result<Snapshot>> {
        if self.is_cancelled() {
            return None;
        }
        let item = self.receiver.recv().await?;
        if self.is_cancelled() {
            return None;
        }
        Some(item)
    }

    pub fn cancel(&mut self) {
        self.cancelled.store(true, AtomicOrdering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.receiver.close();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(AtomicOrdering::SeqCst)
    }
}

impl Drop for QuerySubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

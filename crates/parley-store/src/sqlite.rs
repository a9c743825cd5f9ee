//! [`DocumentStore`] backed by the local SQLite [`Database`].
//!
//! Writes go through a shared `Arc<Mutex<Database>>`.  After each committed
//! write the collection path is published on a broadcast channel; every live
//! subscription re-reads its collection when its path comes by and pushes the
//! fresh snapshot to its subscriber.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use parley_shared::document::{Document, FieldMap};

use crate::database::Database;
use crate::document_store::{order_snapshot, DocumentStore, QuerySubscription, Snapshot};
use crate::error::{Result, StoreError};

/// Capacity of the change-notification channel.  A subscriber that falls
/// further behind simply re-reads its collection.
const CHANGE_BUFFER: usize = 256;

/// Snapshots buffered per subscription before the producer waits.
const SUBSCRIPTION_BUFFER: usize = 16;

#[derive(Clone)]
pub struct SqliteDocumentStore {
    db: Arc<Mutex<Database>>,
    changes: broadcast::Sender<String>,
}

impl SqliteDocumentStore {
    pub fn new(db: Database) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            db: Arc::new(Mutex::new(db)),
            changes,
        }
    }

    /// Open the database in the platform data directory.
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(Database::new()?))
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        Ok(Self::new(Database::open_at(path)?))
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    fn with_db<T>(&self, f: impl FnOnce(&Database) -> Result<T>) -> Result<T> {
        let guard = self.db.lock().map_err(|_| StoreError::Poisoned)?;
        f(&guard)
    }

    fn notify(&self, collection: &str) {
        // No receivers just means nobody is subscribed right now.
        let _ = self.changes.send(collection.to_string());
    }

    fn snapshot(&self, collection: &str, order_by: &str) -> Result<Snapshot> {
        let mut documents = self.with_db(|db| db.list_documents(collection))?;
        order_snapshot(&mut documents, order_by);
        Ok(documents)
    }

    /// Read and forward one snapshot.  Returns `false` once the subscriber is
    /// gone or cancelled.
    async fn push_snapshot(
        &self,
        tx: &mpsc::Sender<Result<Snapshot>>,
        cancelled: &AtomicBool,
        collection: &str,
        order_by: &str,
    ) -> bool {
        if cancelled.load(Ordering::SeqCst) {
            return false;
        }
        let snapshot = self.snapshot(collection, order_by);
        if let Err(ref e) = snapshot {
            warn!(collection, error = %e, "failed to read snapshot");
        }
        tx.send(snapshot).await.is_ok()
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get_all_documents(&self, collection: &str) -> Result<Vec<Document>> {
        self.with_db(|db| db.list_documents(collection))
    }

    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.with_db(|db| db.get_document(collection, id))
    }

    async fn add_document(&self, collection: &str, fields: FieldMap) -> Result<String> {
        let id = self.with_db(|db| db.add_document(collection, fields))?;
        debug!(collection, id = %id, "document added");
        self.notify(collection);
        Ok(id)
    }

    async fn set_document(&self, collection: &str, id: &str, fields: FieldMap) -> Result<()> {
        self.with_db(|db| db.set_document(collection, id, fields))?;
        debug!(collection, id, "document set");
        self.notify(collection);
        Ok(())
    }

    async fn update_document(&self, collection: &str, id: &str, fields: FieldMap) -> Result<()> {
        self.with_db(|db| db.merge_document(collection, id, fields))?;
        debug!(collection, id, "document merged");
        self.notify(collection);
        Ok(())
    }

    async fn subscribe(&self, collection: &str, order_by: &str) -> Result<QuerySubscription> {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let cancelled = Arc::new(AtomicBool::new(false));

        // Subscribe to changes before the first read so no write can slip
        // between the initial snapshot and the change stream.
        let mut changes = self.changes.subscribe();

        let store = self.clone();
        let flag = cancelled.clone();
        let path = collection.to_string();
        let order_by = order_by.to_string();

        let task = tokio::spawn(async move {
            if !store.push_snapshot(&tx, &flag, &path, &order_by).await {
                return;
            }

            loop {
                match changes.recv().await {
                    Ok(changed) if changed == path => {}
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(collection = %path, skipped, "change feed lagged, re-reading");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }

                if !store.push_snapshot(&tx, &flag, &path, &order_by).await {
                    break;
                }
            }

            debug!(collection = %path, "subscription ended");
        });

        debug!(collection = %collection, "subscription opened");
        Ok(QuerySubscription::new(rx, cancelled, task))
    }
}

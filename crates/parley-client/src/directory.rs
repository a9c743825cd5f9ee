//! The contact directory: every other registered user.

use std::sync::Arc;

use tracing::{debug, info, warn};

use parley_shared::constants::USERS_COLLECTION;
use parley_shared::{User, UserId};
use parley_store::DocumentStore;

use crate::error::Result;

/// Last fetched user list plus a local search filter over it.
///
/// A failed refresh keeps the previous list, so the UI can keep showing
/// stale contacts next to the error.
pub struct Directory {
    store: Arc<dyn DocumentStore>,
    users: Vec<User>,
    filtered: Vec<User>,
    query: String,
}

impl Directory {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            users: Vec::new(),
            filtered: Vec::new(),
            query: String::new(),
        }
    }

    /// Fetch all users except `excluding`.  Incomplete records (no name or
    /// email) are skipped.  The current filter is re-applied to the result.
    pub async fn refresh(&mut self, excluding: &UserId) -> Result<&[User]> {
        let documents = match self.store.get_all_documents(USERS_COLLECTION).await {
            Ok(docs) => docs,
            Err(e) => {
                warn!(error = %e, kept = self.users.len(), "Failed to fetch users");
                return Err(e.into());
            }
        };

        let total = documents.len();
        self.users = documents
            .iter()
            .filter(|doc| doc.id != excluding.as_str())
            .filter_map(|doc| {
                let user = User::from_document(doc);
                if user.is_none() {
                    debug!(id = %doc.id, "skipping incomplete user record");
                }
                user
            })
            .collect();

        self.apply_filter();
        info!(total, contacts = self.users.len(), "Directory refreshed");
        Ok(&self.filtered)
    }

    /// Narrow the list to users whose name or email contains `query`
    /// (case-insensitive).  The query is matched as typed, whitespace included;
    /// only an empty query shows everyone.  No fetch.
    pub fn filter(&mut self, query: &str) -> &[User] {
        self.query = query.to_lowercase();
        self.apply_filter();
        &self.filtered
    }

    fn apply_filter(&mut self) {
        self.filtered = if self.query.is_empty() {
            self.users.clone()
        } else {
            self.users
                .iter()
                .filter(|u| u.matches(&self.query))
                .cloned()
                .collect()
        };
    }

    /// Every contact from the last successful refresh.
    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// Contacts matching the current filter.
    pub fn filtered(&self) -> &[User] {
        &self.filtered
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

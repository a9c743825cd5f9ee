//! Client facade shared by every screen of the host application.
//!
//! [`ParleyClient`] owns the document store, the identity provider and the
//! configuration, and hands out directories and chat sessions bound to the
//! signed-in user.

use std::sync::Arc;

use tracing::info;

use parley_shared::{derive_conversation_id, ConversationId, User, UserId};
use parley_store::{DocumentStore, SqliteDocumentStore};

use crate::config::ClientConfig;
use crate::conversation::ensure_conversation;
use crate::directory::Directory;
use crate::error::{ClientError, Result};
use crate::identity::{self, IdentityProvider};
use crate::session::ChatSession;

/// Central client state.
pub struct ParleyClient {
    /// Backing document store (shared with every session and directory).
    store: Arc<dyn DocumentStore>,

    /// Who is signed in.
    identity: Arc<dyn IdentityProvider>,

    config: ClientConfig,
}

impl ParleyClient {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        config: ClientConfig,
    ) -> Self {
        Self {
            store,
            identity,
            config,
        }
    }

    /// Open the SQLite store named by the configuration (or the platform
    /// default location).
    pub fn open(identity: Arc<dyn IdentityProvider>, config: ClientConfig) -> Result<Self> {
        let store = match config.db_path {
            Some(ref path) => SqliteDocumentStore::open_at(path)?,
            None => SqliteDocumentStore::open_default()?,
        };
        info!(db = ?config.db_path, "client store opened");
        Ok(Self::new(Arc::new(store), identity, config))
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn current_user_id(&self) -> Option<UserId> {
        self.identity.current_user_id()
    }

    fn require_user(&self) -> Result<UserId> {
        self.current_user_id().ok_or(ClientError::NotSignedIn)
    }

    // ------------------------------------------------------------------
    // Account
    // ------------------------------------------------------------------

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User> {
        identity::register(
            self.identity.as_ref(),
            self.store.as_ref(),
            name,
            email,
            password,
        )
        .await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<UserId> {
        let user = self.identity.sign_in(email, password).await?;
        info!(user = %user, "signed in");
        Ok(user)
    }

    /// Sign out.  Open sessions should be closed by the caller first.
    pub async fn logout(&self) -> Result<()> {
        self.identity.sign_out().await?;
        info!("signed out");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Directory & conversations
    // ------------------------------------------------------------------

    pub fn directory(&self) -> Directory {
        Directory::new(self.store.clone())
    }

    /// Refresh `directory` on behalf of the signed-in user.
    pub async fn refresh_directory<'d>(&self, directory: &'d mut Directory) -> Result<&'d [User]> {
        let me = self.require_user()?;
        directory.refresh(&me).await
    }

    pub fn conversation_id_with(&self, other: &UserId) -> Result<ConversationId> {
        let me = self.require_user()?;
        Ok(derive_conversation_id(&me, other))
    }

    /// Resolve the conversation with `other_user`, creating its record on
    /// first contact, and return an idle session for it.
    pub async fn open_conversation(&self, other_user: User) -> Result<ChatSession> {
        let me = self.require_user()?;
        let conversation_id = derive_conversation_id(&me, &other_user.id);

        ensure_conversation(self.store.as_ref(), &conversation_id, &me, &other_user.id).await?;

        info!(conversation = %conversation_id, with = %other_user.id, "conversation opened");
        Ok(ChatSession::new(
            self.store.clone(),
            conversation_id,
            me,
            other_user,
            self.config.utc_offset,
        ))
    }
}

//! Identity provider seam and the registration flow built on it.
//!
//! The core only ever asks the provider who is signed in; account creation and
//! sign-in are delegated entirely. [`LocalIdentityProvider`] keeps accounts in
//! process memory and is what tests and single-process embeddings use.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

use parley_shared::constants::{FIELD_USER_EMAIL, FIELD_USER_ID, FIELD_USER_NAME, USERS_COLLECTION};
use parley_shared::{fields, User, UserId};
use parley_store::DocumentStore;

use crate::error::{AuthError, ClientError, Result};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 6;

const PASSWORD_KDF_CONTEXT: &str = "parley-local-password-v1";

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The signed-in user, if any.
    fn current_user_id(&self) -> Option<UserId>;

    /// Create an account and sign it in.
    async fn create_user(&self, email: &str, password: &str) -> std::result::Result<UserId, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> std::result::Result<UserId, AuthError>;

    async fn sign_out(&self) -> std::result::Result<(), AuthError>;
}

struct Account {
    user_id: UserId,
    salt: [u8; 16],
    digest: [u8; 32],
}

#[derive(Default)]
struct LocalState {
    /// Keyed by lower-cased email.
    accounts: HashMap<String, Account>,
    current: Option<UserId>,
}

/// In-process identity provider.  Passwords are kept as salted BLAKE3
/// digests, user ids are random UUIDs.
#[derive(Default)]
pub struct LocalIdentityProvider {
    state: Mutex<LocalState>,
}

impl LocalIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::result::Result<std::sync::MutexGuard<'_, LocalState>, AuthError> {
        self.state
            .lock()
            .map_err(|e| AuthError::Provider(format!("Lock poisoned: {e}")))
    }
}

fn password_digest(salt: &[u8; 16], password: &str) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(PASSWORD_KDF_CONTEXT);
    hasher.update(salt);
    hasher.update(password.as_bytes());
    *hasher.finalize().as_bytes()
}

fn normalize_email(email: &str) -> std::result::Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(AuthError::InvalidEmail)
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    fn current_user_id(&self) -> Option<UserId> {
        self.lock().ok().and_then(|s| s.current.clone())
    }

    async fn create_user(&self, email: &str, password: &str) -> std::result::Result<UserId, AuthError> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword(MIN_PASSWORD_LEN));
        }

        let mut state = self.lock()?;
        if state.accounts.contains_key(&email) {
            return Err(AuthError::EmailInUse);
        }

        let salt = Uuid::new_v4().into_bytes();
        let user_id = UserId(Uuid::new_v4().simple().to_string());
        state.accounts.insert(
            email,
            Account {
                user_id: user_id.clone(),
                salt,
                digest: password_digest(&salt, password),
            },
        );
        state.current = Some(user_id.clone());

        debug!(user = %user_id, "account created");
        Ok(user_id)
    }

    async fn sign_in(&self, email: &str, password: &str) -> std::result::Result<UserId, AuthError> {
        let email = normalize_email(email).map_err(|_| AuthError::InvalidCredentials)?;
        let mut state = self.lock()?;

        let user_id = match state.accounts.get(&email) {
            Some(account) if password_digest(&account.salt, password) == account.digest => {
                account.user_id.clone()
            }
            _ => return Err(AuthError::InvalidCredentials),
        };

        state.current = Some(user_id.clone());
        debug!(user = %user_id, "signed in");
        Ok(user_id)
    }

    async fn sign_out(&self) -> std::result::Result<(), AuthError> {
        let mut state = self.lock()?;
        match state.current.take() {
            Some(user) => {
                debug!(user = %user, "signed out");
                Ok(())
            }
            None => Err(AuthError::NotSignedIn),
        }
    }
}

/// Create an account and publish its profile to the `users` collection so
/// other users can find it in their directory.
pub async fn register(
    identity: &dyn IdentityProvider,
    store: &dyn DocumentStore,
    name: &str,
    email: &str,
    password: &str,
) -> Result<User> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ClientError::Validation("name must not be empty".into()));
    }

    let user_id = identity.create_user(email, password).await?;
    let email = email.trim().to_string();

    store
        .set_document(
            USERS_COLLECTION,
            user_id.as_str(),
            fields! {
                FIELD_USER_ID => user_id.as_str(),
                FIELD_USER_NAME => name,
                FIELD_USER_EMAIL => email.as_str(),
            },
        )
        .await?;

    info!(user = %user_id, "user registered");
    Ok(User {
        id: user_id,
        name: name.to_string(),
        email,
        avatar_url: None,
    })
}

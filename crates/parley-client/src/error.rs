use parley_store::StoreError;
use thiserror::Error;

/// Failures reported by the identity provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("The email address is badly formatted")]
    InvalidEmail,

    #[error("The password must be at least {0} characters long")]
    WeakPassword(usize),

    #[error("The email address is already in use by another account")]
    EmailInUse,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("No user is signed in")]
    NotSignedIn,

    #[error("Identity provider error: {0}")]
    Provider(String),
}

#[derive(Error, Debug)]
pub enum ClientError {
    /// Input rejected before any backend call.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No user is signed in")]
    NotSignedIn,

    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Backend error: {0}")]
    Backend(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, ClientError>;

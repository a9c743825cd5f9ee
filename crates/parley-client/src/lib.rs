//! Parley client core: identity, the user directory, conversation resolution
//! and the live day-sectioned message feed, on top of a [`DocumentStore`].
//!
//! Hosts typically build a [`ParleyClient`] once and open a [`ChatSession`]
//! per visible conversation.
//!
//! [`DocumentStore`]: parley_store::DocumentStore

pub mod client;
pub mod config;
pub mod conversation;
pub mod directory;
pub mod error;
pub mod identity;
pub mod logging;
pub mod messaging;
pub mod projector;
pub mod sections;
pub mod session;

pub use client::ParleyClient;
pub use config::ClientConfig;
pub use directory::Directory;
pub use error::{AuthError, ClientError, Result};
pub use identity::{IdentityProvider, LocalIdentityProvider};
pub use projector::{MessageProjector, ProjectorState};
pub use session::ChatSession;

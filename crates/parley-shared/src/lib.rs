//! Types shared by every Parley crate: identifiers, domain models, the
//! schemaless document representation and collection/field constants.

pub mod constants;
pub mod document;
pub mod error;
pub mod models;
pub mod types;

pub use document::{Document, FieldMap, FieldValue};
pub use error::SharedError;
pub use models::{Conversation, Message, MessageSection, User};
pub use types::{derive_conversation_id, ConversationId, MessageId, MessageStatus, UserId};

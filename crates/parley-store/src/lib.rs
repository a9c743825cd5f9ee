//! # parley-store
//!
//! Document storage for Parley.
//!
//! The crate defines the [`DocumentStore`] trait the client core is written
//! against (collections of schemaless documents, upserts, live whole-snapshot
//! queries) and [`SqliteDocumentStore`], an implementation over a local
//! SQLite database with versioned migrations.

pub mod database;
pub mod document_store;
pub mod documents;
pub mod migrations;
pub mod sqlite;

mod error;

pub use database::Database;
pub use document_store::{order_snapshot, DocumentStore, QuerySubscription, Snapshot};
pub use error::{Result, StoreError};
pub use sqlite::SqliteDocumentStore;

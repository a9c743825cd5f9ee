//! v001 -- Initial schema creation.
//!
//! A single `documents` table holds every collection.  Collection paths are
//! plain strings (`users`, `chats`, `chats/<id>/messages`), so sub-collections
//! need no extra tables.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Documents
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,              -- collection path
    id         TEXT NOT NULL,              -- document id, unique per collection
    fields     TEXT NOT NULL,              -- JSON-encoded field map
    created_at TEXT NOT NULL,              -- RFC-3339
    updated_at TEXT NOT NULL,

    PRIMARY KEY (collection, id)
);

CREATE INDEX IF NOT EXISTS idx_documents_collection
    ON documents(collection);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}

//! CRUD operations on the `documents` table.
//!
//! Every write resolves [`FieldValue::ServerTimestamp`] placeholders against
//! the database clock before the field map is persisted, so readers never see
//! an unresolved placeholder coming back from this store.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use parley_shared::document::{Document, FieldMap, FieldValue};

use crate::database::Database;
use crate::error::Result;

impl Database {
    // ------------------------------------------------------------------
    // Create / update
    // ------------------------------------------------------------------

    /// Insert a document under a freshly generated id and return that id.
    pub fn add_document(&self, collection: &str, fields: FieldMap) -> Result<String> {
        let id = Uuid::new_v4().simple().to_string();
        let now = Utc::now();
        let fields = resolve(fields, now);

        self.conn().execute(
            "INSERT INTO documents (collection, id, fields, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![collection, id, serde_json::to_string(&fields)?, now.to_rfc3339()],
        )?;
        Ok(id)
    }

    /// Create or overwrite the document with the given id.
    ///
    /// An existing row keeps its position in insertion order; only its
    /// fields and `updated_at` change.
    pub fn set_document(&self, collection: &str, id: &str, fields: FieldMap) -> Result<()> {
        let now = Utc::now();
        let fields = resolve(fields, now);

        self.conn().execute(
            "INSERT INTO documents (collection, id, fields, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(collection, id) DO UPDATE SET
                 fields = excluded.fields,
                 updated_at = excluded.updated_at",
            params![collection, id, serde_json::to_string(&fields)?, now.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Merge `fields` into the existing document (creating it if absent).
    pub fn merge_document(&self, collection: &str, id: &str, fields: FieldMap) -> Result<()> {
        let tx = self.conn().unchecked_transaction()?;

        let mut merged = match self.get_document(collection, id)? {
            Some(existing) => existing.fields,
            None => FieldMap::new(),
        };
        merged.extend(fields);
        self.set_document(collection, id, merged)?;

        tx.commit()?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single document, `None` if it does not exist.
    pub fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let doc = self
            .conn()
            .query_row(
                "SELECT id, fields FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                row_to_document,
            )
            .optional()?;
        Ok(doc)
    }

    /// List all documents of a collection in insertion order.
    pub fn list_documents(&self, collection: &str) -> Result<Vec<Document>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, fields
             FROM documents
             WHERE collection = ?1
             ORDER BY rowid ASC",
        )?;

        let rows = stmt.query_map(params![collection], row_to_document)?;

        let mut documents = Vec::new();
        for row in rows {
            documents.push(row?);
        }
        Ok(documents)
    }

    /// Count documents in a collection.
    pub fn count_documents(&self, collection: &str) -> Result<usize> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn resolve(mut fields: FieldMap, now: chrono::DateTime<Utc>) -> FieldMap {
    fields
        .values_mut()
        .for_each(|v: &mut FieldValue| v.resolve_placeholders(now));
    fields
}

/// Map a `rusqlite::Row` to a [`Document`].
fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<Document> {
    let id: String = row.get(0)?;
    let fields_json: String = row.get(1)?;

    let fields: FieldMap = serde_json::from_str(&fields_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Document { id, fields })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_shared::fields;

    #[test]
    fn test_add_and_list_in_insertion_order() {
        let db = Database::open_in_memory().unwrap();
        let a = db.add_document("c", fields! { "n" => "a" }).unwrap();
        let b = db.add_document("c", fields! { "n" => "b" }).unwrap();
        db.add_document("other", fields! { "n" => "x" }).unwrap();

        let docs = db.list_documents("c").unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, a);
        assert_eq!(docs[1].id, b);
        assert_ne!(a, b);
    }

    #[test]
    fn test_set_overwrites_by_id() {
        let db = Database::open_in_memory().unwrap();
        db.set_document("chats", "u1_u2", fields! { "a" => "1", "b" => "1" })
            .unwrap();
        db.set_document("chats", "u1_u2", fields! { "a" => "2" }).unwrap();

        assert_eq!(db.count_documents("chats").unwrap(), 1);
        let doc = db.get_document("chats", "u1_u2").unwrap().unwrap();
        assert_eq!(doc.get_str("a"), Some("2"));
        assert!(doc.get("b").is_none());
    }

    #[test]
    fn test_merge_keeps_other_fields() {
        let db = Database::open_in_memory().unwrap();
        db.set_document("chats", "k", fields! { "a" => "1", "b" => "1" })
            .unwrap();
        db.merge_document("chats", "k", fields! { "b" => "2", "c" => "3" })
            .unwrap();
        db.merge_document("chats", "new", fields! { "z" => "9" }).unwrap();

        let doc = db.get_document("chats", "k").unwrap().unwrap();
        assert_eq!(doc.get_str("a"), Some("1"));
        assert_eq!(doc.get_str("b"), Some("2"));
        assert_eq!(doc.get_str("c"), Some("3"));
        assert!(db.get_document("chats", "new").unwrap().is_some());
    }

    #[test]
    fn test_server_timestamp_is_resolved() {
        let db = Database::open_in_memory().unwrap();
        let before = Utc::now();
        let id = db
            .add_document("m", fields! { "timestamp" => FieldValue::ServerTimestamp })
            .unwrap();

        let doc = db.get_document("m", &id).unwrap().unwrap();
        let ts = doc.get_timestamp("timestamp").expect("resolved timestamp");
        assert!(ts >= before);
    }

    #[test]
    fn test_get_missing_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_document("users", "nobody").unwrap().is_none());
        assert!(db.list_documents("users").unwrap().is_empty());
    }
}

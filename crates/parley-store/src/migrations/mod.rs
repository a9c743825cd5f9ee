//! Schema migrations, tracked through `PRAGMA user_version`.
//!
//! Each entry in [`MIGRATIONS`] runs at most once, inside its own transaction,
//! and bumps `user_version` to its position in the list.

pub mod v001_initial;

use rusqlite::Connection;

use crate::error::{Result, StoreError};

type Migration = (&'static str, fn(&Connection) -> rusqlite::Result<()>);

/// Ordered list; index + 1 is the schema version a migration produces.
const MIGRATIONS: &[Migration] = &[("v001_initial", v001_initial::up)];

/// Schema version after every migration has run.
pub const CURRENT_VERSION: u32 = MIGRATIONS.len() as u32;

/// Bring the schema of `conn` up to [`CURRENT_VERSION`].
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema v{current} is newer than supported v{CURRENT_VERSION}"
        )));
    }

    for (version, (name, up)) in (1u32..).zip(MIGRATIONS) {
        if version <= current {
            continue;
        }
        tracing::info!(migration = *name, version, "applying migration");

        let tx = conn.unchecked_transaction()?;
        up(&tx).map_err(|e| StoreError::Migration(format!("{name}: {e}")))?;
        tx.pragma_update(None, "user_version", version)?;
        tx.commit()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_version(conn: &Connection) -> u32 {
        conn.pragma_query_value(None, "user_version", |row| row.get(0)).unwrap()
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(user_version(&conn), CURRENT_VERSION);

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'documents'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 1);
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", CURRENT_VERSION + 1).unwrap();
        assert!(matches!(run_migrations(&conn), Err(StoreError::Migration(_))));
    }
}

//! SQLite-backed durable medium.
//!
//! # Invariants
//! - All items live in `storage_items`; `namespace` holds the key part
//!   before the first `:` and backs `namespace_keys`.
//! - Keys are enumerated in ascending order.

use super::{BackendResult, StorageBackend};
use crate::db::{open_db, open_db_in_memory, DbResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Durable backend storing one row per namespaced key.
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Opens (and migrates) a SQLite file.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self {
            conn: open_db(path)?,
        })
    }

    /// Opens (and migrates) a private in-memory database.
    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self {
            conn: open_db_in_memory()?,
        })
    }

    /// Wraps a connection returned by `db::open_db*`.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl StorageBackend for SqliteBackend {
    fn get_item(&self, key: &str) -> BackendResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT item_value FROM storage_items WHERE item_key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_item(&mut self, key: &str, value: &str) -> BackendResult<()> {
        let namespace = key.split_once(':').map_or("", |(namespace, _)| namespace);
        self.conn.execute(
            "INSERT INTO storage_items (item_key, item_value, namespace)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(item_key) DO UPDATE SET
                item_value = excluded.item_value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, value, namespace],
        )?;
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> BackendResult<()> {
        self.conn
            .execute("DELETE FROM storage_items WHERE item_key = ?1;", [key])?;
        Ok(())
    }

    fn keys(&self) -> BackendResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT item_key FROM storage_items ORDER BY item_key ASC;")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }

    fn namespace_keys(&self, namespace: &str) -> BackendResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT item_key FROM storage_items
             WHERE namespace = ?1
             ORDER BY item_key ASC;",
        )?;
        let keys = stmt
            .query_map([namespace], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }
}

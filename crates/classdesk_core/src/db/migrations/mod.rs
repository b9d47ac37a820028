//! Schema steps for `storage_items`.
//!
//! Step `n` moves the file from `user_version = n - 1` to `n`. Each step
//! commits on its own, so an interrupted upgrade resumes at the first step
//! that did not commit.

use super::{DbError, DbResult};
use log::info;
use rusqlite::{Connection, TransactionBehavior};

/// Storage schema version written by this build.
pub const STORAGE_SCHEMA_VERSION: u32 = 2;

const STEPS: [&str; STORAGE_SCHEMA_VERSION as usize] = [
    include_str!("0001_storage_items.sql"),
    include_str!("0002_namespace_index.sql"),
];

const REQUIRED_COLUMNS: [&str; 4] = ["item_key", "item_value", "updated_at", "namespace"];

/// Reads `PRAGMA user_version`.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.pragma_query_value(None, "user_version", |row| row.get::<_, u32>(0))?;
    Ok(version)
}

/// Upgrades the storage schema to `STORAGE_SCHEMA_VERSION` and checks the
/// resulting table shape.
///
/// Returns the version found before upgrading.
pub fn migrate_storage(conn: &mut Connection) -> DbResult<u32> {
    let found = schema_version(conn)?;
    if found > STORAGE_SCHEMA_VERSION {
        return Err(DbError::SchemaTooNew {
            found,
            supported: STORAGE_SCHEMA_VERSION,
        });
    }

    for (version, sql) in (1..).zip(STEPS).skip(found as usize) {
        apply_step(conn, version, sql).map_err(|source| DbError::Migration { version, source })?;
        info!("event=db_migrate module=db status=ok version={version}");
    }

    verify_storage_table(conn)?;
    Ok(found)
}

fn apply_step(conn: &mut Connection, version: u32, sql: &str) -> rusqlite::Result<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute_batch(sql)?;
    tx.pragma_update(None, "user_version", version)?;
    tx.commit()
}

fn verify_storage_table(conn: &Connection) -> DbResult<()> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('storage_items');")?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    match REQUIRED_COLUMNS
        .into_iter()
        .find(|required| !columns.iter().any(|column| column == required))
    {
        Some(column) => Err(DbError::StorageTableIncomplete { column }),
        None => Ok(()),
    }
}

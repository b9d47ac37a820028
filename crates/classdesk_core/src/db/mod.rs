//! SQLite file behind the durable storage scope.
//!
//! The whole schema is one `storage_items` table: one row per namespaced
//! key, with the namespace split into its own indexed column so a store
//! can enumerate its keys without scanning other namespaces.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use migrations::{migrate_storage, schema_version, STORAGE_SCHEMA_VERSION};
pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The file was last written by a build with a newer storage schema.
    SchemaTooNew { found: u32, supported: u32 },
    /// One schema step failed and was rolled back.
    Migration {
        version: u32,
        source: rusqlite::Error,
    },
    /// `storage_items` lacks a column the current schema requires.
    StorageTableIncomplete { column: &'static str },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "storage file uses schema {found}; this build reads up to {supported}"
            ),
            Self::Migration { version, source } => {
                write!(f, "storage schema step {version} failed: {source}")
            }
            Self::StorageTableIncomplete { column } => {
                write!(f, "storage_items is missing column `{column}`")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Migration { source: err, .. } => Some(err),
            Self::SchemaTooNew { .. } | Self::StorageTableIncomplete { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

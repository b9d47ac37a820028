//! Namespaced key-value storage over durable and transient scopes.
//!
//! # Responsibility
//! - Define the backend contract (`StorageBackend`) the store writes through.
//! - Provide the namespaced `KeyValueStore` with JSON serialization, size
//!   accounting, namespace export/import and backup/restore codecs.
//!
//! # Invariants
//! - Every key written by the store is prefixed with `<namespace>:`.
//! - Store operations never propagate backend failures to callers; failures
//!   are logged, recorded, and reported through return values.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod backup;
mod kv_store;
mod memory;
mod sqlite;

pub use backup::{Backup, NamespaceSnapshot, BACKUP_FORMAT_VERSION};
pub use kv_store::{KeyValueStore, WriteFailure};
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

/// Persistence tier a key lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    /// Survives process restart.
    Durable,
    /// Session-only; cleared when the host session ends.
    Transient,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Durable => "durable",
            Self::Transient => "transient",
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Failure reported by a backing medium.
#[derive(Debug)]
pub enum BackendError {
    /// Write would exceed the medium's capacity.
    QuotaExceeded {
        key: String,
        required_bytes: usize,
        quota_bytes: usize,
    },
    /// Medium refused the operation entirely.
    Unavailable(String),
    Db(DbError),
}

impl Display for BackendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QuotaExceeded {
                key,
                required_bytes,
                quota_bytes,
            } => write!(
                f,
                "quota exceeded writing `{key}`: {required_bytes} bytes needed, quota is {quota_bytes}"
            ),
            Self::Unavailable(message) => write!(f, "storage unavailable: {message}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BackendError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for BackendError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for BackendError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Construction error for `KeyValueStore`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    InvalidNamespace(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidNamespace(value) => write!(
                f,
                "invalid storage namespace `{value}`; expected [A-Za-z0-9_.-]+"
            ),
        }
    }
}

impl Error for StoreError {}

/// Synchronous key-value medium with full key enumeration.
///
/// Keys handed to a backend are already namespaced; backends store them
/// verbatim and may hold unrelated keys from other namespaces.
pub trait StorageBackend {
    fn get_item(&self, key: &str) -> BackendResult<Option<String>>;
    fn set_item(&mut self, key: &str, value: &str) -> BackendResult<()>;
    fn remove_item(&mut self, key: &str) -> BackendResult<()>;
    fn keys(&self) -> BackendResult<Vec<String>>;

    /// Keys of the form `<namespace>:<rest>`, in ascending order.
    fn namespace_keys(&self, namespace: &str) -> BackendResult<Vec<String>> {
        let prefix = format!("{namespace}:");
        let mut keys: Vec<String> = self
            .keys()?
            .into_iter()
            .filter(|key| key.starts_with(&prefix))
            .collect();
        keys.sort();
        Ok(keys)
    }
}

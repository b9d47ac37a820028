//! Repository over the seven entity collections.
//!
//! # Responsibility
//! - Load collections from the durable scope with fallback to defaults.
//! - Mediate every entity mutation and persist through `KeyValueStore`.
//! - Provide snapshot import/export, validation, cleanup and statistics.
//!
//! # Invariants
//! - Callers only see immutable views; mutations go through repository
//!   methods that report their outcome.
//! - Storage and parse failures degrade to logged, reported outcomes.
//! - After a completed `cleanup()`, every foreign key resolves and ids are
//!   unique and non-empty (given at least one teacher account exists).

use crate::db::DbError;
use crate::model::CollectionKind;
use crate::storage::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod autosync;
mod integrity;
mod repository;
mod snapshot;
mod stats;

pub use autosync::{AutoSyncTimer, Clock, ManualClock, SystemClock};
pub use integrity::ValidationReport;
pub use repository::{CollectionState, PersistReport, Repository};
pub use snapshot::SNAPSHOT_FORMAT_VERSION;
pub use stats::{
    AccountStats, AttendanceStats, ClassroomStats, GradeStats, GroupStats, NotificationStats,
    PostStats, RepositoryStats, StorageStats,
};

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for repository construction and entity mutations.
#[derive(Debug)]
pub enum RepoError {
    EmptyId(CollectionKind),
    DuplicateId { kind: CollectionKind, id: String },
    NotFound { kind: CollectionKind, id: String },
    Store(StoreError),
    Db(DbError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId(kind) => write!(f, "{kind}: entity id must not be empty"),
            Self::DuplicateId { kind, id } => write!(f, "{kind}: id `{id}` already exists"),
            Self::NotFound { kind, id } => write!(f, "{kind}: entity not found: {id}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

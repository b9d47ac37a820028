//! Embedded relational store for classroom data.
//!
//! Seven related collections (accounts, classrooms, groups, posts, grade
//! records, attendance records, notifications) are kept mutually consistent
//! in memory and persisted as JSON through a namespaced key-value store.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod storage;

pub use config::{RepositoryConfig, TeacherFallback};
pub use logging::{default_log_level, init_logging, LogError};
pub use model::{
    Account, AccountStatus, AttendanceRecord, AttendanceStatus, Classroom, CollectionKind,
    Dataset, Entity, GradeRecord, Group, MarkType, Notification, Post, Role,
};
pub use repo::{
    CollectionState, ManualClock, PersistReport, RepoError, RepoResult, Repository,
    RepositoryStats, SystemClock, ValidationReport,
};
pub use service::grade_aggregator::{subject_average, try_weighted_average, weighted_average};
pub use storage::{
    Backup, KeyValueStore, MemoryBackend, Scope, SqliteBackend, StorageBackend, StoreError,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

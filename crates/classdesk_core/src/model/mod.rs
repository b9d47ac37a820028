//! Typed entities for the seven repository collections.
//!
//! # Responsibility
//! - Define the serialized shape (camelCase JSON) of every entity.
//! - Bind each entity type to its collection through `Entity`.
//!
//! # Invariants
//! - Every entity carries a string id plus created/updated timestamps.
//! - Foreign keys are plain id strings; resolution is the repository's job.

pub mod account;
pub mod classroom;
pub mod content;
pub mod dataset;
pub mod entity;
pub mod records;

pub use account::{Account, AccountStatus, Role};
pub use classroom::{Classroom, Group};
pub use content::{Notification, Post};
pub use dataset::Dataset;
pub use entity::{new_entity_id, now, CollectionKind, Entity, Timestamp};
pub use records::{AttendanceRecord, AttendanceStatus, GradeRecord, MarkType};

//! Shared entity contract and collection identifiers.

use super::Dataset;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// RFC 3339 timestamp carried by every entity.
pub type Timestamp = DateTime<Utc>;

pub fn now() -> Timestamp {
    Utc::now()
}

/// Generates a fresh opaque entity id.
pub fn new_entity_id() -> String {
    Uuid::new_v4().to_string()
}

/// The seven named collections, in persistence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CollectionKind {
    Accounts,
    Classrooms,
    Groups,
    Posts,
    GradeRecords,
    AttendanceRecords,
    Notifications,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 7] = [
        Self::Accounts,
        Self::Classrooms,
        Self::Groups,
        Self::Posts,
        Self::GradeRecords,
        Self::AttendanceRecords,
        Self::Notifications,
    ];

    /// Key used both in durable storage and in snapshot JSON.
    pub fn storage_key(self) -> &'static str {
        match self {
            Self::Accounts => "accounts",
            Self::Classrooms => "classrooms",
            Self::Groups => "groups",
            Self::Posts => "posts",
            Self::GradeRecords => "gradeRecords",
            Self::AttendanceRecords => "attendanceRecords",
            Self::Notifications => "notifications",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Accounts => 0,
            Self::Classrooms => 1,
            Self::Groups => 2,
            Self::Posts => 3,
            Self::GradeRecords => 4,
            Self::AttendanceRecords => 5,
            Self::Notifications => 6,
        }
    }
}

impl Display for CollectionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.storage_key())
    }
}

/// Addressable record stored in one of the repository collections.
pub trait Entity: Clone + Serialize + DeserializeOwned {
    const KIND: CollectionKind;

    fn id(&self) -> &str;
    fn created_at(&self) -> Timestamp;
    fn updated_at(&self) -> Timestamp;
    /// Sets `updated_at`; called by repository mutations.
    fn touch(&mut self, at: Timestamp);

    fn collection(dataset: &Dataset) -> &Vec<Self>;
    fn collection_mut(dataset: &mut Dataset) -> &mut Vec<Self>;
}

macro_rules! impl_entity {
    ($ty:ty, $kind:ident, $field:ident) => {
        impl $crate::model::entity::Entity for $ty {
            const KIND: $crate::model::entity::CollectionKind =
                $crate::model::entity::CollectionKind::$kind;

            fn id(&self) -> &str {
                &self.id
            }

            fn created_at(&self) -> $crate::model::entity::Timestamp {
                self.created_at
            }

            fn updated_at(&self) -> $crate::model::entity::Timestamp {
                self.updated_at
            }

            fn touch(&mut self, at: $crate::model::entity::Timestamp) {
                self.updated_at = at;
            }

            fn collection(dataset: &$crate::model::Dataset) -> &Vec<Self> {
                &dataset.$field
            }

            fn collection_mut(dataset: &mut $crate::model::Dataset) -> &mut Vec<Self> {
                &mut dataset.$field
            }
        }
    };
}

pub(crate) use impl_entity;

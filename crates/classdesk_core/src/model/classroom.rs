//! Classroom and group entities.

use super::entity::{impl_entity, new_entity_id, now, Timestamp};
use serde::{Deserialize, Serialize};

/// A class taught by one teacher account to a roster of student accounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classroom {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// -> Accounts.
    pub teacher_ref: String,
    /// -> Accounts.
    #[serde(default)]
    pub student_refs: Vec<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub created_at: Timestamp,
    #[serde(default)]
    pub updated_at: Timestamp,
}

impl Classroom {
    pub fn new(name: impl Into<String>, teacher_ref: impl Into<String>) -> Self {
        let at = now();
        Self {
            id: new_entity_id(),
            name: name.into(),
            teacher_ref: teacher_ref.into(),
            student_refs: Vec::new(),
            archived: false,
            created_at: at,
            updated_at: at,
        }
    }
}

/// Free-form grouping of accounts across classrooms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// -> Accounts.
    #[serde(default)]
    pub member_refs: Vec<String>,
    /// -> Classrooms.
    #[serde(default)]
    pub classroom_refs: Vec<String>,
    #[serde(default)]
    pub created_at: Timestamp,
    #[serde(default)]
    pub updated_at: Timestamp,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        let at = now();
        Self {
            id: new_entity_id(),
            name: name.into(),
            member_refs: Vec::new(),
            classroom_refs: Vec::new(),
            created_at: at,
            updated_at: at,
        }
    }
}

impl_entity!(Classroom, Classrooms, classrooms);
impl_entity!(Group, Groups, groups);

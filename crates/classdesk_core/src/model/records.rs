//! Per-student grade and attendance records.
//!
//! # Invariants
//! - `GradeRecord`: finite `value >= 0`, finite `max_value > 0`, finite
//!   `weight > 0` when set. These are checked by repository validation and
//!   enforced by cleanup, not on construction.

use super::entity::{impl_entity, new_entity_id, now, Timestamp};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Weight applied when a grade record carries none.
pub const DEFAULT_GRADE_WEIGHT: f64 = 1.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkType {
    Exam,
    Quiz,
    #[default]
    Assignment,
    Project,
    Participation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRecord {
    pub id: String,
    /// -> Accounts (the graded student).
    pub subject_owner_ref: String,
    /// -> Classrooms, optional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classroom_ref: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub mark_type: MarkType,
    pub value: f64,
    pub max_value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default)]
    pub exempted: bool,
    #[serde(default)]
    pub created_at: Timestamp,
    #[serde(default)]
    pub updated_at: Timestamp,
}

impl GradeRecord {
    pub fn new(subject_owner_ref: impl Into<String>, value: f64, max_value: f64) -> Self {
        let at = now();
        Self {
            id: new_entity_id(),
            subject_owner_ref: subject_owner_ref.into(),
            classroom_ref: None,
            title: String::new(),
            mark_type: MarkType::default(),
            value,
            max_value,
            weight: None,
            exempted: false,
            created_at: at,
            updated_at: at,
        }
    }

    /// Whether `value` and `max_value` form a usable score.
    pub fn has_valid_range(&self) -> bool {
        self.value.is_finite()
            && self.value >= 0.0
            && self.max_value.is_finite()
            && self.max_value > 0.0
    }

    /// Whether `weight` is absent or a finite positive number.
    pub fn has_valid_weight(&self) -> bool {
        self.weight
            .map_or(true, |weight| weight.is_finite() && weight > 0.0)
    }

    pub fn effective_weight(&self) -> f64 {
        self.weight.unwrap_or(DEFAULT_GRADE_WEIGHT)
    }

    /// `value / max_value * 100`; not meaningful when `max_value <= 0`.
    pub fn percentage(&self) -> f64 {
        self.value / self.max_value * 100.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    #[default]
    Present,
    Absent,
    Late,
    Excused,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: String,
    /// -> Accounts (the attending student).
    pub subject_owner_ref: String,
    /// -> Classrooms, optional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classroom_ref: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub created_at: Timestamp,
    #[serde(default)]
    pub updated_at: Timestamp,
}

impl AttendanceRecord {
    pub fn new(
        subject_owner_ref: impl Into<String>,
        date: NaiveDate,
        status: AttendanceStatus,
    ) -> Self {
        let at = now();
        Self {
            id: new_entity_id(),
            subject_owner_ref: subject_owner_ref.into(),
            classroom_ref: None,
            date: Some(date),
            status,
            created_at: at,
            updated_at: at,
        }
    }
}

impl_entity!(GradeRecord, GradeRecords, grade_records);
impl_entity!(AttendanceRecord, AttendanceRecords, attendance_records);

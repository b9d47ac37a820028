//! Whole-repository dataset and the compiled default seed.

use super::entity::{CollectionKind, Timestamp};
use super::{
    Account, AccountStatus, AttendanceRecord, AttendanceStatus, Classroom, GradeRecord, Group,
    MarkType, Notification, Post, Role,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// 2024-09-01T08:00:00Z, the fixed creation time of seed entities.
const SEED_EPOCH_SECS: i64 = 1_725_177_600;
const SEED_CLASSROOM: &str = "class-math-7a";

/// The seven collections held by a repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub accounts: Vec<Account>,
    pub classrooms: Vec<Classroom>,
    pub groups: Vec<Group>,
    pub posts: Vec<Post>,
    pub grade_records: Vec<GradeRecord>,
    pub attendance_records: Vec<AttendanceRecord>,
    pub notifications: Vec<Notification>,
}

impl Dataset {
    /// Number of entities in one collection.
    pub fn count(&self, kind: CollectionKind) -> usize {
        match kind {
            CollectionKind::Accounts => self.accounts.len(),
            CollectionKind::Classrooms => self.classrooms.len(),
            CollectionKind::Groups => self.groups.len(),
            CollectionKind::Posts => self.posts.len(),
            CollectionKind::GradeRecords => self.grade_records.len(),
            CollectionKind::AttendanceRecords => self.attendance_records.len(),
            CollectionKind::Notifications => self.notifications.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        CollectionKind::ALL.iter().all(|kind| self.count(*kind) == 0)
    }

    /// Compiled default dataset used when storage holds nothing usable.
    pub fn seed() -> Self {
        let at = seed_time();
        let day = |d: u32| NaiveDate::from_ymd_opt(2024, 9, d);

        let account = |id: &str, role: Role, name: &str, email: &str| Account {
            id: id.to_string(),
            role,
            status: AccountStatus::Active,
            name: name.to_string(),
            email: email.to_string(),
            created_at: at,
            updated_at: at,
        };

        Self {
            accounts: vec![
                account("acct-admin", Role::Admin, "School Admin", "admin@school.test"),
                account("acct-teacher-1", Role::Teacher, "Ada Lovelace", "ada@school.test"),
                account("acct-student-1", Role::Student, "Alan Turing", "alan@school.test"),
                account("acct-student-2", Role::Student, "Grace Hopper", "grace@school.test"),
                account("acct-parent-1", Role::Parent, "Sara Turing", "sara@home.test"),
            ],
            classrooms: vec![Classroom {
                id: "class-math-7a".to_string(),
                name: "Mathematics 7A".to_string(),
                teacher_ref: "acct-teacher-1".to_string(),
                student_refs: vec!["acct-student-1".to_string(), "acct-student-2".to_string()],
                archived: false,
                created_at: at,
                updated_at: at,
            }],
            groups: vec![Group {
                id: "group-math-club".to_string(),
                name: "Math Club".to_string(),
                member_refs: vec!["acct-teacher-1".to_string(), "acct-student-1".to_string()],
                classroom_refs: vec!["class-math-7a".to_string()],
                created_at: at,
                updated_at: at,
            }],
            posts: vec![Post {
                id: "post-welcome".to_string(),
                author_ref: "acct-teacher-1".to_string(),
                title: "Welcome".to_string(),
                body: "Welcome to Mathematics 7A.".to_string(),
                created_at: at,
                updated_at: at,
            }],
            grade_records: vec![
                seed_grade(
                    "grade-1",
                    "acct-student-1",
                    "Quiz 1",
                    MarkType::Quiz,
                    (18.0, Some(1.0)),
                ),
                seed_grade(
                    "grade-2",
                    "acct-student-1",
                    "Midterm",
                    MarkType::Exam,
                    (15.0, Some(2.0)),
                ),
                seed_grade("grade-3", "acct-student-2", "Quiz 1", MarkType::Quiz, (17.0, None)),
            ],
            attendance_records: vec![
                seed_attendance("att-1", "acct-student-1", day(2), AttendanceStatus::Present),
                seed_attendance("att-2", "acct-student-2", day(2), AttendanceStatus::Late),
            ],
            notifications: vec![Notification {
                id: "notif-1".to_string(),
                recipient_ref: "acct-parent-1".to_string(),
                title: "New grade".to_string(),
                message: "Alan received a new grade in Mathematics 7A.".to_string(),
                read: false,
                created_at: at,
                updated_at: at,
            }],
        }
    }
}

fn seed_time() -> Timestamp {
    DateTime::<Utc>::from_timestamp(SEED_EPOCH_SECS, 0).unwrap_or_default()
}

/// Seed grade in Mathematics 7A out of 20; `score` is `(value, weight)`.
fn seed_grade(
    id: &str,
    owner: &str,
    title: &str,
    mark_type: MarkType,
    score: (f64, Option<f64>),
) -> GradeRecord {
    let at = seed_time();
    GradeRecord {
        id: id.to_string(),
        subject_owner_ref: owner.to_string(),
        classroom_ref: Some(SEED_CLASSROOM.to_string()),
        title: title.to_string(),
        mark_type,
        value: score.0,
        max_value: 20.0,
        weight: score.1,
        exempted: false,
        created_at: at,
        updated_at: at,
    }
}

fn seed_attendance(
    id: &str,
    owner: &str,
    date: Option<NaiveDate>,
    status: AttendanceStatus,
) -> AttendanceRecord {
    let at = seed_time();
    AttendanceRecord {
        id: id.to_string(),
        subject_owner_ref: owner.to_string(),
        classroom_ref: Some(SEED_CLASSROOM.to_string()),
        date,
        status,
        created_at: at,
        updated_at: at,
    }
}

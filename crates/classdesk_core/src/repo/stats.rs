//! Aggregate counters over the repository and its durable storage.

use super::Repository;
use crate::model::{AccountStatus, AttendanceStatus, MarkType, Role, Timestamp};
use crate::storage::Scope;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountStats {
    pub total: usize,
    pub admins: usize,
    pub teachers: usize,
    pub students: usize,
    pub parents: usize,
    pub active: usize,
    pub inactive: usize,
    pub suspended: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassroomStats {
    pub total: usize,
    pub active: usize,
    pub archived: usize,
    pub enrollments: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStats {
    pub total: usize,
    pub memberships: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostStats {
    pub total: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeStats {
    pub total: usize,
    pub exempted: usize,
    pub by_mark_type: BTreeMap<MarkType, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStats {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub excused: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationStats {
    pub total: usize,
    pub read: usize,
    pub unread: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    pub size_bytes: usize,
    pub available: bool,
    pub degraded_keys: usize,
    pub last_persisted_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryStats {
    pub accounts: AccountStats,
    pub classrooms: ClassroomStats,
    pub groups: GroupStats,
    pub posts: PostStats,
    pub grade_records: GradeStats,
    pub attendance_records: AttendanceStats,
    pub notifications: NotificationStats,
    pub storage: StorageStats,
}

impl Repository {
    /// Computes counters by collection and sub-dimension.
    ///
    /// Entities are not mutated; the durable scope receives one throwaway
    /// availability probe.
    pub fn stats(&mut self) -> RepositoryStats {
        let data = &self.data;

        let mut accounts = AccountStats {
            total: data.accounts.len(),
            ..AccountStats::default()
        };
        for account in &data.accounts {
            match account.role {
                Role::Admin => accounts.admins += 1,
                Role::Teacher => accounts.teachers += 1,
                Role::Student => accounts.students += 1,
                Role::Parent => accounts.parents += 1,
            }
            match account.status {
                AccountStatus::Active => accounts.active += 1,
                AccountStatus::Inactive => accounts.inactive += 1,
                AccountStatus::Suspended => accounts.suspended += 1,
            }
        }

        let archived = data.classrooms.iter().filter(|c| c.archived).count();
        let classrooms = ClassroomStats {
            total: data.classrooms.len(),
            active: data.classrooms.len() - archived,
            archived,
            enrollments: data.classrooms.iter().map(|c| c.student_refs.len()).sum(),
        };

        let groups = GroupStats {
            total: data.groups.len(),
            memberships: data.groups.iter().map(|g| g.member_refs.len()).sum(),
        };

        let mut grade_records = GradeStats {
            total: data.grade_records.len(),
            ..GradeStats::default()
        };
        for record in &data.grade_records {
            if record.exempted {
                grade_records.exempted += 1;
            }
            *grade_records.by_mark_type.entry(record.mark_type).or_insert(0) += 1;
        }

        let mut attendance_records = AttendanceStats {
            total: data.attendance_records.len(),
            ..AttendanceStats::default()
        };
        for record in &data.attendance_records {
            match record.status {
                AttendanceStatus::Present => attendance_records.present += 1,
                AttendanceStatus::Absent => attendance_records.absent += 1,
                AttendanceStatus::Late => attendance_records.late += 1,
                AttendanceStatus::Excused => attendance_records.excused += 1,
            }
        }

        let read = data.notifications.iter().filter(|n| n.read).count();
        let notifications = NotificationStats {
            total: data.notifications.len(),
            read,
            unread: data.notifications.len() - read,
        };

        let posts = PostStats {
            total: data.posts.len(),
        };

        let storage = StorageStats {
            size_bytes: self.store.size_bytes(Scope::Durable),
            available: self.store.is_available(Scope::Durable),
            degraded_keys: self.store.degraded_keys(Scope::Durable).len(),
            last_persisted_at: self.last_persisted_at(),
        };

        RepositoryStats {
            accounts,
            classrooms,
            groups,
            posts,
            grade_records,
            attendance_records,
            notifications,
            storage,
        }
    }
}

//! Referential-integrity validation and the cleanup pass.
//!
//! # Invariants
//! - `validate` never mutates and always runs to completion.
//! - `cleanup` is re-run safe: a second pass without intervening
//!   mutations repairs nothing and returns `0`.

use super::Repository;
use crate::config::TeacherFallback;
use crate::model::{now, Account, CollectionKind, Entity, GradeRecord, Role};
use log::{info, warn};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Result of `Repository::validate`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub ok: bool,
    pub errors: Vec<String>,
}

impl Repository {
    /// Checks identifier uniqueness, foreign keys and grade value ranges.
    ///
    /// Each violation yields one message naming the collection, the entity
    /// position and the broken rule.
    pub fn validate(&self) -> ValidationReport {
        let mut errors = Vec::new();
        let data = &self.data;

        check_ids(&data.accounts, &mut errors);
        check_ids(&data.classrooms, &mut errors);
        check_ids(&data.groups, &mut errors);
        check_ids(&data.posts, &mut errors);
        check_ids(&data.grade_records, &mut errors);
        check_ids(&data.attendance_records, &mut errors);
        check_ids(&data.notifications, &mut errors);

        let accounts = id_set(&data.accounts);
        let classrooms = id_set(&data.classrooms);
        let account_ref = RefTarget::new(CollectionKind::Accounts, &accounts);
        let classroom_ref = RefTarget::new(CollectionKind::Classrooms, &classrooms);

        for (index, classroom) in data.classrooms.iter().enumerate() {
            let at = Location::new(CollectionKind::Classrooms, index);
            account_ref.check(&mut errors, at, "teacherRef", &classroom.teacher_ref);
            for student in &classroom.student_refs {
                account_ref.check(&mut errors, at, "studentRefs", student);
            }
        }

        for (index, group) in data.groups.iter().enumerate() {
            let at = Location::new(CollectionKind::Groups, index);
            for member in &group.member_refs {
                account_ref.check(&mut errors, at, "memberRefs", member);
            }
            for classroom in &group.classroom_refs {
                classroom_ref.check(&mut errors, at, "classroomRefs", classroom);
            }
        }

        for (index, post) in data.posts.iter().enumerate() {
            let at = Location::new(CollectionKind::Posts, index);
            account_ref.check(&mut errors, at, "authorRef", &post.author_ref);
        }

        for (index, record) in data.grade_records.iter().enumerate() {
            let at = Location::new(CollectionKind::GradeRecords, index);
            account_ref.check(&mut errors, at, "subjectOwnerRef", &record.subject_owner_ref);
            if let Some(classroom) = &record.classroom_ref {
                classroom_ref.check(&mut errors, at, "classroomRef", classroom);
            }
            if !(record.value >= 0.0) {
                errors.push(format!("{at}: value {} must be >= 0", record.value));
            }
            if !(record.max_value > 0.0) {
                errors.push(format!("{at}: maxValue {} must be > 0", record.max_value));
            }
            if let Some(weight) = record.weight {
                if !(weight > 0.0) {
                    errors.push(format!("{at}: weight {weight} must be > 0"));
                }
            }
            let values = [Some(record.value), Some(record.max_value), record.weight];
            if values.into_iter().flatten().any(f64::is_infinite) {
                errors.push(format!("{at}: grade numbers must be finite"));
            }
        }

        for (index, record) in data.attendance_records.iter().enumerate() {
            let at = Location::new(CollectionKind::AttendanceRecords, index);
            account_ref.check(&mut errors, at, "subjectOwnerRef", &record.subject_owner_ref);
            if let Some(classroom) = &record.classroom_ref {
                classroom_ref.check(&mut errors, at, "classroomRef", classroom);
            }
        }

        for (index, notification) in data.notifications.iter().enumerate() {
            let at = Location::new(CollectionKind::Notifications, index);
            account_ref.check(&mut errors, at, "recipientRef", &notification.recipient_ref);
        }

        let ok = errors.is_empty();
        if ok {
            info!("event=repo_validate module=repo status=ok");
        } else {
            warn!(
                "event=repo_validate module=repo status=violations count={}",
                errors.len()
            );
        }
        ValidationReport { ok, errors }
    }

    /// Repairs or removes entities that break referential integrity or the
    /// grade range rules.
    ///
    /// Grade records with an unusable `value`/`maxValue` are removed; an
    /// invalid `weight` is reset to the default.
    ///
    /// Returns the number of repairs; persists only when it is non-zero.
    pub fn cleanup(&mut self) -> usize {
        let mut repairs = 0;
        let mut touched = HashSet::new();
        let at = now();

        repairs += self.drop_invalid_ids(&mut touched);

        let accounts: HashSet<String> = owned_id_set(&self.data.accounts);
        let classrooms: HashSet<String> = owned_id_set(&self.data.classrooms);
        let fallback = fallback_teacher(&self.data.accounts, &self.config.teacher_fallback);

        for classroom in &mut self.data.classrooms {
            let mut changed = false;
            if !accounts.contains(&classroom.teacher_ref) {
                match &fallback {
                    Some(teacher) => {
                        info!(
                            "event=cleanup_reassign module=repo status=ok classroom={} from={} to={}",
                            classroom.id, classroom.teacher_ref, teacher
                        );
                        classroom.teacher_ref = teacher.clone();
                        repairs += 1;
                        changed = true;
                    }
                    None => warn!(
                        "event=cleanup_reassign module=repo status=skipped classroom={} reason=no_fallback_teacher",
                        classroom.id
                    ),
                }
            }

            let removed = strip_dangling(&mut classroom.student_refs, &accounts);
            repairs += removed;
            if changed || removed > 0 {
                classroom.updated_at = at;
                touched.insert(CollectionKind::Classrooms);
            }
        }

        for group in &mut self.data.groups {
            let removed = strip_dangling(&mut group.member_refs, &accounts)
                + strip_dangling(&mut group.classroom_refs, &classrooms);
            if removed > 0 {
                repairs += removed;
                group.updated_at = at;
                touched.insert(CollectionKind::Groups);
            }
        }

        let data = &mut self.data;
        repairs += retain_counted(&mut data.posts, &mut touched, "orphan", |post| {
            accounts.contains(&post.author_ref)
        });
        repairs += retain_counted(&mut data.grade_records, &mut touched, "orphan", |record| {
            accounts.contains(&record.subject_owner_ref)
        });
        repairs += retain_counted(&mut data.attendance_records, &mut touched, "orphan", |record| {
            accounts.contains(&record.subject_owner_ref)
        });
        repairs += retain_counted(&mut data.notifications, &mut touched, "orphan", |notification| {
            accounts.contains(&notification.recipient_ref)
        });
        repairs += retain_counted(
            &mut data.grade_records,
            &mut touched,
            "grade_range",
            GradeRecord::has_valid_range,
        );

        for record in &mut self.data.grade_records {
            if !record.has_valid_weight() {
                info!(
                    "event=cleanup_weight module=repo status=ok record={} reason=invalid_weight",
                    record.id
                );
                record.weight = None;
                record.updated_at = at;
                repairs += 1;
                touched.insert(CollectionKind::GradeRecords);
            }
        }

        for record in &mut self.data.grade_records {
            if record
                .classroom_ref
                .as_ref()
                .is_some_and(|classroom| !classrooms.contains(classroom))
            {
                record.classroom_ref = None;
                record.updated_at = at;
                repairs += 1;
                touched.insert(CollectionKind::GradeRecords);
            }
        }
        for record in &mut self.data.attendance_records {
            if record
                .classroom_ref
                .as_ref()
                .is_some_and(|classroom| !classrooms.contains(classroom))
            {
                record.classroom_ref = None;
                record.updated_at = at;
                repairs += 1;
                touched.insert(CollectionKind::AttendanceRecords);
            }
        }

        for kind in touched {
            self.mark_dirty(kind);
        }

        info!("event=repo_cleanup module=repo status=ok repairs={repairs}");
        if repairs > 0 {
            self.persist_all();
        }
        repairs
    }

    fn drop_invalid_ids(&mut self, touched: &mut HashSet<CollectionKind>) -> usize {
        let data = &mut self.data;
        dedupe(&mut data.accounts, touched)
            + dedupe(&mut data.classrooms, touched)
            + dedupe(&mut data.groups, touched)
            + dedupe(&mut data.posts, touched)
            + dedupe(&mut data.grade_records, touched)
            + dedupe(&mut data.attendance_records, touched)
            + dedupe(&mut data.notifications, touched)
    }
}

#[derive(Debug, Clone, Copy)]
struct Location {
    kind: CollectionKind,
    index: usize,
}

impl Location {
    fn new(kind: CollectionKind, index: usize) -> Self {
        Self { kind, index }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.kind, self.index)
    }
}

struct RefTarget<'a> {
    kind: CollectionKind,
    ids: &'a HashSet<&'a str>,
}

impl<'a> RefTarget<'a> {
    fn new(kind: CollectionKind, ids: &'a HashSet<&'a str>) -> Self {
        Self { kind, ids }
    }

    fn check(&self, errors: &mut Vec<String>, at: Location, field: &str, value: &str) {
        if !self.ids.contains(value) {
            errors.push(format!(
                "{at}: {field} `{value}` does not resolve to an entity in {}",
                self.kind
            ));
        }
    }
}

fn check_ids<E: Entity>(items: &[E], errors: &mut Vec<String>) {
    let mut first_seen: HashMap<&str, usize> = HashMap::new();
    for (index, entity) in items.iter().enumerate() {
        let at = Location::new(E::KIND, index);
        let id = entity.id();
        if id.trim().is_empty() {
            errors.push(format!("{at}: id must not be empty"));
            continue;
        }
        if let Some(first) = first_seen.get(id) {
            errors.push(format!(
                "{at}: duplicate id `{id}` (first seen at index {first})"
            ));
        } else {
            first_seen.insert(id, index);
        }
    }
}

fn id_set<E: Entity>(items: &[E]) -> HashSet<&str> {
    items
        .iter()
        .map(|entity| entity.id())
        .filter(|id| !id.trim().is_empty())
        .collect()
}

fn owned_id_set<E: Entity>(items: &[E]) -> HashSet<String> {
    id_set(items).into_iter().map(str::to_string).collect()
}

/// Drops entities with blank ids and later duplicates of an id.
fn dedupe<E: Entity>(items: &mut Vec<E>, touched: &mut HashSet<CollectionKind>) -> usize {
    let before = items.len();
    let mut seen = HashSet::new();
    items.retain(|entity| {
        let id = entity.id();
        !id.trim().is_empty() && seen.insert(id.to_string())
    });

    let removed = before - items.len();
    if removed > 0 {
        warn!(
            "event=cleanup_ids module=repo status=ok collection={} removed={}",
            E::KIND,
            removed
        );
        touched.insert(E::KIND);
    }
    removed
}

fn strip_dangling(refs: &mut Vec<String>, targets: &HashSet<String>) -> usize {
    let before = refs.len();
    refs.retain(|id| targets.contains(id));
    before - refs.len()
}

/// Keeps entities for which `keep` holds and returns how many were removed.
fn retain_counted<E, F>(
    items: &mut Vec<E>,
    touched: &mut HashSet<CollectionKind>,
    reason: &str,
    keep: F,
) -> usize
where
    E: Entity,
    F: Fn(&E) -> bool,
{
    let before = items.len();
    items.retain(|entity| keep(entity));

    let removed = before - items.len();
    if removed > 0 {
        info!(
            "event=cleanup_remove module=repo status=ok collection={} reason={} removed={}",
            E::KIND,
            reason,
            removed
        );
        touched.insert(E::KIND);
    }
    removed
}

fn fallback_teacher(accounts: &[Account], policy: &TeacherFallback) -> Option<String> {
    let mut teachers = accounts
        .iter()
        .filter(|account| account.role == Role::Teacher && !account.id.trim().is_empty());

    let chosen = match policy {
        TeacherFallback::FirstTeacher => teachers.next(),
        TeacherFallback::LastTeacher => teachers.last(),
        TeacherFallback::Preferred(id) => {
            let first = teachers.clone().next();
            teachers.find(|account| &account.id == id).or(first)
        }
        TeacherFallback::Leave => None,
    };
    chosen.map(|account| account.id.clone())
}

#[cfg(test)]
mod tests {
    use super::fallback_teacher;
    use crate::config::TeacherFallback;
    use crate::model::{Account, Role};

    fn accounts() -> Vec<Account> {
        let mut admin = Account::new(Role::Admin, "Admin", "a@x.test");
        admin.id = "admin".to_string();
        let mut t1 = Account::new(Role::Teacher, "T1", "t1@x.test");
        t1.id = "t1".to_string();
        let mut t2 = Account::new(Role::Teacher, "T2", "t2@x.test");
        t2.id = "t2".to_string();
        vec![admin, t1, t2]
    }

    #[test]
    fn fallback_policies_choose_expected_teacher() {
        let accounts = accounts();
        assert_eq!(
            fallback_teacher(&accounts, &TeacherFallback::FirstTeacher).as_deref(),
            Some("t1")
        );
        assert_eq!(
            fallback_teacher(&accounts, &TeacherFallback::LastTeacher).as_deref(),
            Some("t2")
        );
        assert_eq!(
            fallback_teacher(&accounts, &TeacherFallback::Preferred("t2".to_string())).as_deref(),
            Some("t2")
        );
        assert_eq!(fallback_teacher(&accounts, &TeacherFallback::Leave), None);
    }

    #[test]
    fn preferred_non_teacher_falls_back_to_first_teacher() {
        let accounts = accounts();
        assert_eq!(
            fallback_teacher(&accounts, &TeacherFallback::Preferred("admin".to_string()))
                .as_deref(),
            Some("t1")
        );
    }
}

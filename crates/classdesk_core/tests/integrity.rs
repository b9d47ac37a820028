use classdesk_core::{
    Account, AttendanceRecord, Classroom, CollectionKind, CollectionState, Dataset, GradeRecord,
    Group, Post, Repository, RepositoryConfig, Role, Scope, TeacherFallback,
};
use serde_json::json;

fn repo_with(policy: TeacherFallback) -> Repository {
    let config = RepositoryConfig {
        teacher_fallback: policy,
        ..RepositoryConfig::default()
    };
    Repository::in_memory(config, Dataset::seed()).unwrap()
}

fn add_teacher(repo: &mut Repository, id: &str) {
    let mut teacher = Account::new(Role::Teacher, format!("Teacher {id}"), "");
    teacher.id = id.to_string();
    repo.insert(teacher).unwrap();
}

#[test]
fn seed_dataset_is_consistent() {
    let repo = repo_with(TeacherFallback::default());
    let report = repo.validate();
    assert!(report.ok, "{:?}", report.errors);
    assert!(report.errors.is_empty());
}

#[test]
fn validate_names_collection_position_and_rule() {
    let mut repo = repo_with(TeacherFallback::default());
    repo.remove::<Account>("acct-teacher-1").unwrap();

    let report = repo.validate();
    assert!(!report.ok);
    assert!(report.errors.contains(
        &"classrooms[0]: teacherRef `acct-teacher-1` does not resolve to an entity in accounts"
            .to_string()
    ));
    assert!(report.errors.contains(
        &"posts[0]: authorRef `acct-teacher-1` does not resolve to an entity in accounts"
            .to_string()
    ));
    assert!(report.errors.contains(
        &"groups[0]: memberRefs `acct-teacher-1` does not resolve to an entity in accounts"
            .to_string()
    ));
    assert_eq!(report.errors.len(), 3);
}

#[test]
fn validate_reports_grade_ranges_and_duplicate_ids() {
    let mut repo = repo_with(TeacherFallback::default());
    repo.update("grade-1", |record: &mut GradeRecord| {
        record.value = -1.0;
        record.max_value = 0.0;
        record.weight = Some(0.0);
    })
    .unwrap();
    let mut post = Post::new("acct-admin", "Copy", "");
    post.id = "post-welcome".to_string();
    let input = json!({ "posts": [repo.all::<Post>()[0].clone(), post] });
    assert!(repo.import_snapshot(&input.to_string()));

    let errors = repo.validate().errors;
    assert!(errors.contains(&"gradeRecords[0]: value -1 must be >= 0".to_string()));
    assert!(errors.contains(&"gradeRecords[0]: maxValue 0 must be > 0".to_string()));
    assert!(errors.contains(&"gradeRecords[0]: weight 0 must be > 0".to_string()));
    assert!(errors
        .contains(&"posts[1]: duplicate id `post-welcome` (first seen at index 0)".to_string()));
}

#[test]
fn cleanup_repairs_dangling_references_and_is_rerun_safe() {
    let mut repo = repo_with(TeacherFallback::FirstTeacher);
    add_teacher(&mut repo, "acct-teacher-2");
    repo.remove::<Account>("acct-teacher-1").unwrap();
    repo.remove::<Account>("acct-student-2").unwrap();
    assert_eq!(repo.validate().errors.len(), 6);

    let repairs = repo.cleanup();
    assert_eq!(repairs, 6);

    let classroom = repo.get::<Classroom>("class-math-7a").unwrap();
    assert_eq!(classroom.teacher_ref, "acct-teacher-2");
    assert_eq!(classroom.student_refs, vec!["acct-student-1".to_string()]);
    assert_eq!(
        repo.get::<Group>("group-math-club").unwrap().member_refs,
        vec!["acct-student-1".to_string()]
    );
    assert!(repo.all::<Post>().is_empty());
    assert!(repo.get::<GradeRecord>("grade-3").is_none());
    assert!(repo.get::<AttendanceRecord>("att-2").is_none());

    let report = repo.validate();
    assert!(report.ok, "{:?}", report.errors);
    assert_eq!(repo.cleanup(), 0);
}

#[test]
fn cleanup_enforces_grade_ranges() {
    let mut repo = repo_with(TeacherFallback::default());
    repo.update("grade-1", |record: &mut GradeRecord| record.value = -1.0)
        .unwrap();
    repo.update("grade-2", |record: &mut GradeRecord| record.max_value = 0.0)
        .unwrap();
    repo.update("grade-3", |record: &mut GradeRecord| record.weight = Some(0.0))
        .unwrap();
    let mut unbounded = GradeRecord::new("acct-student-2", f64::INFINITY, 20.0);
    unbounded.id = "grade-unbounded".to_string();
    repo.insert(unbounded).unwrap();
    assert!(!repo.validate().ok);

    // two out-of-range records, one infinite value, one weight reset
    assert_eq!(repo.cleanup(), 4);
    assert!(repo.get::<GradeRecord>("grade-1").is_none());
    assert!(repo.get::<GradeRecord>("grade-2").is_none());
    assert!(repo.get::<GradeRecord>("grade-unbounded").is_none());
    assert_eq!(repo.get::<GradeRecord>("grade-3").unwrap().weight, None);
    assert_eq!(
        repo.collection_state(CollectionKind::GradeRecords),
        CollectionState::Persisted
    );

    let report = repo.validate();
    assert!(report.ok, "{:?}", report.errors);
    assert_eq!(repo.cleanup(), 0);
}

#[test]
fn cleanup_persists_only_when_something_was_repaired() {
    let mut repo = repo_with(TeacherFallback::default());
    assert_eq!(repo.cleanup(), 0);
    assert!(repo.store().keys(Scope::Durable).is_empty());

    repo.remove::<Account>("acct-parent-1").unwrap();
    assert_eq!(repo.cleanup(), 1);
    for kind in CollectionKind::ALL {
        assert_eq!(repo.collection_state(kind), CollectionState::Persisted);
    }
    let stored: Vec<classdesk_core::Notification> =
        repo.store().get(Scope::Durable, "notifications").unwrap();
    assert!(stored.is_empty());
}

#[test]
fn cleanup_drops_blank_and_duplicate_ids() {
    let mut repo = repo_with(TeacherFallback::default());
    let original = repo.all::<Post>()[0].clone();
    let mut blank = original.clone();
    blank.id = String::new();
    let input = json!({ "posts": [original.clone(), original, blank] });
    assert!(repo.import_snapshot(&input.to_string()));

    assert_eq!(repo.cleanup(), 2);
    assert_eq!(repo.all::<Post>().len(), 1);
    assert!(repo.validate().ok);
}

#[test]
fn cleanup_clears_optional_classroom_refs() {
    let mut repo = repo_with(TeacherFallback::default());
    repo.remove::<Classroom>("class-math-7a").unwrap();

    // three grades, two attendance records, one group link
    assert_eq!(repo.cleanup(), 6);
    assert!(repo
        .all::<GradeRecord>()
        .iter()
        .all(|record| record.classroom_ref.is_none()));
    assert!(repo
        .all::<AttendanceRecord>()
        .iter()
        .all(|record| record.classroom_ref.is_none()));
    assert!(repo.all::<Group>()[0].classroom_refs.is_empty());
    assert!(repo.validate().ok);
}

#[test]
fn last_teacher_policy_picks_last_teacher_account() {
    let mut repo = repo_with(TeacherFallback::LastTeacher);
    add_teacher(&mut repo, "acct-teacher-2");
    add_teacher(&mut repo, "acct-teacher-3");
    repo.remove::<Account>("acct-teacher-1").unwrap();

    repo.cleanup();
    assert_eq!(
        repo.get::<Classroom>("class-math-7a").unwrap().teacher_ref,
        "acct-teacher-3"
    );
}

#[test]
fn preferred_policy_uses_named_teacher() {
    let mut repo = repo_with(TeacherFallback::Preferred("acct-teacher-2".to_string()));
    add_teacher(&mut repo, "acct-teacher-2");
    add_teacher(&mut repo, "acct-teacher-3");
    repo.remove::<Account>("acct-teacher-1").unwrap();

    repo.cleanup();
    assert_eq!(
        repo.get::<Classroom>("class-math-7a").unwrap().teacher_ref,
        "acct-teacher-2"
    );
}

#[test]
fn leave_policy_keeps_dangling_teacher_for_manual_repair() {
    let mut repo = repo_with(TeacherFallback::Leave);
    add_teacher(&mut repo, "acct-teacher-2");
    repo.remove::<Account>("acct-teacher-1").unwrap();

    // group membership and the welcome post
    assert_eq!(repo.cleanup(), 2);
    assert_eq!(
        repo.get::<Classroom>("class-math-7a").unwrap().teacher_ref,
        "acct-teacher-1"
    );
    assert_eq!(repo.validate().errors.len(), 1);
    assert_eq!(repo.cleanup(), 0);
}

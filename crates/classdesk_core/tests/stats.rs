use classdesk_core::{
    AccountStatus, Dataset, MarkType, Notification, Repository, RepositoryConfig, Scope,
};

fn memory_repo() -> Repository {
    Repository::in_memory(RepositoryConfig::default(), Dataset::seed()).unwrap()
}

#[test]
fn seed_stats_match_collection_contents() {
    let mut repo = memory_repo();
    let stats = repo.stats();

    assert_eq!(stats.accounts.total, 5);
    assert_eq!(stats.accounts.admins, 1);
    assert_eq!(stats.accounts.teachers, 1);
    assert_eq!(stats.accounts.students, 2);
    assert_eq!(stats.accounts.parents, 1);
    assert_eq!(stats.accounts.active, 5);

    assert_eq!(stats.classrooms.total, 1);
    assert_eq!(stats.classrooms.active, 1);
    assert_eq!(stats.classrooms.enrollments, 2);
    assert_eq!(stats.groups.memberships, 2);
    assert_eq!(stats.posts.total, 1);

    assert_eq!(stats.grade_records.total, 3);
    assert_eq!(stats.grade_records.by_mark_type.get(&MarkType::Quiz), Some(&2));
    assert_eq!(stats.grade_records.by_mark_type.get(&MarkType::Exam), Some(&1));

    assert_eq!(stats.attendance_records.present, 1);
    assert_eq!(stats.attendance_records.late, 1);
    assert_eq!(stats.notifications.unread, 1);
}

#[test]
fn sub_dimensions_always_sum_to_totals() {
    let mut repo = memory_repo();
    repo.update("acct-student-2", |account: &mut classdesk_core::Account| {
        account.status = AccountStatus::Suspended;
    })
    .unwrap();
    repo.update("notif-1", |notification: &mut Notification| {
        notification.read = true;
    })
    .unwrap();
    repo.insert(Notification::new("acct-student-1", "Reminder", "Bring a ruler"))
        .unwrap();

    let stats = repo.stats();
    let accounts = &stats.accounts;
    assert_eq!(
        accounts.admins + accounts.teachers + accounts.students + accounts.parents,
        accounts.total
    );
    assert_eq!(accounts.active + accounts.inactive + accounts.suspended, accounts.total);
    assert_eq!(accounts.suspended, 1);

    assert_eq!(stats.notifications.total, 2);
    assert_eq!(stats.notifications.read, 1);
    assert_eq!(
        stats.notifications.read + stats.notifications.unread,
        stats.notifications.total
    );

    let attendance = &stats.attendance_records;
    assert_eq!(
        attendance.present + attendance.absent + attendance.late + attendance.excused,
        attendance.total
    );
    assert_eq!(
        stats.grade_records.by_mark_type.values().sum::<usize>(),
        stats.grade_records.total
    );
}

#[test]
fn storage_stats_track_persisted_bytes() {
    let mut repo = memory_repo();
    let before = repo.stats().storage;
    assert_eq!(before.size_bytes, 0);
    assert!(before.available);
    assert!(before.last_persisted_at.is_none());

    repo.persist_all();
    let expected: usize = repo
        .store()
        .keys(Scope::Durable)
        .iter()
        .filter_map(|key| repo.store().get_raw(Scope::Durable, key))
        .map(|value| value.len())
        .sum();

    let after = repo.stats().storage;
    assert!(after.size_bytes > 0);
    assert_eq!(after.size_bytes, expected);
    assert_eq!(after.degraded_keys, 0);
    assert!(after.last_persisted_at.is_some());
    assert!(repo.store().keys(Scope::Durable).len() == 7);
}

#[test]
fn stats_serialize_with_camel_case_keys() {
    let mut repo = memory_repo();
    let json = serde_json::to_value(repo.stats()).unwrap();

    assert_eq!(json["gradeRecords"]["byMarkType"]["quiz"], 2);
    assert_eq!(json["attendanceRecords"]["total"], 2);
    assert_eq!(json["storage"]["available"], true);
}

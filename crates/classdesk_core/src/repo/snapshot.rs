//! Whole-repository JSON snapshot export/import.
//!
//! Wire shape: the seven collection arrays keyed by their storage keys, plus
//! `exportedAt` (RFC 3339) and `version`.

use super::Repository;
use crate::model::{
    Account, AttendanceRecord, Classroom, CollectionKind, Dataset, GradeRecord, Group,
    Notification, Post,
};
use crate::storage::backup::is_supported_version;
use crate::storage::BACKUP_FORMAT_VERSION;
use chrono::{SecondsFormat, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Format version written into snapshots; shared with namespace backups.
pub const SNAPSHOT_FORMAT_VERSION: &str = BACKUP_FORMAT_VERSION;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotOut<'a> {
    #[serde(flatten)]
    data: &'a Dataset,
    exported_at: String,
    version: &'static str,
}

/// Parsed snapshot; absent collections stay `None`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotIn {
    accounts: Option<Vec<Account>>,
    classrooms: Option<Vec<Classroom>>,
    groups: Option<Vec<Group>>,
    posts: Option<Vec<Post>>,
    grade_records: Option<Vec<GradeRecord>>,
    attendance_records: Option<Vec<AttendanceRecord>>,
    notifications: Option<Vec<Notification>>,
    #[serde(default)]
    exported_at: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

impl Repository {
    /// Serializes all seven collections with an export timestamp and version.
    pub fn export_snapshot(&self) -> String {
        let snapshot = SnapshotOut {
            data: &self.data,
            exported_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            version: SNAPSHOT_FORMAT_VERSION,
        };
        match serde_json::to_string(&snapshot) {
            Ok(json) => {
                info!(
                    "event=snapshot_export module=repo status=ok bytes={}",
                    json.len()
                );
                json
            }
            Err(err) => {
                warn!("event=snapshot_export module=repo status=error error={err}");
                String::new()
            }
        }
    }

    /// Replaces every collection present in `raw` and persists.
    ///
    /// Collections missing from the input are left untouched; there is no
    /// rollback of a partial import. Returns `false` without changing
    /// anything when `raw` does not parse as a snapshot object.
    pub fn import_snapshot(&mut self, raw: &str) -> bool {
        let snapshot: SnapshotIn = match serde_json::from_str(raw) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(
                    "event=snapshot_import module=repo status=rejected reason=parse_failed error={err}"
                );
                return false;
            }
        };

        if let Some(version) = snapshot.version.as_deref() {
            if !is_supported_version(version) {
                warn!(
                    "event=snapshot_import module=repo status=rejected reason=unsupported_version version={version}"
                );
                return false;
            }
        }

        let mut replaced = Vec::new();
        if let Some(items) = snapshot.accounts {
            self.data.accounts = items;
            replaced.push(CollectionKind::Accounts);
        }
        if let Some(items) = snapshot.classrooms {
            self.data.classrooms = items;
            replaced.push(CollectionKind::Classrooms);
        }
        if let Some(items) = snapshot.groups {
            self.data.groups = items;
            replaced.push(CollectionKind::Groups);
        }
        if let Some(items) = snapshot.posts {
            self.data.posts = items;
            replaced.push(CollectionKind::Posts);
        }
        if let Some(items) = snapshot.grade_records {
            self.data.grade_records = items;
            replaced.push(CollectionKind::GradeRecords);
        }
        if let Some(items) = snapshot.attendance_records {
            self.data.attendance_records = items;
            replaced.push(CollectionKind::AttendanceRecords);
        }
        if let Some(items) = snapshot.notifications {
            self.data.notifications = items;
            replaced.push(CollectionKind::Notifications);
        }

        for kind in &replaced {
            self.mark_dirty(*kind);
        }

        info!(
            "event=snapshot_import module=repo status=ok collections={} exported_at={}",
            replaced.len(),
            snapshot.exported_at.as_deref().unwrap_or("unknown")
        );
        self.persist_all();
        true
    }
}

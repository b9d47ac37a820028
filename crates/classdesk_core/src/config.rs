//! Repository configuration.
//!
//! # Responsibility
//! - Carry the storage namespace, auto-sync period and cleanup policy.
//! - Parse host-provided JSON config with per-field defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_NAMESPACE: &str = "classdesk";
pub const DEFAULT_AUTOSYNC_INTERVAL_SECS: u64 = 30;

/// How cleanup picks a replacement for a classroom's dangling `teacherRef`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", content = "accountId", rename_all = "snake_case")]
pub enum TeacherFallback {
    /// First teacher account in collection order.
    #[default]
    FirstTeacher,
    /// Last teacher account in collection order.
    LastTeacher,
    /// A specific teacher account; falls back to `FirstTeacher` when the
    /// id does not resolve to a teacher.
    Preferred(String),
    /// Never reassign; dangling refs are left for manual repair.
    Leave,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RepositoryConfig {
    /// Prefix of every storage key written by the repository.
    pub namespace: String,
    /// Period of the auto-sync timer; `0` disables auto-sync.
    pub autosync_interval_secs: u64,
    pub teacher_fallback: TeacherFallback,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            autosync_interval_secs: DEFAULT_AUTOSYNC_INTERVAL_SECS,
            teacher_fallback: TeacherFallback::default(),
        }
    }
}

impl RepositoryConfig {
    /// Parses a JSON config object; missing fields keep their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn autosync_interval(&self) -> Option<Duration> {
        (self.autosync_interval_secs > 0).then(|| Duration::from_secs(self.autosync_interval_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::{RepositoryConfig, TeacherFallback};
    use std::time::Duration;

    #[test]
    fn empty_object_yields_defaults() {
        let config = RepositoryConfig::from_json_str("{}").unwrap();
        assert_eq!(config, RepositoryConfig::default());
        assert_eq!(config.autosync_interval(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn parses_preferred_teacher_policy() {
        let config = RepositoryConfig::from_json_str(
            r#"{"namespace":"school-a","autosyncIntervalSecs":0,
                "teacherFallback":{"policy":"preferred","accountId":"t-9"}}"#,
        )
        .unwrap();
        assert_eq!(config.namespace, "school-a");
        assert_eq!(config.autosync_interval(), None);
        assert_eq!(
            config.teacher_fallback,
            TeacherFallback::Preferred("t-9".to_string())
        );
    }

    #[test]
    fn parses_unit_policy() {
        let config =
            RepositoryConfig::from_json_str(r#"{"teacherFallback":{"policy":"leave"}}"#).unwrap();
        assert_eq!(config.teacher_fallback, TeacherFallback::Leave);
    }
}

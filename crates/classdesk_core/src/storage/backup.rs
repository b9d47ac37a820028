//! Backup wrapper around a namespace export.
//!
//! Wire shape: `{ "timestamp": <RFC 3339>, "version": "1.0.0", "data": { ... } }`
//! where `data` maps un-prefixed namespace keys to their stored JSON values.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Format version written into backups and repository snapshots.
pub const BACKUP_FORMAT_VERSION: &str = "1.0.0";

/// Flat key -> value mapping of every key under one namespace.
pub type NamespaceSnapshot = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backup {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default = "default_version")]
    pub version: String,
    pub data: NamespaceSnapshot,
}

impl Backup {
    /// Wraps `data` with the current time and format version.
    pub fn new(data: NamespaceSnapshot) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            version: BACKUP_FORMAT_VERSION.to_string(),
            data,
        }
    }

    /// Parses and validates a backup wrapper.
    ///
    /// Returns `None` when the input is not JSON, lacks an object `data`
    /// field, or carries a format major version this build cannot read.
    pub fn parse(raw: &str) -> Option<Self> {
        let backup: Self = serde_json::from_str(raw).ok()?;
        if !is_supported_version(&backup.version) {
            return None;
        }
        Some(backup)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

fn default_version() -> String {
    BACKUP_FORMAT_VERSION.to_string()
}

/// Accepts any version sharing the current major component.
pub(crate) fn is_supported_version(version: &str) -> bool {
    let current_major = BACKUP_FORMAT_VERSION.split('.').next();
    version.split('.').next() == current_major
}

#[cfg(test)]
mod tests {
    use super::{is_supported_version, Backup};

    #[test]
    fn parse_rejects_wrapper_without_data() {
        assert!(Backup::parse(r#"{"bogus":true}"#).is_none());
        assert!(Backup::parse(r#"{"timestamp":"x","version":"1.0.0"}"#).is_none());
        assert!(Backup::parse("not json").is_none());
    }

    #[test]
    fn parse_rejects_non_object_data() {
        assert!(Backup::parse(r#"{"data":[1,2,3]}"#).is_none());
    }

    #[test]
    fn parse_accepts_minimal_wrapper() {
        let backup = Backup::parse(r#"{"data":{"accounts":[]}}"#).unwrap();
        assert_eq!(backup.version, "1.0.0");
        assert!(backup.data.contains_key("accounts"));
    }

    #[test]
    fn version_major_must_match() {
        assert!(is_supported_version("1.0.0"));
        assert!(is_supported_version("1.4.2"));
        assert!(!is_supported_version("2.0.0"));
    }
}

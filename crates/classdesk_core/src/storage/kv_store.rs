//! Namespaced JSON key-value store over two backend scopes.
//!
//! # Responsibility
//! - Serialize values with `serde_json` under `<namespace>:<key>`.
//! - Absorb backend failures: failed writes fall back to an in-memory
//!   overlay for that key and are recorded in `write_failures()`, one entry
//!   per scope and key until a write of that key succeeds.
//! - Export/import the durable namespace and wrap it as a `Backup`.
//!
//! # Invariants
//! - `clear` and `restore_backup` only touch keys under this namespace.
//! - `restore_backup` validates the wrapper before removing anything.
//! - Corrupt stored values read as absent.

use super::backup::{Backup, NamespaceSnapshot};
use super::{MemoryBackend, Scope, StorageBackend, StoreError};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;

static NAMESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("valid namespace regex"));

const PROBE_KEY: &str = "__availability_probe__";
const PROBE_VALUE: &str = "probe";

/// Latest rejected write of one key, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    pub scope: Scope,
    pub key: String,
    pub message: String,
    /// Consecutive rejected writes of this key.
    pub attempts: usize,
}

/// Namespaced store with a durable and a transient scope.
pub struct KeyValueStore {
    namespace: String,
    durable: Box<dyn StorageBackend>,
    transient: Box<dyn StorageBackend>,
    durable_overlay: BTreeMap<String, String>,
    transient_overlay: BTreeMap<String, String>,
    write_failures: BTreeMap<(Scope, String), WriteFailure>,
}

impl KeyValueStore {
    /// Creates a store writing under `namespace` into the given backends.
    ///
    /// # Errors
    /// - `StoreError::InvalidNamespace` when `namespace` is empty or contains
    ///   characters outside `[A-Za-z0-9_.-]`.
    pub fn new<D, T>(
        namespace: impl Into<String>,
        durable: D,
        transient: T,
    ) -> Result<Self, StoreError>
    where
        D: StorageBackend + 'static,
        T: StorageBackend + 'static,
    {
        let namespace = namespace.into();
        if !NAMESPACE_RE.is_match(&namespace) {
            return Err(StoreError::InvalidNamespace(namespace));
        }

        Ok(Self {
            namespace,
            durable: Box::new(durable),
            transient: Box::new(transient),
            durable_overlay: BTreeMap::new(),
            transient_overlay: BTreeMap::new(),
            write_failures: BTreeMap::new(),
        })
    }

    /// Creates a store with in-memory backends for both scopes.
    pub fn in_memory(namespace: impl Into<String>) -> Result<Self, StoreError> {
        Self::new(namespace, MemoryBackend::new(), MemoryBackend::new())
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Serializes `value` and writes it under `key`.
    ///
    /// Returns `true` when the backend accepted the write. On `false` the
    /// value is still readable through `get` for the lifetime of this store.
    pub fn set<T>(&mut self, scope: Scope, key: &str, value: &T) -> bool
    where
        T: Serialize + ?Sized,
    {
        match serde_json::to_string(value) {
            Ok(serialized) => self.set_raw(scope, key, serialized),
            Err(err) => {
                warn!(
                    "event=storage_write module=storage status=error scope={} key={} error_code=serialize_failed error={}",
                    scope.as_str(),
                    key,
                    err
                );
                self.record_failure(scope, key, format!("serialization failed: {err}"));
                false
            }
        }
    }

    /// Writes an already-serialized string under `key`.
    pub fn set_raw(&mut self, scope: Scope, key: &str, serialized: String) -> bool {
        let full_key = self.full_key(key);
        match self.backend_mut(scope).set_item(&full_key, &serialized) {
            Ok(()) => {
                self.overlay_mut(scope).remove(&full_key);
                self.write_failures.remove(&(scope, key.to_string()));
                true
            }
            Err(err) => {
                warn!(
                    "event=storage_write module=storage status=degraded scope={} key={} bytes={} error={}",
                    scope.as_str(),
                    key,
                    serialized.len(),
                    err
                );
                self.record_failure(scope, key, err.to_string());
                self.overlay_mut(scope).insert(full_key, serialized);
                false
            }
        }
    }

    /// Reads and deserializes `key`; absent or corrupt entries yield `None`.
    pub fn get<T>(&self, scope: Scope, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let raw = self.get_raw(scope, key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(
                    "event=storage_read module=storage status=corrupt scope={} key={} error={}",
                    scope.as_str(),
                    key,
                    err
                );
                None
            }
        }
    }

    pub fn get_or<T>(&self, scope: Scope, key: &str, default: T) -> T
    where
        T: DeserializeOwned,
    {
        self.get(scope, key).unwrap_or(default)
    }

    /// Returns the stored string for `key`, preferring a degraded overlay entry.
    pub fn get_raw(&self, scope: Scope, key: &str) -> Option<String> {
        let full_key = self.full_key(key);
        if let Some(value) = self.overlay(scope).get(&full_key) {
            return Some(value.clone());
        }

        match self.backend(scope).get_item(&full_key) {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    "event=storage_read module=storage status=error scope={} key={} error={}",
                    scope.as_str(),
                    key,
                    err
                );
                None
            }
        }
    }

    /// Removes `key`; returns `false` when the backend refused the delete.
    pub fn remove(&mut self, scope: Scope, key: &str) -> bool {
        let full_key = self.full_key(key);
        self.overlay_mut(scope).remove(&full_key);
        self.write_failures.remove(&(scope, key.to_string()));
        match self.backend_mut(scope).remove_item(&full_key) {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    "event=storage_remove module=storage status=error scope={} key={} error={}",
                    scope.as_str(),
                    key,
                    err
                );
                false
            }
        }
    }

    /// Removes every key under this namespace in `scope`.
    ///
    /// Returns the number of keys removed. Keys of other namespaces are kept.
    pub fn clear(&mut self, scope: Scope) -> usize {
        let keys = self.keys(scope);
        self.overlay_mut(scope).clear();
        self.write_failures.retain(|(failed_scope, _), _| *failed_scope != scope);

        let mut removed = 0;
        for key in &keys {
            let full_key = self.full_key(key);
            match self.backend_mut(scope).remove_item(&full_key) {
                Ok(()) => removed += 1,
                Err(err) => warn!(
                    "event=storage_clear module=storage status=error scope={} key={} error={}",
                    scope.as_str(),
                    key,
                    err
                ),
            }
        }

        info!(
            "event=storage_clear module=storage status=ok scope={} removed={}",
            scope.as_str(),
            removed
        );
        removed
    }

    /// Lists un-prefixed keys under this namespace, overlay entries included.
    pub fn keys(&self, scope: Scope) -> Vec<String> {
        let prefix = self.prefix();
        let mut keys = match self.backend(scope).namespace_keys(&self.namespace) {
            Ok(keys) => keys,
            Err(err) => {
                warn!(
                    "event=storage_keys module=storage status=error scope={} error={}",
                    scope.as_str(),
                    err
                );
                Vec::new()
            }
        };
        keys.extend(self.overlay(scope).keys().cloned());
        keys.sort();
        keys.dedup();

        keys.into_iter()
            .filter_map(|key| key.strip_prefix(&prefix).map(str::to_string))
            .filter(|key| key != PROBE_KEY)
            .collect()
    }

    /// Probes writability with a throwaway write and delete.
    pub fn is_available(&mut self, scope: Scope) -> bool {
        let full_key = self.full_key(PROBE_KEY);
        let backend = self.backend_mut(scope);
        let available = backend.set_item(&full_key, PROBE_VALUE).is_ok()
            && backend.remove_item(&full_key).is_ok();
        debug!(
            "event=storage_probe module=storage status=ok scope={} available={}",
            scope.as_str(),
            available
        );
        available
    }

    /// Sums the byte length of every stored value under this namespace.
    pub fn size_bytes(&self, scope: Scope) -> usize {
        self.keys(scope)
            .iter()
            .filter_map(|key| self.get_raw(scope, key))
            .map(|value| value.len())
            .sum()
    }

    /// Keys currently held only in memory because their write failed.
    pub fn degraded_keys(&self, scope: Scope) -> Vec<String> {
        let prefix = self.prefix();
        self.overlay(scope)
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    /// Keys whose latest write was rejected, ordered by scope and key.
    pub fn write_failures(&self) -> Vec<&WriteFailure> {
        self.write_failures.values().collect()
    }

    /// Collects every durable key under this namespace.
    ///
    /// Values that are not valid JSON are exported as JSON strings.
    pub fn export_namespace(&self) -> NamespaceSnapshot {
        self.keys(Scope::Durable)
            .into_iter()
            .filter_map(|key| {
                let raw = self.get_raw(Scope::Durable, &key)?;
                let value = serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw));
                Some((key, value))
            })
            .collect()
    }

    /// Writes every entry of `snapshot` into the durable scope.
    ///
    /// Keys may be given with or without the namespace prefix. Keys not in
    /// the snapshot are left untouched. Returns `true` when every write
    /// reached the backend.
    pub fn import_namespace(&mut self, snapshot: &NamespaceSnapshot) -> bool {
        let prefix = self.prefix();
        let mut all_written = true;
        for (key, value) in snapshot {
            let key = key.strip_prefix(&prefix).unwrap_or(key);
            all_written &= self.set(Scope::Durable, key, value);
        }

        info!(
            "event=namespace_import module=storage status={} keys={}",
            if all_written { "ok" } else { "degraded" },
            snapshot.len()
        );
        all_written
    }

    pub fn create_backup(&self) -> Backup {
        Backup::new(self.export_namespace())
    }

    /// Restores a backup produced by `create_backup`.
    ///
    /// A malformed wrapper returns `false` and leaves storage untouched.
    /// Otherwise the durable namespace is cleared before `data` is written.
    pub fn restore_backup(&mut self, raw: &str) -> bool {
        match Backup::parse(raw) {
            Some(backup) => self.restore_backup_value(&backup),
            None => {
                warn!("event=backup_restore module=storage status=rejected reason=malformed_backup");
                false
            }
        }
    }

    pub fn restore_backup_value(&mut self, backup: &Backup) -> bool {
        if !super::backup::is_supported_version(&backup.version) {
            warn!(
                "event=backup_restore module=storage status=rejected reason=unsupported_version version={}",
                backup.version
            );
            return false;
        }

        let cleared = self.clear(Scope::Durable);
        let restored = self.import_namespace(&backup.data);
        info!(
            "event=backup_restore module=storage status={} cleared={} keys={} backup_timestamp={}",
            if restored { "ok" } else { "degraded" },
            cleared,
            backup.data.len(),
            backup.timestamp
        );
        restored
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}:{key}", self.namespace)
    }

    fn prefix(&self) -> String {
        format!("{}:", self.namespace)
    }

    fn record_failure(&mut self, scope: Scope, key: &str, message: String) {
        let failure = self
            .write_failures
            .entry((scope, key.to_string()))
            .or_insert_with(|| WriteFailure {
                scope,
                key: key.to_string(),
                message: String::new(),
                attempts: 0,
            });
        failure.message = message;
        failure.attempts += 1;
    }

    fn backend(&self, scope: Scope) -> &dyn StorageBackend {
        match scope {
            Scope::Durable => self.durable.as_ref(),
            Scope::Transient => self.transient.as_ref(),
        }
    }

    fn backend_mut(&mut self, scope: Scope) -> &mut dyn StorageBackend {
        match scope {
            Scope::Durable => self.durable.as_mut(),
            Scope::Transient => self.transient.as_mut(),
        }
    }

    fn overlay(&self, scope: Scope) -> &BTreeMap<String, String> {
        match scope {
            Scope::Durable => &self.durable_overlay,
            Scope::Transient => &self.transient_overlay,
        }
    }

    fn overlay_mut(&mut self, scope: Scope) -> &mut BTreeMap<String, String> {
        match scope {
            Scope::Durable => &mut self.durable_overlay,
            Scope::Transient => &mut self.transient_overlay,
        }
    }
}

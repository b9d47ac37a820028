//! Repository core: load, views, mutations, persistence and lifecycle.

use super::autosync::{AutoSyncTimer, Clock, SystemClock};
use super::{RepoError, RepoResult};
use crate::config::RepositoryConfig;
use crate::model::{
    now, Account, AttendanceRecord, Classroom, CollectionKind, Dataset, Entity, GradeRecord, Group,
    Notification, Post, Timestamp,
};
use crate::storage::{Backup, KeyValueStore, MemoryBackend, Scope, SqliteBackend};
use log::{debug, info, warn};
use std::path::Path;
use std::time::Instant;

/// Transient-scope key holding the time of the last complete persist.
pub(crate) const LAST_PERSISTED_KEY: &str = "lastPersistedAt";

/// Load/persist state of one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionState {
    /// Repository construction has not completed.
    Unloaded,
    /// In memory, with changes not yet written (or loaded and never written).
    Loaded,
    /// In memory and identical to the last successful durable write.
    Persisted,
}

/// Outcome of `persist_all`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistReport {
    pub written: Vec<CollectionKind>,
    pub failed: Vec<CollectionKind>,
}

impl PersistReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Owner of the seven collections and their durable persistence.
pub struct Repository {
    pub(super) store: KeyValueStore,
    pub(super) config: RepositoryConfig,
    pub(super) defaults: Dataset,
    pub(super) data: Dataset,
    states: [CollectionState; 7],
    initialized: bool,
    clock: Box<dyn Clock>,
    autosync: AutoSyncTimer,
}

impl Repository {
    /// Loads every collection from `store`, falling back to `defaults`, and
    /// starts auto-sync.
    pub fn open(store: KeyValueStore, config: RepositoryConfig, defaults: Dataset) -> Self {
        Self::open_with_clock(store, config, defaults, SystemClock::default())
    }

    /// Same as `open` with an injected time source for the auto-sync timer.
    pub fn open_with_clock<C>(
        store: KeyValueStore,
        config: RepositoryConfig,
        defaults: Dataset,
        clock: C,
    ) -> Self
    where
        C: Clock + 'static,
    {
        let mut repo = Self {
            store,
            config,
            defaults,
            data: Dataset::default(),
            states: [CollectionState::Unloaded; 7],
            initialized: false,
            clock: Box::new(clock),
            autosync: AutoSyncTimer::new(),
        };
        repo.initialize();
        repo
    }

    /// Opens a repository whose durable scope is the SQLite file at `path`.
    ///
    /// The transient scope lives in memory for the lifetime of the process.
    pub fn open_sqlite(path: impl AsRef<Path>, config: RepositoryConfig) -> RepoResult<Self> {
        let store = KeyValueStore::new(
            config.namespace.clone(),
            SqliteBackend::open(path)?,
            MemoryBackend::new(),
        )?;
        Ok(Self::open(store, config, Dataset::seed()))
    }

    /// Opens a repository with both scopes held in memory.
    pub fn in_memory(config: RepositoryConfig, defaults: Dataset) -> RepoResult<Self> {
        let store = KeyValueStore::in_memory(config.namespace.clone())?;
        Ok(Self::open(store, config, defaults))
    }

    /// Loads all collections and starts auto-sync; no-op once initialized.
    pub fn initialize(&mut self) {
        if self.initialized {
            debug!("event=repo_init module=repo status=skipped reason=already_initialized");
            return;
        }

        let started_at = Instant::now();
        let fallbacks = self.load_all();
        self.initialized = true;
        self.start();

        info!(
            "event=repo_init module=repo status=ok namespace={} fallbacks={} duration_ms={}",
            self.store.namespace(),
            fallbacks.len(),
            started_at.elapsed().as_millis()
        );
    }

    /// Re-reads every collection from the durable scope.
    ///
    /// Returns the collections that fell back to defaults.
    fn load_all(&mut self) -> Vec<CollectionKind> {
        let mut fallbacks = Vec::new();
        self.data.accounts = self.load_collection::<Account>(&mut fallbacks);
        self.data.classrooms = self.load_collection::<Classroom>(&mut fallbacks);
        self.data.groups = self.load_collection::<Group>(&mut fallbacks);
        self.data.posts = self.load_collection::<Post>(&mut fallbacks);
        self.data.grade_records = self.load_collection::<GradeRecord>(&mut fallbacks);
        self.data.attendance_records = self.load_collection::<AttendanceRecord>(&mut fallbacks);
        self.data.notifications = self.load_collection::<Notification>(&mut fallbacks);
        self.states = [CollectionState::Loaded; 7];
        fallbacks
    }

    fn load_collection<E: Entity>(&self, fallbacks: &mut Vec<CollectionKind>) -> Vec<E> {
        let key = E::KIND.storage_key();
        match self.store.get::<Vec<E>>(Scope::Durable, key) {
            Some(items) => items,
            None => {
                info!("event=collection_load module=repo status=fallback collection={key}");
                fallbacks.push(E::KIND);
                E::collection(&self.defaults).clone()
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Read-only access to the underlying store.
    pub fn store(&self) -> &KeyValueStore {
        &self.store
    }

    pub fn dataset(&self) -> &Dataset {
        &self.data
    }

    pub fn collection_state(&self, kind: CollectionKind) -> CollectionState {
        self.states[kind.index()]
    }

    /// Immutable view of one collection, in insertion order.
    pub fn all<E: Entity>(&self) -> &[E] {
        E::collection(&self.data)
    }

    /// Primary-key lookup.
    pub fn get<E: Entity>(&self, id: &str) -> Option<&E> {
        self.all::<E>().iter().find(|entity| entity.id() == id)
    }

    /// Appends `entity` to its collection.
    ///
    /// # Errors
    /// - `RepoError::EmptyId` for a blank id.
    /// - `RepoError::DuplicateId` when the id already exists.
    pub fn insert<E: Entity>(&mut self, entity: E) -> RepoResult<()> {
        if entity.id().trim().is_empty() {
            return Err(RepoError::EmptyId(E::KIND));
        }
        if self.get::<E>(entity.id()).is_some() {
            return Err(RepoError::DuplicateId {
                kind: E::KIND,
                id: entity.id().to_string(),
            });
        }

        E::collection_mut(&mut self.data).push(entity);
        self.mark_dirty(E::KIND);
        Ok(())
    }

    /// Applies `change` to the entity with `id` and bumps its `updatedAt`.
    ///
    /// `change` must not alter the id; id conflicts introduced that way are
    /// reported by `validate()` and removed by `cleanup()`.
    pub fn update<E, F>(&mut self, id: &str, change: F) -> RepoResult<()>
    where
        E: Entity,
        F: FnOnce(&mut E),
    {
        let entity = E::collection_mut(&mut self.data)
            .iter_mut()
            .find(|entity| entity.id() == id)
            .ok_or_else(|| RepoError::NotFound {
                kind: E::KIND,
                id: id.to_string(),
            })?;

        change(entity);
        entity.touch(now());
        self.mark_dirty(E::KIND);
        Ok(())
    }

    /// Removes and returns the entity with `id`.
    pub fn remove<E: Entity>(&mut self, id: &str) -> RepoResult<E> {
        let items = E::collection_mut(&mut self.data);
        let index = items
            .iter()
            .position(|entity| entity.id() == id)
            .ok_or_else(|| RepoError::NotFound {
                kind: E::KIND,
                id: id.to_string(),
            })?;

        let removed = items.remove(index);
        self.mark_dirty(E::KIND);
        Ok(removed)
    }

    /// Writes all seven collections to the durable scope.
    ///
    /// A failed collection write is logged and skipped; the remaining
    /// collections are still written.
    pub fn persist_all(&mut self) -> PersistReport {
        let started_at = Instant::now();
        let mut report = PersistReport::default();

        for kind in CollectionKind::ALL {
            if self.persist_kind(kind) {
                self.states[kind.index()] = CollectionState::Persisted;
                report.written.push(kind);
            } else {
                warn!(
                    "event=collection_persist module=repo status=error collection={}",
                    kind.storage_key()
                );
                self.states[kind.index()] = CollectionState::Loaded;
                report.failed.push(kind);
            }
        }

        if report.is_complete() {
            self.store.set(Scope::Transient, LAST_PERSISTED_KEY, &now());
        }

        info!(
            "event=repo_persist module=repo status={} written={} failed={} duration_ms={}",
            if report.is_complete() { "ok" } else { "partial" },
            report.written.len(),
            report.failed.len(),
            started_at.elapsed().as_millis()
        );
        report
    }

    fn persist_kind(&mut self, kind: CollectionKind) -> bool {
        let key = kind.storage_key();
        let data = &self.data;
        let store = &mut self.store;
        match kind {
            CollectionKind::Accounts => store.set(Scope::Durable, key, &data.accounts),
            CollectionKind::Classrooms => store.set(Scope::Durable, key, &data.classrooms),
            CollectionKind::Groups => store.set(Scope::Durable, key, &data.groups),
            CollectionKind::Posts => store.set(Scope::Durable, key, &data.posts),
            CollectionKind::GradeRecords => store.set(Scope::Durable, key, &data.grade_records),
            CollectionKind::AttendanceRecords => {
                store.set(Scope::Durable, key, &data.attendance_records)
            }
            CollectionKind::Notifications => store.set(Scope::Durable, key, &data.notifications),
        }
    }

    /// Time of the last complete `persist_all` in this session.
    pub fn last_persisted_at(&self) -> Option<Timestamp> {
        self.store.get(Scope::Transient, LAST_PERSISTED_KEY)
    }

    /// Flushes every collection, then wraps the durable namespace in a backup.
    pub fn create_backup(&mut self) -> Backup {
        self.persist_all();
        self.store.create_backup()
    }

    /// Restores a namespace backup and reloads every collection from it.
    ///
    /// A malformed backup returns `false` and changes neither storage nor
    /// the in-memory collections.
    pub fn restore_backup(&mut self, raw: &str) -> bool {
        if !self.store.restore_backup(raw) {
            return false;
        }

        let fallbacks = self.load_all();
        info!(
            "event=repo_restore module=repo status=ok fallbacks={}",
            fallbacks.len()
        );
        true
    }

    /// Replaces every collection with the compiled defaults and persists.
    pub fn reset_to_defaults(&mut self) -> PersistReport {
        self.data = self.defaults.clone();
        self.states = [CollectionState::Loaded; 7];
        info!("event=repo_reset module=repo status=ok");
        self.persist_all()
    }

    /// Arms the auto-sync timer using the configured period.
    pub fn start(&mut self) {
        match self.config.autosync_interval() {
            Some(period) => {
                self.autosync.start(self.clock.now(), period);
                debug!(
                    "event=autosync_start module=repo status=ok period_secs={}",
                    period.as_secs()
                );
            }
            None => debug!("event=autosync_start module=repo status=skipped reason=disabled"),
        }
    }

    pub fn stop(&mut self) {
        self.autosync.stop();
        debug!("event=autosync_stop module=repo status=ok");
    }

    pub fn is_autosync_running(&self) -> bool {
        self.autosync.is_running()
    }

    /// Polls the auto-sync timer; persists when a period has elapsed.
    ///
    /// Hosts call this from their event loop between other operations.
    pub fn tick(&mut self) -> Option<PersistReport> {
        if self.autosync.poll(self.clock.now()) {
            Some(self.persist_all())
        } else {
            None
        }
    }

    /// Forced persist for host shutdown or visibility-loss hooks.
    pub fn flush(&mut self) -> PersistReport {
        self.persist_all()
    }

    /// Stops auto-sync, persists once more and hands back the store.
    pub fn destroy(mut self) -> KeyValueStore {
        self.stop();
        let report = self.persist_all();
        info!(
            "event=repo_destroy module=repo status={}",
            if report.is_complete() { "ok" } else { "partial" }
        );
        self.store
    }

    pub(super) fn mark_dirty(&mut self, kind: CollectionKind) {
        self.states[kind.index()] = CollectionState::Loaded;
    }
}

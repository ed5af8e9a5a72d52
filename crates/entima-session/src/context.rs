//! The persistence context: lifecycle state machine and flush engine.
//!
//! Per identity, a session knows four states: *transient* (never tracked),
//! *managed* (in the identity map, no pending delete), *removed* (pending
//! delete, excluded from lookups), and *gone* (evicted after a flushed
//! delete, identity tombstoned). `find`, `persist`, and `remove` move
//! identities between states; `flush` reflects the accumulated intent to
//! storage as insert, then update, then delete statements.

use crate::identity_map::{IdentityMap, RecordState};
use crate::snapshot::SnapshotStore;
use crate::{EntityKey, EntityState, idgen};
use entima_core::{
    Assoc, Entity, EntityMeta, EntityRef, Error, IdStrategy, Result, RowExecutor, Value,
    mapped_values,
};
use entima_sql::{delete_by_id, insert_statement, select_by_column, select_by_id, update_by_id};
use std::collections::HashSet;
use std::sync::{Arc, RwLock};

const LOCK_POISONED: &str = "entity lock poisoned";

/// Behavior switches for a session.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Flush pending writes before a `find` that misses the identity map.
    /// Off by default so statement order stays exactly as scheduled.
    pub auto_flush: bool,
}

/// A scheduled insert, queued until the next flush.
///
/// Fresh instances are not identity-mapped before their INSERT runs: a
/// managed record exists only for identities that were loaded or successfully
/// inserted, and a database-assigned identifier does not exist yet.
struct ScheduledInsert<X: RowExecutor> {
    table: &'static str,
    run: Box<dyn FnOnce(&mut X, &mut IdentityMap, &mut SnapshotStore) -> Result<EntityKey> + Send>,
}

/// The session engine.
///
/// Owns the identity map, snapshot store, and tombstone set for one session,
/// and drives the statement builder and row executor at flush time. Single
/// logical thread of control; operations block on the executor.
pub struct PersistenceContext<X: RowExecutor> {
    executor: X,
    identity: IdentityMap,
    snapshots: SnapshotStore,
    scheduled_inserts: Vec<ScheduledInsert<X>>,
    config: SessionConfig,
}

impl<X: RowExecutor> PersistenceContext<X> {
    /// Create a context with default configuration.
    pub fn new(executor: X) -> Self {
        Self::with_config(executor, SessionConfig::default())
    }

    /// Create a context with explicit configuration.
    pub fn with_config(executor: X, config: SessionConfig) -> Self {
        Self {
            executor,
            identity: IdentityMap::new(),
            snapshots: SnapshotStore::new(),
            scheduled_inserts: Vec::new(),
            config,
        }
    }

    /// The session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Borrow the row executor.
    pub fn executor(&self) -> &X {
        &self.executor
    }

    /// Borrow the row executor mutably.
    pub fn executor_mut(&mut self) -> &mut X {
        &mut self.executor
    }

    /// Consume the context, returning the row executor.
    pub fn into_executor(self) -> X {
        self.executor
    }

    /// Look an entity up by identifier.
    ///
    /// A managed identity is answered from the identity map without a query,
    /// and every lookup returns the same shared handle. Identities pending
    /// delete, or deleted earlier in this session, are answered "not found"
    /// without a query. Everything else is a SELECT by identifier; a row
    /// becomes a managed record with a fresh snapshot.
    pub fn find<E: Entity>(&mut self, id: impl Into<Value>) -> Result<Option<EntityRef<E>>> {
        let meta = E::meta();
        meta.validate()?;
        let id = id.into();
        if id.is_null() {
            return Ok(None);
        }
        let key = EntityKey::from_id::<E>(&id);

        if let Some(found) = self.lookup_tracked::<E>(&key, meta, &id)? {
            return Ok(found);
        }

        if self.config.auto_flush {
            self.flush()?;
            if let Some(found) = self.lookup_tracked::<E>(&key, meta, &id)? {
                return Ok(found);
            }
        }

        let stmt = select_by_id(meta, &id)?;
        tracing::debug!(sql = %stmt.sql, "loading entity");
        let rows = self
            .executor
            .query(&stmt.sql, &stmt.params)
            .map_err(|e| e.with_sql(&stmt.sql))?;
        let Some(row) = rows.first() else {
            return Ok(None);
        };

        let entity = E::from_row(row)?;
        let values = mapped_values(&entity);
        let handle = self.identity.attach(id, Arc::new(RwLock::new(entity)));
        self.snapshots.record(key, &values);
        Ok(Some(handle))
    }

    /// Consult session-local knowledge of an identity.
    ///
    /// `Some(answer)` means the lookup is settled without a query; `None`
    /// means storage must be consulted.
    #[allow(clippy::type_complexity)]
    fn lookup_tracked<E: Entity>(
        &self,
        key: &EntityKey,
        meta: &'static EntityMeta,
        id: &Value,
    ) -> Result<Option<Option<EntityRef<E>>>> {
        match self.identity.state(key) {
            Some(RecordState::Managed) => {
                tracing::trace!(table = meta.table, %id, "identity map hit");
                let handle = self.identity.get::<E>(key).ok_or_else(|| {
                    Error::validation(meta.table, "identity map entry has unexpected type")
                })?;
                Ok(Some(Some(handle)))
            }
            Some(RecordState::Removed) => Ok(Some(None)),
            None if self.identity.is_tombstoned(key) => Ok(Some(None)),
            None => Ok(None),
        }
    }

    /// Hand an instance to the session.
    ///
    /// An unseen identity (or an instance with no identifier) is scheduled
    /// for insert. A managed identity absorbs the incoming mapped values into
    /// its tracked instance, which may make it dirty for the next flush; an
    /// identity pending delete is restored to managed the same way. An
    /// identity deleted earlier in this session is rejected.
    pub fn persist<E: Entity>(&mut self, entity: E) -> Result<EntityRef<E>> {
        let meta = E::meta();
        meta.validate()?;
        let id = entity.id_value();
        if meta.id_strategy == IdStrategy::ClientAssigned {
            idgen::require_client_id(meta, &id)?;
        }

        if !id.is_null() {
            let key = EntityKey::from_id::<E>(&id);
            match self.identity.state(&key) {
                Some(RecordState::Managed) => {
                    return self.merge_into_tracked(&key, meta, &id, &entity);
                }
                Some(RecordState::Removed) => {
                    self.identity.restore_managed(&key);
                    tracing::debug!(table = meta.table, %id, "withdrew pending delete");
                    return self.merge_into_tracked(&key, meta, &id, &entity);
                }
                None => {
                    if self.identity.is_tombstoned(&key) {
                        return Err(Error::tombstoned(meta.table, id));
                    }
                }
            }
        }

        let handle: EntityRef<E> = Arc::new(RwLock::new(entity));
        self.schedule_insert(meta, Arc::clone(&handle));
        Ok(handle)
    }

    /// Copy the incoming instance's mapped values into the tracked instance.
    fn merge_into_tracked<E: Entity>(
        &mut self,
        key: &EntityKey,
        meta: &'static EntityMeta,
        id: &Value,
        incoming: &E,
    ) -> Result<EntityRef<E>> {
        let handle = self.identity.get::<E>(key).ok_or_else(|| {
            Error::validation(meta.table, "identity map entry has unexpected type")
        })?;
        handle
            .write()
            .expect(LOCK_POISONED)
            .copy_mapped_from(incoming);
        tracing::debug!(table = meta.table, %id, "merged state into managed instance");
        Ok(handle)
    }

    /// Queue an insert for the next flush.
    fn schedule_insert<E: Entity>(&mut self, meta: &'static EntityMeta, handle: EntityRef<E>) {
        tracing::debug!(table = meta.table, "scheduled insert");
        let run = Box::new(
            move |executor: &mut X, identity: &mut IdentityMap, snapshots: &mut SnapshotStore| {
                let (row, supplied) = {
                    let guard = handle.read().expect(LOCK_POISONED);
                    (guard.to_row(), guard.id_value())
                };

                let stmt = insert_statement(meta, &row)?;
                tracing::debug!(sql = %stmt.sql, "executing insert");
                let outcome = executor
                    .insert(&stmt.sql, &stmt.params)
                    .map_err(|e| e.with_sql(&stmt.sql))?;
                let id = idgen::resolve_insert_id(meta, supplied, &outcome)?;
                handle
                    .write()
                    .expect(LOCK_POISONED)
                    .set_id_value(id.clone());

                // Snapshot from the stored row, not the instance: defaults and
                // generated columns make the row the ground truth that future
                // dirty checks must compare against.
                let reread = select_by_id(meta, &id)?;
                tracing::debug!(sql = %reread.sql, "re-reading inserted row");
                let rows = executor
                    .query(&reread.sql, &reread.params)
                    .map_err(|e| e.with_sql(&reread.sql))?;
                let Some(stored) = rows.first() else {
                    return Err(Error::row_vanished(meta.table, id));
                };
                let snapshot: Vec<Value> = meta
                    .columns
                    .iter()
                    .map(|c| stored.value(c.column).cloned().unwrap_or(Value::Null))
                    .collect();

                let key = EntityKey::from_id::<E>(&id);
                identity.attach(id, handle);
                snapshots.record(key, &snapshot);
                Ok(key)
            },
        );
        self.scheduled_inserts.push(ScheduledInsert {
            table: meta.table,
            run,
        });
    }

    /// Schedule a managed instance for deletion.
    ///
    /// Idempotent: removing an identity that is already pending delete, or
    /// was never tracked, does nothing.
    pub fn remove<E: Entity>(&mut self, handle: &EntityRef<E>) -> Result<()> {
        let meta = E::meta();
        meta.validate()?;
        let id = handle.read().expect(LOCK_POISONED).id_value();
        if id.is_null() {
            return Ok(());
        }
        let key = EntityKey::from_id::<E>(&id);
        if self.identity.mark_removed(&key) {
            tracing::debug!(table = meta.table, %id, "scheduled delete");
        }
        Ok(())
    }

    /// Reflect all pending intent to storage.
    ///
    /// Statement order within one flush is fixed: scheduled inserts (each
    /// followed by its re-read), then an UPDATE for every managed record
    /// whose mapped values drifted from their snapshot, then a DELETE for
    /// every record pending removal. The first executor failure aborts the
    /// remainder of the flush; nothing is retried or rolled back here.
    pub fn flush(&mut self) -> Result<()> {
        let scheduled = std::mem::take(&mut self.scheduled_inserts);
        let mut inserted_now: HashSet<EntityKey> = HashSet::new();
        let mut queue = scheduled.into_iter();
        while let Some(insert) = queue.next() {
            tracing::trace!(table = insert.table, "flushing insert");
            match (insert.run)(&mut self.executor, &mut self.identity, &mut self.snapshots) {
                Ok(key) => {
                    inserted_now.insert(key);
                }
                Err(e) => {
                    // The failing insert is consumed; inserts that never ran
                    // stay scheduled for a later flush.
                    self.scheduled_inserts = queue.collect();
                    return Err(e);
                }
            }
        }

        for key in self.identity.managed_keys() {
            // Records registered by this flush's inserts already carry a
            // stored-row snapshot; comparing them against the instance here
            // would write the instance's values over freshly read defaults.
            if inserted_now.contains(&key) {
                continue;
            }
            let Some(row) = self.identity.current_values(&key) else {
                continue;
            };
            let values: Vec<Value> = row.iter().map(|(_, v)| v.clone()).collect();
            if !self.snapshots.is_dirty(&key, &values) {
                continue;
            }
            let (meta, id) = self.record_target(&key)?;
            let stmt = update_by_id(meta, &row, &id)?;
            tracing::debug!(sql = %stmt.sql, "executing update");
            let affected = self
                .executor
                .execute(&stmt.sql, &stmt.params)
                .map_err(|e| e.with_sql(&stmt.sql))?;
            if affected == 0 {
                return Err(Error::row_vanished(meta.table, id));
            }
            self.snapshots.record(key, &values);
        }

        for key in self.identity.removed_keys() {
            let (meta, id) = self.record_target(&key)?;
            let stmt = delete_by_id(meta, &id)?;
            tracing::debug!(sql = %stmt.sql, "executing delete");
            let affected = self
                .executor
                .execute(&stmt.sql, &stmt.params)
                .map_err(|e| e.with_sql(&stmt.sql))?;
            if affected == 0 {
                return Err(Error::row_vanished(meta.table, id));
            }
            self.identity.evict(&key);
            self.snapshots.remove(&key);
            self.identity.add_tombstone(key);
            tracing::debug!(table = meta.table, %id, "identity tombstoned");
        }

        Ok(())
    }

    fn record_target(&self, key: &EntityKey) -> Result<(&'static EntityMeta, Value)> {
        let meta = self
            .identity
            .meta_of(key)
            .ok_or_else(|| Error::validation("session", "tracked record disappeared mid-flush"))?;
        let id = self
            .identity
            .id_of(key)
            .cloned()
            .ok_or_else(|| Error::validation(meta.table, "tracked record has no identifier"))?;
        Ok((meta, id))
    }

    /// Evict every tracked record and discard all pending intent.
    ///
    /// Scheduled inserts, updates, and deletes are dropped silently. The
    /// tombstone set survives for the rest of the session.
    pub fn clear(&mut self) {
        let dropped = self.scheduled_inserts.len() + self.identity.len();
        self.scheduled_inserts.clear();
        self.identity.clear_tracked();
        self.snapshots.clear();
        tracing::debug!(dropped, "persistence context cleared");
    }

    /// Re-read a managed instance from storage, overwriting its mapped
    /// fields and snapshot.
    pub fn refresh<E: Entity>(&mut self, handle: &EntityRef<E>) -> Result<()> {
        let meta = E::meta();
        meta.validate()?;
        let id = handle.read().expect(LOCK_POISONED).id_value();
        let key = EntityKey::from_id::<E>(&id);
        if id.is_null() || self.identity.state(&key) != Some(RecordState::Managed) {
            return Err(Error::validation(
                meta.table,
                "refresh requires a managed instance",
            ));
        }

        let stmt = select_by_id(meta, &id)?;
        tracing::debug!(sql = %stmt.sql, "refreshing entity");
        let rows = self
            .executor
            .query(&stmt.sql, &stmt.params)
            .map_err(|e| e.with_sql(&stmt.sql))?;
        let Some(row) = rows.first() else {
            return Err(Error::not_found(meta.table, id));
        };

        let fresh = E::from_row(row)?;
        let values = {
            let mut guard = handle.write().expect(LOCK_POISONED);
            guard.copy_mapped_from(&fresh);
            mapped_values(&*guard)
        };
        self.snapshots.record(key, &values);
        Ok(())
    }

    /// Resolve a lazy association on a managed owning instance.
    ///
    /// The first access queries the target table by the association's
    /// foreign-key column, registers each row exactly as `find` would, and
    /// caches the handle sequence on the owner. Later accesses return the
    /// cache without querying. Rows whose identity is pending delete or
    /// tombstoned in this session are skipped.
    pub fn load_many<P, C, F>(&mut self, owner: &EntityRef<P>, accessor: F) -> Result<Vec<EntityRef<C>>>
    where
        P: Entity,
        C: Entity,
        F: Fn(&P) -> &Assoc<C>,
    {
        let owner_meta = P::meta();
        owner_meta.validate()?;
        let child_meta = C::meta();
        child_meta.validate()?;

        let (owner_id, fk_column, cached) = {
            let guard = owner.read().expect(LOCK_POISONED);
            let assoc = accessor(&guard);
            (
                guard.id_value(),
                assoc.fk_column(),
                assoc.get().map(<[EntityRef<C>]>::to_vec),
            )
        };
        if let Some(handles) = cached {
            tracing::trace!(table = child_meta.table, "association cache hit");
            return Ok(handles);
        }

        let owner_key = EntityKey::from_id::<P>(&owner_id);
        if owner_id.is_null() || self.identity.state(&owner_key) != Some(RecordState::Managed) {
            return Err(Error::validation(
                owner_meta.table,
                "lazy association access requires a managed owning instance",
            ));
        }

        let stmt = select_by_column(child_meta, fk_column, &owner_id)?;
        tracing::debug!(sql = %stmt.sql, "loading association");
        let rows = self
            .executor
            .query(&stmt.sql, &stmt.params)
            .map_err(|e| e.with_sql(&stmt.sql))?;

        let mut handles = Vec::with_capacity(rows.len());
        for row in &rows {
            let child = C::from_row(row)?;
            let child_id = child.id_value();
            let child_key = EntityKey::from_id::<C>(&child_id);
            if self.identity.is_tombstoned(&child_key) {
                continue;
            }
            match self.identity.state(&child_key) {
                Some(RecordState::Managed) => {
                    if let Some(existing) = self.identity.get::<C>(&child_key) {
                        handles.push(existing);
                    }
                }
                Some(RecordState::Removed) => {}
                None => {
                    let values = mapped_values(&child);
                    let handle = self
                        .identity
                        .attach(child_id, Arc::new(RwLock::new(child)));
                    self.snapshots.record(child_key, &values);
                    handles.push(handle);
                }
            }
        }

        {
            let guard = owner.read().expect(LOCK_POISONED);
            let _ = accessor(&guard).set_loaded(handles.clone());
        }
        tracing::debug!(
            table = child_meta.table,
            count = handles.len(),
            "association loaded"
        );
        Ok(handles)
    }

    /// Lifecycle state of an identity within this session.
    pub fn state_of<E: Entity>(&self, id: &Value) -> EntityState {
        let key = EntityKey::from_id::<E>(id);
        match self.identity.state(&key) {
            Some(RecordState::Managed) => EntityState::Managed,
            Some(RecordState::Removed) => EntityState::Removed,
            None if self.identity.is_tombstoned(&key) => EntityState::Gone,
            None => EntityState::Transient,
        }
    }

    /// Check whether an identity is currently managed.
    pub fn contains<E: Entity>(&self, id: &Value) -> bool {
        self.state_of::<E>(id) == EntityState::Managed
    }

    /// Number of tracked records (managed and pending delete).
    pub fn tracked_count(&self) -> usize {
        self.identity.len()
    }

    /// Number of inserts scheduled for the next flush.
    pub fn pending_insert_count(&self) -> usize {
        self.scheduled_inserts.len()
    }

    /// Number of deletes scheduled for the next flush.
    pub fn pending_delete_count(&self) -> usize {
        self.identity.removed_keys().len()
    }
}

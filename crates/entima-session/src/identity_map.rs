//! Identity map: at most one live instance per stored row.
//!
//! Each managed identity is held behind `Arc<RwLock<E>>`, type-erased so all
//! entity types share one table. Looking the same identity up twice yields
//! clones of the same `Arc`, so callers and the context observe each other's
//! mutations and reference equality holds across lookups.
//!
//! The map also remembers, for the life of the session, which identities were
//! removed and flushed (the tombstone set) and the order in which records were
//! registered, which fixes the statement order at flush time.

use crate::EntityKey;
use entima_core::{Entity, EntityMeta, EntityRef, Value};
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Tracked-record state: managed, or managed with a pending delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Tracked, no pending delete.
    Managed,
    /// Tracked, delete scheduled for the next flush.
    Removed,
}

/// A type-erased managed record.
struct ManagedEntry {
    /// Type-erased handle; actually an `Arc<RwLock<E>>` for some `E`.
    handle: Box<dyn Any + Send + Sync>,
    state: RecordState,
    meta: &'static EntityMeta,
    /// Identifier the record was registered under.
    id: Value,
    /// Reads the instance's current mapped values through the handle.
    values_fn: Box<dyn Fn() -> Vec<(&'static str, Value)> + Send + Sync>,
}

/// Identity map plus session tombstones.
#[derive(Default)]
pub struct IdentityMap {
    entries: HashMap<EntityKey, ManagedEntry>,
    /// Registration order; flush walks records in this order.
    order: Vec<EntityKey>,
    /// Identities removed and flushed during this session. Never shrinks.
    tombstones: HashSet<EntityKey>,
}

impl IdentityMap {
    /// Create an empty identity map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle as the managed record for `id`.
    ///
    /// If the identity is already tracked, the existing handle is returned
    /// and the new one is discarded; otherwise the handle itself becomes the
    /// managed record.
    pub fn attach<E: Entity>(&mut self, id: Value, handle: EntityRef<E>) -> EntityRef<E> {
        let key = EntityKey::from_id::<E>(&id);

        if let Some(entry) = self.entries.get(&key) {
            if let Some(existing) = entry.handle.downcast_ref::<EntityRef<E>>() {
                return Arc::clone(existing);
            }
        }

        let values_handle = Arc::clone(&handle);
        self.entries.insert(
            key,
            ManagedEntry {
                handle: Box::new(Arc::clone(&handle)),
                state: RecordState::Managed,
                meta: E::meta(),
                id,
                values_fn: Box::new(move || {
                    values_handle.read().expect("entity lock poisoned").to_row()
                }),
            },
        );
        self.order.push(key);
        handle
    }

    /// Get the managed handle for a key.
    pub fn get<E: Entity>(&self, key: &EntityKey) -> Option<EntityRef<E>> {
        let entry = self.entries.get(key)?;
        let handle = entry.handle.downcast_ref::<EntityRef<E>>()?;
        Some(Arc::clone(handle))
    }

    /// State of a tracked record, `None` when untracked.
    pub fn state(&self, key: &EntityKey) -> Option<RecordState> {
        self.entries.get(key).map(|e| e.state)
    }

    /// Transition a managed record to removed. Returns whether a transition
    /// happened (false when untracked or already removed).
    pub fn mark_removed(&mut self, key: &EntityKey) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) if entry.state == RecordState::Managed => {
                entry.state = RecordState::Removed;
                true
            }
            _ => false,
        }
    }

    /// Withdraw a pending delete, returning the record to managed.
    pub fn restore_managed(&mut self, key: &EntityKey) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) if entry.state == RecordState::Removed => {
                entry.state = RecordState::Managed;
                true
            }
            _ => false,
        }
    }

    /// Current mapped values of a tracked record, read live from the handle.
    pub fn current_values(&self, key: &EntityKey) -> Option<Vec<(&'static str, Value)>> {
        self.entries.get(key).map(|e| (e.values_fn)())
    }

    /// Metadata of a tracked record.
    pub fn meta_of(&self, key: &EntityKey) -> Option<&'static EntityMeta> {
        self.entries.get(key).map(|e| e.meta)
    }

    /// Identifier a tracked record was registered under.
    pub fn id_of(&self, key: &EntityKey) -> Option<&Value> {
        self.entries.get(key).map(|e| &e.id)
    }

    /// Evict a record without touching the tombstone set.
    pub fn evict(&mut self, key: &EntityKey) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.order.retain(|k| k != key);
        }
        removed
    }

    /// Evict every tracked record. Tombstones are retained.
    pub fn clear_tracked(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Record that an identity's delete was flushed.
    pub fn add_tombstone(&mut self, key: EntityKey) {
        self.tombstones.insert(key);
    }

    /// Check whether an identity was removed and flushed this session.
    pub fn is_tombstoned(&self, key: &EntityKey) -> bool {
        self.tombstones.contains(key)
    }

    /// Keys of managed records, in registration order.
    pub fn managed_keys(&self) -> Vec<EntityKey> {
        self.keys_with_state(RecordState::Managed)
    }

    /// Keys of removed records, in registration order.
    pub fn removed_keys(&self) -> Vec<EntityKey> {
        self.keys_with_state(RecordState::Removed)
    }

    fn keys_with_state(&self, state: RecordState) -> Vec<EntityKey> {
        self.order
            .iter()
            .copied()
            .filter(|k| self.entries.get(k).is_some_and(|e| e.state == state))
            .collect()
    }

    /// Number of tracked records (managed and removed).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no records are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of tombstoned identities.
    #[must_use]
    pub fn tombstone_count(&self) -> usize {
        self.tombstones.len()
    }
}

//! Snapshot store for dirty detection.
//!
//! A snapshot is the serialized mapped values of an entity at its last
//! synchronization point (load, successful insert, or flushed update). At
//! flush time the context compares each managed record's current mapped
//! values against its snapshot; a difference schedules an UPDATE.

use crate::EntityKey;
use entima_core::Value;
use std::collections::HashMap;

/// Serialized mapped values at a synchronization point.
#[derive(Debug)]
pub struct Snapshot {
    /// JSON bytes of the mapped value vector.
    data: Vec<u8>,
}

impl Snapshot {
    fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// The snapshot payload.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Snapshots keyed by identity.
#[derive(Default)]
pub struct SnapshotStore {
    snapshots: HashMap<EntityKey, Snapshot>,
}

impl SnapshotStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the mapped values for `key`, replacing any prior snapshot.
    pub fn record(&mut self, key: EntityKey, values: &[Value]) {
        let data = serde_json::to_vec(values).unwrap_or_default();
        tracing::trace!(
            id_hash = key.id_hash(),
            snapshot_bytes = data.len(),
            "captured snapshot"
        );
        self.snapshots.insert(key, Snapshot::new(data));
    }

    /// Compare current mapped values against the snapshot.
    ///
    /// A record with no snapshot is treated as dirty.
    pub fn is_dirty(&self, key: &EntityKey, current: &[Value]) -> bool {
        let Some(snapshot) = self.snapshots.get(key) else {
            tracing::trace!(id_hash = key.id_hash(), "no snapshot, treating as dirty");
            return true;
        };
        let bytes = serde_json::to_vec(current).unwrap_or_default();
        bytes != snapshot.data
    }

    /// Check if a snapshot exists for the key.
    pub fn has(&self, key: &EntityKey) -> bool {
        self.snapshots.contains_key(key)
    }

    /// The snapshot for a key.
    pub fn get(&self, key: &EntityKey) -> Option<&Snapshot> {
        self.snapshots.get(key)
    }

    /// Drop the snapshot for a key.
    pub fn remove(&mut self, key: &EntityKey) {
        self.snapshots.remove(key);
    }

    /// Drop every snapshot.
    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    /// Number of stored snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

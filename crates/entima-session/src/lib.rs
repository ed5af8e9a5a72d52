//! Persistence context for the Entima engine.
//!
//! `entima-session` is the engine layer: it coordinates object identity,
//! snapshot-based dirty detection, and deterministic statement flushing
//! against a row executor.
//!
//! # Role in the architecture
//!
//! - **Identity map**: a single shared in-memory instance per identifier,
//!   with session-scoped tombstones for flushed deletes.
//! - **Snapshot store**: mapped values captured at each synchronization
//!   point, compared at flush time to decide which rows need an UPDATE.
//! - **Persistence context**: the lifecycle state machine behind
//!   `find`/`persist`/`remove`/`flush`/`clear`.
//!
//! # Design
//!
//! - **One session, one thread**: every operation is synchronous and may
//!   block on the row executor; there is no internal locking beyond the
//!   per-instance `RwLock` that backs shared handles.
//! - **Type erasure**: the identity map stores `Arc<RwLock<E>>` behind
//!   `Box<dyn Any>` so heterogeneous entity types share one table.
//! - **Explicit flush**: nothing is written until `flush()`, and statements
//!   always run insert, then update, then delete.

pub mod context;
pub mod identity_map;
pub mod idgen;
pub mod snapshot;

pub use context::{PersistenceContext, SessionConfig};
pub use identity_map::{IdentityMap, RecordState};
pub use idgen::{require_client_id, resolve_insert_id};
pub use snapshot::{Snapshot, SnapshotStore};

use entima_core::{Entity, Value};
use std::any::TypeId;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Lifecycle state of an identity within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// Not tracked by this session.
    Transient,
    /// Tracked with no pending delete.
    Managed,
    /// Tracked with a delete scheduled for the next flush.
    Removed,
    /// Deleted and flushed earlier in this session; resurrection is rejected.
    Gone,
}

/// Unique key for an identity in the session: entity type plus identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityKey {
    /// Type identifier of the entity type.
    type_id: TypeId,
    /// Hash of the identifier value.
    id_hash: u64,
}

impl EntityKey {
    /// Create a key from an entity instance's current identifier.
    pub fn from_entity<E: Entity>(entity: &E) -> Self {
        Self::from_id::<E>(&entity.id_value())
    }

    /// Create a key from a type and identifier value.
    pub fn from_id<E: Entity>(id: &Value) -> Self {
        Self {
            type_id: TypeId::of::<E>(),
            id_hash: hash_id(id),
        }
    }

    /// The identifier hash.
    pub fn id_hash(&self) -> u64 {
        self.id_hash
    }

    /// The entity type identifier.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }
}

/// Hash an identifier value, tagging each variant so distinct types with
/// equal payloads never collide.
fn hash_id(value: &Value) -> u64 {
    let mut hasher = DefaultHasher::new();
    hash_value(value, &mut hasher);
    hasher.finish()
}

fn hash_value(value: &Value, hasher: &mut impl Hasher) {
    match value {
        Value::Null => 0u8.hash(hasher),
        Value::Bool(b) => {
            1u8.hash(hasher);
            b.hash(hasher);
        }
        Value::Int(i) => {
            2u8.hash(hasher);
            i.hash(hasher);
        }
        Value::BigInt(i) => {
            3u8.hash(hasher);
            i.hash(hasher);
        }
        Value::Double(f) => {
            4u8.hash(hasher);
            f.to_bits().hash(hasher);
        }
        Value::Text(s) => {
            5u8.hash(hasher);
            s.hash(hasher);
        }
        Value::Bytes(b) => {
            6u8.hash(hasher);
            b.hash(hasher);
        }
    }
}

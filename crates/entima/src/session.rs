//! Session façade.
//!
//! A `Session` is the public entry point to the engine: a thin wrapper that
//! constructs one persistence context per session, exposes its operations,
//! and owns its disposal. All semantics live in
//! [`entima_session::PersistenceContext`].

use entima_core::{Assoc, Entity, EntityRef, Result, RowExecutor, Value};
use entima_session::{EntityState, PersistenceContext, SessionConfig};

/// One unit of work against the backing store.
///
/// A session is single-threaded: operations are synchronous and may block on
/// the row executor. Independent sessions may run concurrently against the
/// same store; coordinating them is the executor's concern.
pub struct Session<X: RowExecutor> {
    context: PersistenceContext<X>,
}

impl<X: RowExecutor> Session<X> {
    /// Open a session over a row executor.
    pub fn new(executor: X) -> Self {
        Self {
            context: PersistenceContext::new(executor),
        }
    }

    /// Open a session with explicit configuration.
    pub fn with_config(executor: X, config: SessionConfig) -> Self {
        Self {
            context: PersistenceContext::with_config(executor, config),
        }
    }

    /// Look an entity up by identifier. See [`PersistenceContext::find`].
    pub fn find<E: Entity>(&mut self, id: impl Into<Value>) -> Result<Option<EntityRef<E>>> {
        self.context.find(id)
    }

    /// Hand an instance to the session. See [`PersistenceContext::persist`].
    pub fn persist<E: Entity>(&mut self, entity: E) -> Result<EntityRef<E>> {
        self.context.persist(entity)
    }

    /// Schedule a managed instance for deletion. See
    /// [`PersistenceContext::remove`].
    pub fn remove<E: Entity>(&mut self, handle: &EntityRef<E>) -> Result<()> {
        self.context.remove(handle)
    }

    /// Reflect all pending intent to storage. See
    /// [`PersistenceContext::flush`].
    pub fn flush(&mut self) -> Result<()> {
        self.context.flush()
    }

    /// Evict every tracked record and discard pending intent. See
    /// [`PersistenceContext::clear`].
    pub fn clear(&mut self) {
        self.context.clear();
    }

    /// Re-read a managed instance from storage. See
    /// [`PersistenceContext::refresh`].
    pub fn refresh<E: Entity>(&mut self, handle: &EntityRef<E>) -> Result<()> {
        self.context.refresh(handle)
    }

    /// Resolve a lazy association on a managed owner. See
    /// [`PersistenceContext::load_many`].
    pub fn load_many<P, C, F>(
        &mut self,
        owner: &EntityRef<P>,
        accessor: F,
    ) -> Result<Vec<EntityRef<C>>>
    where
        P: Entity,
        C: Entity,
        F: Fn(&P) -> &Assoc<C>,
    {
        self.context.load_many(owner, accessor)
    }

    /// Lifecycle state of an identity within this session.
    pub fn state_of<E: Entity>(&self, id: &Value) -> EntityState {
        self.context.state_of::<E>(id)
    }

    /// Check whether an identity is currently managed.
    pub fn contains<E: Entity>(&self, id: &Value) -> bool {
        self.context.contains::<E>(id)
    }

    /// Number of tracked records.
    pub fn tracked_count(&self) -> usize {
        self.context.tracked_count()
    }

    /// Number of inserts scheduled for the next flush.
    pub fn pending_insert_count(&self) -> usize {
        self.context.pending_insert_count()
    }

    /// Number of deletes scheduled for the next flush.
    pub fn pending_delete_count(&self) -> usize {
        self.context.pending_delete_count()
    }

    /// Borrow the row executor.
    pub fn executor(&self) -> &X {
        self.context.executor()
    }

    /// Borrow the row executor mutably.
    pub fn executor_mut(&mut self) -> &mut X {
        self.context.executor_mut()
    }

    /// Dispose of the session, returning the row executor.
    pub fn into_executor(self) -> X {
        self.context.into_executor()
    }
}

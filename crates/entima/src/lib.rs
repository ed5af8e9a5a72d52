//! Entima - session-scoped object-relational persistence for Rust.
//!
//! Entima tracks in-memory domain objects, decides when and how they must be
//! reflected to relational storage, and generates the SQL to do so:
//!
//! - **Identity map**: one shared instance per stored row within a session
//! - **Dirty checking**: snapshot comparison decides which rows need UPDATEs
//! - **Deterministic flush**: insert, then update, then delete, in
//!   registration order
//! - **Tombstones**: deleted identities cannot be resurrected in the same
//!   session
//! - **Lazy associations**: one-to-many collections loaded on first access
//!
//! # Quick Start
//!
//! ```ignore
//! use entima::prelude::*;
//!
//! let mut session = Session::new(executor);
//!
//! // Schedule an insert; the database assigns the identifier at flush.
//! let person = session.persist(Person::new("abc", 7, "def@example.com"))?;
//! session.flush()?;
//!
//! // Identity-mapped lookup: one query, every call returns the same handle.
//! let same = session.find::<Person>(1_i64)?.unwrap();
//!
//! // Mutations through the handle are flushed as a single UPDATE.
//! same.write().unwrap().age = Some(8);
//! session.flush()?;
//!
//! session.remove(&same)?;
//! session.flush()?;
//! ```

// Re-export the public surface of the sub-crates
pub use entima_core::{
    Assoc,
    AssocDef,
    Cardinality,
    ColumnDef,
    Entity,
    EntityMeta,
    EntityRef,
    Error,
    ExecutionError,
    FetchPolicy,
    FromValue,
    IdStrategy,
    InsertOutcome,
    NotFoundError,
    ObjectNotFoundError,
    ObjectNotFoundKind,
    Result,
    Row,
    RowExecutor,
    ValidationError,
    Value,
    mapped_values,
};

pub use entima_sql::{
    Statement, delete_by_id, insert_statement, select_by_column, select_by_id, update_by_id,
};

pub use entima_session::{
    EntityKey, EntityState, IdentityMap, PersistenceContext, SessionConfig, SnapshotStore,
};

// Session façade
pub mod session;
pub use session::Session;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use entima::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Assoc, ColumnDef, Entity, EntityMeta, EntityRef, EntityState, Error, IdStrategy, Result,
        Row, RowExecutor, Session, SessionConfig, Value,
    };
}

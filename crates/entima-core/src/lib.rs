//! Core types and traits for the Entima persistence engine.
//!
//! This crate provides the foundational abstractions the session layer builds on:
//!
//! - `Entity` trait for table-mapped domain types
//! - `EntityMeta` static mapping metadata (columns, identifier, associations)
//! - `Value` dynamic SQL value and `Row` result representation
//! - `RowExecutor` trait for the SQL transport collaborator
//! - `Assoc` deferred one-to-many collections

pub mod assoc;
pub mod entity;
pub mod error;
pub mod executor;
pub mod meta;
pub mod row;
pub mod value;

pub use assoc::Assoc;
pub use entity::{Entity, EntityRef, mapped_values};
pub use error::{
    Error, ExecutionError, NotFoundError, ObjectNotFoundError, ObjectNotFoundKind, Result,
    ValidationError,
};
pub use executor::{InsertOutcome, RowExecutor};
pub use meta::{AssocDef, Cardinality, ColumnDef, EntityMeta, FetchPolicy, IdStrategy};
pub use row::{ColumnSet, FromValue, Row};
pub use value::Value;

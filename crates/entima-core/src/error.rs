//! Error types for persistence operations.

use crate::value::Value;
use std::fmt;

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, Error>;

/// The primary error type for all persistence operations.
#[derive(Debug)]
pub enum Error {
    /// A lookup that requires an existing row found none.
    NotFound(NotFoundError),
    /// A session-level consistency violation around a tracked identity.
    ObjectNotFound(ObjectNotFoundError),
    /// Malformed metadata, lifecycle precondition failure, or value mismatch.
    Validation(ValidationError),
    /// Opaque failure surfaced from the row executor.
    Execution(ExecutionError),
}

/// An operation required a backing row that does not exist.
#[derive(Debug)]
pub struct NotFoundError {
    /// Table of the entity that was looked up.
    pub entity: &'static str,
    /// Identifier that was looked up.
    pub id: Value,
}

/// Why a tracked identity is considered unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectNotFoundKind {
    /// The identity was removed and flushed earlier in this session.
    Tombstoned,
    /// An UPDATE or DELETE matched zero rows; the row vanished under the session.
    RowVanished,
}

/// A tracked identity is gone: deleted in this session or missing in storage.
#[derive(Debug)]
pub struct ObjectNotFoundError {
    pub kind: ObjectNotFoundKind,
    pub entity: &'static str,
    pub id: Value,
}

/// Metadata or lifecycle precondition violation.
#[derive(Debug)]
pub struct ValidationError {
    /// Table of the entity involved, if known.
    pub entity: &'static str,
    pub message: String,
}

/// Failure reported by the row executor, propagated uninterpreted.
#[derive(Debug)]
pub struct ExecutionError {
    /// The statement that failed, when the failure occurred mid-statement.
    pub sql: Option<String>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// A lookup requiring an existing row found none.
    pub fn not_found(entity: &'static str, id: Value) -> Self {
        Error::NotFound(NotFoundError { entity, id })
    }

    /// The identity was deleted earlier in this session.
    pub fn tombstoned(entity: &'static str, id: Value) -> Self {
        Error::ObjectNotFound(ObjectNotFoundError {
            kind: ObjectNotFoundKind::Tombstoned,
            entity,
            id,
        })
    }

    /// An UPDATE or DELETE affected zero rows.
    pub fn row_vanished(entity: &'static str, id: Value) -> Self {
        Error::ObjectNotFound(ObjectNotFoundError {
            kind: ObjectNotFoundKind::RowVanished,
            entity,
            id,
        })
    }

    /// Metadata or lifecycle precondition violation.
    pub fn validation(entity: &'static str, message: impl Into<String>) -> Self {
        Error::Validation(ValidationError {
            entity,
            message: message.into(),
        })
    }

    /// Executor failure with no statement context.
    pub fn execution(message: impl Into<String>) -> Self {
        Error::Execution(ExecutionError {
            sql: None,
            message: message.into(),
            source: None,
        })
    }

    /// Executor failure while running a specific statement.
    pub fn execution_with_sql(message: impl Into<String>, sql: impl Into<String>) -> Self {
        Error::Execution(ExecutionError {
            sql: Some(sql.into()),
            message: message.into(),
            source: None,
        })
    }

    /// Attach the failing statement to an execution error, leaving other
    /// variants untouched.
    #[must_use]
    pub fn with_sql(self, sql: &str) -> Self {
        match self {
            Error::Execution(mut e) => {
                if e.sql.is_none() {
                    e.sql = Some(sql.to_string());
                }
                Error::Execution(e)
            }
            other => other,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound(e) => {
                write!(f, "no row found for {} with id {}", e.entity, e.id)
            }
            Error::ObjectNotFound(e) => match e.kind {
                ObjectNotFoundKind::Tombstoned => write!(
                    f,
                    "identity {} of {} was removed in this session",
                    e.id, e.entity
                ),
                ObjectNotFoundKind::RowVanished => write!(
                    f,
                    "row {} of {} no longer exists in storage",
                    e.id, e.entity
                ),
            },
            Error::Validation(e) => write!(f, "validation failed for {}: {}", e.entity, e.message),
            Error::Execution(e) => {
                write!(f, "statement execution failed: {}", e.message)?;
                if let Some(sql) = &e.sql {
                    write!(f, " (while executing: {sql})")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Execution(e) => e
                .source
                .as_deref()
                .map(|s| s as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

//! Row executor trait: the SQL transport collaborator.
//!
//! The engine generates parameterized statements and hands them to a
//! `RowExecutor`; query execution, connections, transactions, and dialect
//! quirks all live behind this trait. Every call is synchronous from the
//! engine's viewpoint and may block.

use crate::error::Result;
use crate::row::Row;
use crate::value::Value;

/// Outcome of an INSERT statement.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertOutcome {
    /// Number of rows the statement affected.
    pub rows_affected: u64,
    /// The generated key, when the target table assigns identifiers.
    pub generated_id: Option<Value>,
}

impl InsertOutcome {
    /// An insert with no generated key.
    pub fn new(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            generated_id: None,
        }
    }

    /// An insert that produced a generated key.
    pub fn with_generated_id(rows_affected: u64, id: impl Into<Value>) -> Self {
        Self {
            rows_affected,
            generated_id: Some(id.into()),
        }
    }
}

/// Executes parameterized SQL against the backing store.
///
/// Implementations report failures as [`crate::Error::Execution`]; the engine
/// propagates them without interpretation and never retries.
pub trait RowExecutor {
    /// Execute a SELECT and return all rows in storage order.
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Execute an INSERT/UPDATE/DELETE and return the affected-row count.
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Execute an INSERT, additionally reporting the generated key when the
    /// table assigns identifiers.
    fn insert(&mut self, sql: &str, params: &[Value]) -> Result<InsertOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_outcome_constructors() {
        let plain = InsertOutcome::new(1);
        assert_eq!(plain.rows_affected, 1);
        assert!(plain.generated_id.is_none());

        let keyed = InsertOutcome::with_generated_id(1, 42_i64);
        assert_eq!(keyed.generated_id, Some(Value::BigInt(42)));
    }
}

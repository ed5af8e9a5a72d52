//! Database row representation.

use crate::error::{Error, Result};
use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Column metadata shared across all rows in a result set.
///
/// Wrapped in `Arc` so every row from the same query shares one copy.
#[derive(Debug, Clone)]
pub struct ColumnSet {
    /// Column names in order
    names: Vec<String>,
    /// Name -> index mapping for O(1) lookup
    name_to_index: HashMap<String, usize>,
}

impl ColumnSet {
    /// Create new column metadata from a list of column names.
    pub fn new(names: Vec<String>) -> Self {
        let name_to_index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self {
            names,
            name_to_index,
        }
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if there are no columns.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Index of a column by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    /// Name of a column by index.
    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Check if a column exists.
    pub fn contains(&self, name: &str) -> bool {
        self.name_to_index.contains_key(name)
    }

    /// All column names.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// A single row returned from the row executor.
///
/// Rows provide both index-based and name-based access to column values.
#[derive(Debug, Clone)]
pub struct Row {
    /// Column values in order
    values: Vec<Value>,
    /// Shared column metadata
    columns: Arc<ColumnSet>,
}

impl Row {
    /// Create a new row with the given columns and values.
    ///
    /// For multiple rows from the same result set, prefer `with_columns`
    /// to share the column metadata.
    pub fn new(column_names: Vec<String>, values: Vec<Value>) -> Self {
        let columns = Arc::new(ColumnSet::new(column_names));
        Self { values, columns }
    }

    /// Create a new row with shared column metadata.
    pub fn with_columns(columns: Arc<ColumnSet>, values: Vec<Value>) -> Self {
        Self { values, columns }
    }

    /// The shared column metadata.
    pub fn column_set(&self) -> Arc<ColumnSet> {
        Arc::clone(&self.columns)
    }

    /// Number of columns in this row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if this row is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get a value by column index.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Get a value by column name.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.columns.index_of(name).and_then(|i| self.values.get(i))
    }

    /// Check if a column exists by name.
    pub fn contains_column(&self, name: &str) -> bool {
        self.columns.contains(name)
    }

    /// Get a typed value by column name.
    pub fn get_named<T: FromValue>(&self, name: &str) -> Result<T> {
        let value = self.value(name).ok_or_else(|| {
            Error::validation(
                "row",
                format!(
                    "no column named {name:?} (columns: {:?})",
                    self.columns.names()
                ),
            )
        })?;
        T::from_value(value).map_err(|e| match e {
            Error::Validation(mut v) => {
                v.message = format!("column {name:?}: {}", v.message);
                Error::Validation(v)
            }
            other => other,
        })
    }
}

/// Conversion from a dynamic [`Value`] into a concrete Rust type.
///
/// Mismatches surface as validation errors.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_bool()
            .ok_or_else(|| mismatch("bool", value))
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Int(v) => Ok(*v),
            Value::BigInt(v) => i32::try_from(*v).map_err(|_| mismatch("i32", value)),
            _ => Err(mismatch("i32", value)),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_i64().ok_or_else(|| mismatch("i64", value))
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_f64().ok_or_else(|| mismatch("f64", value))
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch("String", value))
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_bytes()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| mismatch("Vec<u8>", value))
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

fn mismatch(expected: &str, actual: &Value) -> Error {
    Error::validation(
        "row",
        format!("expected {expected}, got {}", actual.type_name()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> Row {
        Row::new(
            vec!["id".into(), "nick_name".into(), "old".into()],
            vec![Value::BigInt(1), Value::Text("abc".into()), Value::Null],
        )
    }

    #[test]
    fn access_by_name_and_index() {
        let row = sample_row();
        assert_eq!(row.get(0), Some(&Value::BigInt(1)));
        assert_eq!(row.value("nick_name"), Some(&Value::Text("abc".into())));
        assert_eq!(row.value("missing"), None);
    }

    #[test]
    fn typed_access() {
        let row = sample_row();
        let id: i64 = row.get_named("id").unwrap();
        assert_eq!(id, 1);
        let name: String = row.get_named("nick_name").unwrap();
        assert_eq!(name, "abc");
        let age: Option<i32> = row.get_named("old").unwrap();
        assert_eq!(age, None);
    }

    #[test]
    fn typed_access_mismatch_is_validation_error() {
        let row = sample_row();
        let err = row.get_named::<i64>("nick_name").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn shared_column_set() {
        let row = sample_row();
        let columns = row.column_set();
        let second = Row::with_columns(
            columns,
            vec![Value::BigInt(2), Value::Text("def".into()), Value::Int(9)],
        );
        assert_eq!(second.get_named::<i64>("id").unwrap(), 2);
        assert_eq!(second.get_named::<Option<i32>>("old").unwrap(), Some(9));
    }
}

//! Statement builder: pure translation from mapping metadata and mapped
//! values to parameterized SQL.
//!
//! The builder holds no state and knows nothing about dialects beyond the
//! positional `$n` parameter form. Column order is always the metadata's
//! declared order and clause shapes are fixed, so callers (and their tests)
//! can rely on the exact statement text.

use entima_core::{EntityMeta, Error, Result, Value};

/// Parameterized SQL text plus its bound values, in positional order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    /// Create a statement from text and bound values.
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sql)
    }
}

fn placeholder(index: usize) -> String {
    format!("${index}")
}

fn id_column(meta: &EntityMeta) -> Result<&'static str> {
    meta.id_column()
        .map(|c| c.column)
        .ok_or_else(|| Error::validation(meta.table, "no identifier column declared"))
}

fn value_for(
    meta: &EntityMeta,
    row: &[(&'static str, Value)],
    column: &'static str,
) -> Result<Value> {
    row.iter()
        .find(|(name, _)| *name == column)
        .map(|(_, v)| v.clone())
        .ok_or_else(|| {
            Error::validation(
                meta.table,
                format!("mapped column {column:?} missing from entity values"),
            )
        })
}

/// Build an INSERT for an entity's mapped values.
///
/// The identifier column is omitted under the database-assigned strategy and
/// included under the client-assigned strategy; everything else follows the
/// declared column order.
pub fn insert_statement(meta: &EntityMeta, row: &[(&'static str, Value)]) -> Result<Statement> {
    let mut columns = Vec::new();
    let mut params = Vec::new();
    for col in meta.insert_columns() {
        columns.push(col.column);
        params.push(value_for(meta, row, col.column)?);
    }

    let placeholders: Vec<String> = (1..=params.len()).map(placeholder).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        meta.table,
        columns.join(", "),
        placeholders.join(", ")
    );
    Ok(Statement::new(sql, params))
}

/// Build a SELECT of all mapped columns, filtered on the identifier.
pub fn select_by_id(meta: &EntityMeta, id: &Value) -> Result<Statement> {
    select_by_column(meta, id_column(meta)?, id)
}

/// Build a SELECT of all mapped columns, filtered on an arbitrary column.
///
/// The filter column is not required to be mapped: lazy association loads
/// filter child tables on a foreign-key column the child type itself may not
/// carry.
pub fn select_by_column(meta: &EntityMeta, column: &str, value: &Value) -> Result<Statement> {
    let columns: Vec<&str> = meta.columns.iter().map(|c| c.column).collect();
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        columns.join(", "),
        meta.table,
        column,
        placeholder(1)
    );
    Ok(Statement::new(sql, vec![value.clone()]))
}

/// Build an UPDATE setting every mapped non-identifier column, keyed on the
/// identifier.
///
/// The SET list always covers all non-identifier columns; the engine never
/// narrows it to the changed subset.
pub fn update_by_id(
    meta: &EntityMeta,
    row: &[(&'static str, Value)],
    id: &Value,
) -> Result<Statement> {
    let mut assignments = Vec::new();
    let mut params = Vec::new();
    for col in meta.non_id_columns() {
        params.push(value_for(meta, row, col.column)?);
        assignments.push(format!("{} = {}", col.column, placeholder(params.len())));
    }

    params.push(id.clone());
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = {}",
        meta.table,
        assignments.join(", "),
        id_column(meta)?,
        placeholder(params.len())
    );
    Ok(Statement::new(sql, params))
}

/// Build a DELETE keyed on the identifier.
pub fn delete_by_id(meta: &EntityMeta, id: &Value) -> Result<Statement> {
    let sql = format!(
        "DELETE FROM {} WHERE {} = {}",
        meta.table,
        id_column(meta)?,
        placeholder(1)
    );
    Ok(Statement::new(sql, vec![id.clone()]))
}

//! Shared test support: hand-mapped entities and an in-memory row executor
//! that records every statement it runs.
#![allow(dead_code)]

use entima::{
    Assoc, ColumnDef, Entity, EntityMeta, Error, IdStrategy, InsertOutcome, Result, Row,
    RowExecutor, Value,
};
use std::collections::{BTreeMap, HashMap};

// ============================================================================
// Entities
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub id: Option<i64>,
    pub name: String,
    pub age: Option<i32>,
    pub email: String,
    /// Not persisted.
    pub index: Option<i32>,
}

impl Person {
    pub fn new(name: &str, age: i32, email: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            age: Some(age),
            email: email.to_string(),
            index: None,
        }
    }

    pub fn with_id(id: i64, name: &str, age: i32, email: &str) -> Self {
        Self {
            id: Some(id),
            ..Self::new(name, age, email)
        }
    }
}

const PERSON_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id", "id").identifier(true),
    ColumnDef::new("name", "nick_name"),
    ColumnDef::new("age", "old"),
    ColumnDef::new("email", "email"),
];
const PERSON_META: EntityMeta = EntityMeta::new("users", PERSON_COLUMNS).transient(&["index"]);

impl Entity for Person {
    const TABLE: &'static str = "users";

    fn meta() -> &'static EntityMeta {
        &PERSON_META
    }

    fn to_row(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", Value::from(self.id)),
            ("nick_name", Value::from(self.name.clone())),
            ("old", Value::from(self.age)),
            ("email", Value::from(self.email.clone())),
        ]
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.get_named("id")?,
            name: row.get_named("nick_name")?,
            age: row.get_named("old")?,
            email: row.get_named("email")?,
            index: None,
        })
    }

    fn id_value(&self) -> Value {
        Value::from(self.id)
    }

    fn set_id_value(&mut self, id: Value) {
        self.id = id.as_i64();
    }

    fn copy_mapped_from(&mut self, other: &Self) {
        self.id = other.id;
        self.name = other.name.clone();
        self.age = other.age;
        self.email = other.email.clone();
    }
}

#[derive(Debug, Clone)]
pub struct Order {
    pub id: Option<i64>,
    pub order_number: String,
    pub items: Assoc<OrderItem>,
}

impl Order {
    pub fn new(order_number: &str) -> Self {
        Self {
            id: None,
            order_number: order_number.to_string(),
            items: Assoc::new("order_id"),
        }
    }
}

const ORDER_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id", "id").identifier(true),
    ColumnDef::new("order_number", "order_number"),
];
const ORDER_ASSOCS: &[entima::AssocDef] = &[entima::AssocDef::new(
    "items",
    "order_items",
    "order_id",
)];
const ORDER_META: EntityMeta = EntityMeta::new("orders", ORDER_COLUMNS).associations(ORDER_ASSOCS);

impl Entity for Order {
    const TABLE: &'static str = "orders";

    fn meta() -> &'static EntityMeta {
        &ORDER_META
    }

    fn to_row(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", Value::from(self.id)),
            ("order_number", Value::from(self.order_number.clone())),
        ]
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.get_named("id")?,
            order_number: row.get_named("order_number")?,
            items: Assoc::new("order_id"),
        })
    }

    fn id_value(&self) -> Value {
        Value::from(self.id)
    }

    fn set_id_value(&mut self, id: Value) {
        self.id = id.as_i64();
    }

    fn copy_mapped_from(&mut self, other: &Self) {
        self.id = other.id;
        self.order_number = other.order_number.clone();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub id: Option<i64>,
    pub product: String,
    pub quantity: i32,
}

const ITEM_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id", "id").identifier(true),
    ColumnDef::new("product", "product"),
    ColumnDef::new("quantity", "quantity"),
];
const ITEM_META: EntityMeta = EntityMeta::new("order_items", ITEM_COLUMNS);

impl Entity for OrderItem {
    const TABLE: &'static str = "order_items";

    fn meta() -> &'static EntityMeta {
        &ITEM_META
    }

    fn to_row(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", Value::from(self.id)),
            ("product", Value::from(self.product.clone())),
            ("quantity", Value::from(self.quantity)),
        ]
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.get_named("id")?,
            product: row.get_named("product")?,
            quantity: row.get_named("quantity")?,
        })
    }

    fn id_value(&self) -> Value {
        Value::from(self.id)
    }

    fn set_id_value(&mut self, id: Value) {
        self.id = id.as_i64();
    }

    fn copy_mapped_from(&mut self, other: &Self) {
        self.id = other.id;
        self.product = other.product.clone();
        self.quantity = other.quantity;
    }
}

/// A client-assigned-identifier entity for strategy coverage.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub id: Option<i64>,
    pub label: String,
}

const TAG_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id", "id").identifier(true),
    ColumnDef::new("label", "label"),
];
const TAG_META: EntityMeta =
    EntityMeta::new("tags", TAG_COLUMNS).id_strategy(IdStrategy::ClientAssigned);

impl Entity for Tag {
    const TABLE: &'static str = "tags";

    fn meta() -> &'static EntityMeta {
        &TAG_META
    }

    fn to_row(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", Value::from(self.id)),
            ("label", Value::from(self.label.clone())),
        ]
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.get_named("id")?,
            label: row.get_named("label")?,
        })
    }

    fn id_value(&self) -> Value {
        Value::from(self.id)
    }

    fn set_id_value(&mut self, id: Value) {
        self.id = id.as_i64();
    }

    fn copy_mapped_from(&mut self, other: &Self) {
        self.id = other.id;
        self.label = other.label.clone();
    }
}

// ============================================================================
// In-memory executor
// ============================================================================

#[derive(Default)]
struct MemTable {
    /// Rows keyed by identifier, each a column -> value map.
    rows: BTreeMap<i64, HashMap<String, Value>>,
    next_id: i64,
}

impl MemTable {
    fn generate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory store that understands exactly the statement shapes the engine
/// emits, records every statement it runs, and assigns identifiers the way an
/// identity column would.
#[derive(Default)]
pub struct MemExecutor {
    tables: HashMap<String, MemTable>,
    executed: Vec<String>,
    fail_next_execute: Option<String>,
}

impl MemExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row directly, bypassing the engine (and the statement log).
    /// Does not advance the identity sequence, matching an explicit-id insert.
    pub fn seed(&mut self, table: &str, id: i64, values: &[(&str, Value)]) {
        let table = self.tables.entry(table.to_string()).or_default();
        let mut row: HashMap<String, Value> =
            values.iter().map(|(c, v)| ((*c).to_string(), v.clone())).collect();
        row.insert("id".to_string(), Value::BigInt(id));
        table.rows.insert(id, row);
    }

    /// Every statement executed so far, in order.
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    /// Forget the statement log (keeps the data).
    pub fn clear_log(&mut self) {
        self.executed.clear();
    }

    /// Make the next `execute` call fail with an execution error.
    pub fn fail_next_execute(&mut self, message: &str) {
        self.fail_next_execute = Some(message.to_string());
    }

    /// Direct row count of a table.
    pub fn row_count(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, |t| t.rows.len())
    }

    fn table_mut(&mut self, name: &str) -> &mut MemTable {
        self.tables.entry(name.to_string()).or_default()
    }

    fn parse_between<'a>(s: &'a str, start: &str, end: &str) -> &'a str {
        let from = s.find(start).map_or(0, |i| i + start.len());
        let to = s[from..].find(end).map_or(s.len(), |i| from + i);
        s[from..to].trim()
    }
}

impl RowExecutor for MemExecutor {
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.executed.push(sql.to_string());

        let columns: Vec<String> = Self::parse_between(sql, "SELECT ", " FROM ")
            .split(", ")
            .map(str::to_string)
            .collect();
        let table_name = Self::parse_between(sql, " FROM ", " WHERE ").to_string();
        let filter_column = Self::parse_between(sql, " WHERE ", " = ").to_string();
        let needle = params
            .first()
            .ok_or_else(|| Error::execution("query expects one bound value"))?;

        let table = self.table_mut(&table_name);
        let mut rows = Vec::new();
        for stored in table.rows.values() {
            if stored.get(&filter_column) != Some(needle) {
                continue;
            }
            let values: Vec<Value> = columns
                .iter()
                .map(|c| stored.get(c).cloned().unwrap_or(Value::Null))
                .collect();
            rows.push(Row::new(columns.clone(), values));
        }
        Ok(rows)
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        self.executed.push(sql.to_string());
        if let Some(message) = self.fail_next_execute.take() {
            return Err(Error::execution(message));
        }

        if sql.starts_with("UPDATE ") {
            let table_name = Self::parse_between(sql, "UPDATE ", " SET ").to_string();
            let assignments: Vec<String> = Self::parse_between(sql, " SET ", " WHERE ")
                .split(", ")
                .filter_map(|a| a.split(" = ").next())
                .map(str::to_string)
                .collect();
            let id = params
                .last()
                .and_then(Value::as_i64)
                .ok_or_else(|| Error::execution("update expects an identifier"))?;

            let table = self.table_mut(&table_name);
            let Some(stored) = table.rows.get_mut(&id) else {
                return Ok(0);
            };
            for (column, value) in assignments.iter().zip(params) {
                stored.insert(column.clone(), value.clone());
            }
            Ok(1)
        } else if sql.starts_with("DELETE ") {
            let table_name = Self::parse_between(sql, "DELETE FROM ", " WHERE ").to_string();
            let id = params
                .first()
                .and_then(Value::as_i64)
                .ok_or_else(|| Error::execution("delete expects an identifier"))?;
            let removed = self.table_mut(&table_name).rows.remove(&id).is_some();
            Ok(u64::from(removed))
        } else {
            Err(Error::execution(format!("unsupported statement: {sql}")))
        }
    }

    fn insert(&mut self, sql: &str, params: &[Value]) -> Result<InsertOutcome> {
        self.executed.push(sql.to_string());

        let table_name = Self::parse_between(sql, "INSERT INTO ", " (").to_string();
        let columns: Vec<String> = Self::parse_between(sql, " (", ")")
            .split(", ")
            .map(str::to_string)
            .collect();

        let table = self.table_mut(&table_name);
        let explicit_id = columns
            .iter()
            .position(|c| c == "id")
            .and_then(|i| params.get(i))
            .and_then(Value::as_i64);
        let id = explicit_id.unwrap_or_else(|| table.generate_id());

        let mut row: HashMap<String, Value> = columns
            .iter()
            .zip(params)
            .map(|(c, v)| (c.clone(), v.clone()))
            .collect();
        row.insert("id".to_string(), Value::BigInt(id));
        table.rows.insert(id, row);

        Ok(InsertOutcome::with_generated_id(1, id))
    }
}

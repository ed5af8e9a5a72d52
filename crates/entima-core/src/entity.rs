//! Entity trait for table-mapped domain types.
//!
//! `Entity` is the compile-time replacement for reflection: each domain type
//! states its metadata once and provides the conversions between itself and
//! mapped column values. Implementations are supplied by the metadata
//! bootstrapping step (hand-written in this workspace).

use crate::error::Result;
use crate::meta::EntityMeta;
use crate::row::Row;
use crate::value::Value;
use std::sync::{Arc, RwLock};

/// A shared handle to a tracked entity instance.
///
/// The persistence context and the caller share the instance for as long as
/// it stays managed; the context writes the generated identifier through this
/// handle after a database-assigned insert.
pub type EntityRef<E> = Arc<RwLock<E>>;

/// Trait for types that map to a database table.
///
/// # Example
///
/// ```
/// use entima_core::{ColumnDef, Entity, EntityMeta, Result, Row, Value};
///
/// struct Person {
///     id: Option<i64>,
///     name: String,
/// }
///
/// const PERSON_COLUMNS: &[ColumnDef] = &[
///     ColumnDef::new("id", "id").identifier(true),
///     ColumnDef::new("name", "nick_name"),
/// ];
/// const PERSON_META: EntityMeta = EntityMeta::new("users", PERSON_COLUMNS);
///
/// impl Entity for Person {
///     const TABLE: &'static str = "users";
///
///     fn meta() -> &'static EntityMeta {
///         &PERSON_META
///     }
///
///     fn to_row(&self) -> Vec<(&'static str, Value)> {
///         vec![
///             ("id", Value::from(self.id)),
///             ("nick_name", Value::from(self.name.clone())),
///         ]
///     }
///
///     fn from_row(row: &Row) -> Result<Self> {
///         Ok(Self {
///             id: row.get_named("id")?,
///             name: row.get_named("nick_name")?,
///         })
///     }
///
///     fn id_value(&self) -> Value {
///         Value::from(self.id)
///     }
///
///     fn set_id_value(&mut self, id: Value) {
///         self.id = id.as_i64();
///     }
///
///     fn copy_mapped_from(&mut self, other: &Self) {
///         self.id = other.id;
///         self.name = other.name.clone();
///     }
/// }
/// ```
pub trait Entity: Sized + Send + Sync + 'static {
    /// The name of the database table.
    const TABLE: &'static str;

    /// Mapping metadata for this type.
    fn meta() -> &'static EntityMeta;

    /// Current mapped values, keyed by column name, in the metadata's
    /// declared column order (identifier included).
    fn to_row(&self) -> Vec<(&'static str, Value)>;

    /// Construct an instance from a result row.
    fn from_row(row: &Row) -> Result<Self>;

    /// The identifier value; `Value::Null` when unset.
    fn id_value(&self) -> Value;

    /// Overwrite the identifier field.
    fn set_id_value(&mut self, id: Value);

    /// Copy every mapped field from `other` into `self`, leaving transient
    /// fields and association state untouched.
    fn copy_mapped_from(&mut self, other: &Self);

    /// Check whether this instance has no identifier yet.
    fn is_new(&self) -> bool {
        self.id_value().is_null()
    }
}

/// Current mapped values of an entity, stripped of column names.
pub fn mapped_values<E: Entity>(entity: &E) -> Vec<Value> {
    entity.to_row().into_iter().map(|(_, v)| v).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::ColumnDef;

    #[derive(Debug, Clone, PartialEq)]
    struct Widget {
        id: Option<i64>,
        label: String,
    }

    const WIDGET_COLUMNS: &[ColumnDef] = &[
        ColumnDef::new("id", "id").identifier(true),
        ColumnDef::new("label", "label"),
    ];
    const WIDGET_META: EntityMeta = EntityMeta::new("widgets", WIDGET_COLUMNS);

    impl Entity for Widget {
        const TABLE: &'static str = "widgets";

        fn meta() -> &'static EntityMeta {
            &WIDGET_META
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

    #[test]
    fn is_new_tracks_identifier() {
        let mut w = Widget {
            id: None,
            label: "a".into(),
        };
        assert!(w.is_new());
        w.set_id_value(Value::BigInt(3));
        assert!(!w.is_new());
        assert_eq!(w.id_value(), Value::BigInt(3));
    }

    #[test]
    fn mapped_values_follow_declared_order() {
        let w = Widget {
            id: Some(1),
            label: "a".into(),
        };
        assert_eq!(
            mapped_values(&w),
            vec![Value::BigInt(1), Value::Text("a".into())]
        );
    }

    #[test]
    fn roundtrip_through_row() {
        let row = Row::new(
            vec!["id".into(), "label".into()],
            vec![Value::BigInt(9), Value::Text("x".into())],
        );
        let w = Widget::from_row(&row).unwrap();
        assert_eq!(
            w,
            Widget {
                id: Some(9),
                label: "x".into()
            }
        );
    }
}

//! Static mapping metadata.
//!
//! One `EntityMeta` exists per domain type, describing how the type maps to
//! its table: the ordered column list, the identifier column and its
//! generation strategy, association descriptors, and fields excluded from
//! persistence. Metadata is produced by an external bootstrapping step and
//! consumed read-only by the statement builder and the session engine.

use crate::error::{Error, Result};

/// How a row's identifier is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdStrategy {
    /// The caller supplies the identifier; it must be non-null before insert.
    ClientAssigned,
    /// The storage engine generates the identifier on insert, overriding any
    /// client-supplied value.
    #[default]
    DatabaseAssigned,
}

/// When an association's target rows are fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchPolicy {
    /// Fetch together with the owner.
    Eager,
    /// Fetch on first access.
    #[default]
    Lazy,
}

/// How many target rows an association points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cardinality {
    One,
    #[default]
    Many,
}

/// A mapped column of an entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    /// Rust field name
    pub name: &'static str,
    /// Database column name (may differ from the field name)
    pub column: &'static str,
    /// Whether this is the identifier column
    pub identifier: bool,
}

impl ColumnDef {
    /// Create a new column definition.
    pub const fn new(name: &'static str, column: &'static str) -> Self {
        Self {
            name,
            column,
            identifier: false,
        }
    }

    /// Mark this column as the identifier column.
    pub const fn identifier(mut self, value: bool) -> Self {
        self.identifier = value;
        self
    }
}

/// An association from an owning entity type to a target table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssocDef {
    /// Field on the owning type that holds the association.
    pub field: &'static str,
    /// Table the target rows live in.
    pub target_table: &'static str,
    /// Foreign-key column on the target table pointing back at the owner.
    pub fk_column: &'static str,
    /// When target rows are fetched.
    pub fetch: FetchPolicy,
    /// One or many target rows.
    pub cardinality: Cardinality,
}

impl AssocDef {
    /// Create a new association descriptor (lazy, many by default).
    pub const fn new(
        field: &'static str,
        target_table: &'static str,
        fk_column: &'static str,
    ) -> Self {
        Self {
            field,
            target_table,
            fk_column,
            fetch: FetchPolicy::Lazy,
            cardinality: Cardinality::Many,
        }
    }

    /// Set the fetch policy.
    pub const fn fetch(mut self, policy: FetchPolicy) -> Self {
        self.fetch = policy;
        self
    }

    /// Set the cardinality.
    pub const fn cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }
}

/// Immutable table-mapping description of one domain type.
#[derive(Debug, Clone, Copy)]
pub struct EntityMeta {
    /// Table name.
    pub table: &'static str,
    /// Mapped columns in declared order, identifier included.
    pub columns: &'static [ColumnDef],
    /// Identifier generation strategy.
    pub id_strategy: IdStrategy,
    /// Association descriptors.
    pub associations: &'static [AssocDef],
    /// Field names excluded from persistence.
    pub transient: &'static [&'static str],
}

impl EntityMeta {
    /// Create metadata with the database-assigned identifier strategy and no
    /// associations or transient fields.
    pub const fn new(table: &'static str, columns: &'static [ColumnDef]) -> Self {
        Self {
            table,
            columns,
            id_strategy: IdStrategy::DatabaseAssigned,
            associations: &[],
            transient: &[],
        }
    }

    /// Set the identifier strategy.
    pub const fn id_strategy(mut self, strategy: IdStrategy) -> Self {
        self.id_strategy = strategy;
        self
    }

    /// Set the association descriptors.
    pub const fn associations(mut self, associations: &'static [AssocDef]) -> Self {
        self.associations = associations;
        self
    }

    /// Set the transient field names.
    pub const fn transient(mut self, transient: &'static [&'static str]) -> Self {
        self.transient = transient;
        self
    }

    /// The identifier column, if one is declared.
    pub fn id_column(&self) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.identifier)
    }

    /// Mapped columns other than the identifier.
    pub fn non_id_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| !c.identifier)
    }

    /// Columns included in an INSERT: the identifier column is omitted when
    /// the database assigns identifiers.
    pub fn insert_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        let skip_id = self.id_strategy == IdStrategy::DatabaseAssigned;
        self.columns
            .iter()
            .filter(move |c| !(skip_id && c.identifier))
    }

    /// The association descriptor for a named field.
    pub fn association(&self, field: &str) -> Option<&AssocDef> {
        self.associations.iter().find(|a| a.field == field)
    }

    /// Check structural invariants: exactly one identifier column, unique
    /// column names, and no overlap between mapped and transient fields.
    pub fn validate(&self) -> Result<()> {
        let id_count = self.columns.iter().filter(|c| c.identifier).count();
        if id_count != 1 {
            return Err(Error::validation(
                self.table,
                format!("expected exactly one identifier column, found {id_count}"),
            ));
        }

        for (i, col) in self.columns.iter().enumerate() {
            if self.columns[..i].iter().any(|c| c.column == col.column) {
                return Err(Error::validation(
                    self.table,
                    format!("duplicate mapped column {:?}", col.column),
                ));
            }
            if self.transient.contains(&col.name) {
                return Err(Error::validation(
                    self.table,
                    format!("field {:?} is both mapped and transient", col.name),
                ));
            }
        }

        Ok(())
    }
}

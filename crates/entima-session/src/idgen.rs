//! Identifier resolution for inserts.
//!
//! The generation strategy is a property of the metadata, not of any single
//! call. Database-assigned identifiers come back from the row executor after
//! the INSERT and override whatever the caller supplied; client-assigned
//! identifiers are used verbatim and must be set before the insert.

use entima_core::{EntityMeta, Error, IdStrategy, InsertOutcome, Result, Value};

/// Enforce the client-assigned precondition: the identifier must be set.
pub fn require_client_id(meta: &EntityMeta, id: &Value) -> Result<()> {
    if id.is_null() {
        return Err(Error::validation(
            meta.table,
            "client-assigned identifier must be set before persist",
        ));
    }
    Ok(())
}

/// Resolve the authoritative identifier for a freshly inserted row.
pub fn resolve_insert_id(
    meta: &EntityMeta,
    supplied: Value,
    outcome: &InsertOutcome,
) -> Result<Value> {
    match meta.id_strategy {
        IdStrategy::DatabaseAssigned => outcome.generated_id.clone().ok_or_else(|| {
            Error::execution(format!(
                "executor reported no generated key for insert into {}",
                meta.table
            ))
        }),
        IdStrategy::ClientAssigned => {
            require_client_id(meta, &supplied)?;
            Ok(supplied)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entima_core::ColumnDef;

    const COLUMNS: &[ColumnDef] = &[ColumnDef::new("id", "id").identifier(true)];
    const DB_ASSIGNED: EntityMeta = EntityMeta::new("users", COLUMNS);
    const CLIENT_ASSIGNED: EntityMeta =
        EntityMeta::new("users", COLUMNS).id_strategy(IdStrategy::ClientAssigned);

    #[test]
    fn database_assigned_takes_generated_key() {
        let outcome = InsertOutcome::with_generated_id(1, 42_i64);
        let id = resolve_insert_id(&DB_ASSIGNED, Value::BigInt(20), &outcome).unwrap();
        assert_eq!(id, Value::BigInt(42));
    }

    #[test]
    fn database_assigned_requires_generated_key() {
        let outcome = InsertOutcome::new(1);
        let err = resolve_insert_id(&DB_ASSIGNED, Value::Null, &outcome).unwrap_err();
        assert!(matches!(err, Error::Execution(_)));
    }

    #[test]
    fn client_assigned_uses_supplied_id() {
        let outcome = InsertOutcome::new(1);
        let id = resolve_insert_id(&CLIENT_ASSIGNED, Value::BigInt(7), &outcome).unwrap();
        assert_eq!(id, Value::BigInt(7));
    }

    #[test]
    fn client_assigned_rejects_null_id() {
        let outcome = InsertOutcome::new(1);
        let err = resolve_insert_id(&CLIENT_ASSIGNED, Value::Null, &outcome).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn require_client_id_accepts_non_null() {
        assert!(require_client_id(&CLIENT_ASSIGNED, &Value::BigInt(1)).is_ok());
        assert!(require_client_id(&CLIENT_ASSIGNED, &Value::Null).is_err());
    }
}

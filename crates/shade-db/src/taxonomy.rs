//! The `operation_taxonomy` lookup table.
//!
//! Its DDL, seed rows, and the allowed-id check are all generated from
//! `OperationCode::ALL`, so the stored taxonomy cannot be authored separately
//! from the enum the triggers are generated from.

use shade_core::OperationCode;

use crate::ShadeDb;
use crate::error::DatabaseError;
use crate::sql::quote_literal;

pub const TAXONOMY_TABLE: &str = "operation_taxonomy";

/// Idempotent DDL + seed + immutability guards.
pub(crate) fn schema_sql() -> String {
    let ids = OperationCode::ALL
        .iter()
        .map(|op| op.code().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let rows = OperationCode::ALL
        .iter()
        .map(|op| format!("({}, {})", op.code(), quote_literal(op.label())))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "CREATE TABLE IF NOT EXISTS {TAXONOMY_TABLE} (
    id    INTEGER PRIMARY KEY CHECK (id IN ({ids})),
    label TEXT NOT NULL UNIQUE
);

INSERT OR IGNORE INTO {TAXONOMY_TABLE} (id, label) VALUES {rows};

CREATE TRIGGER IF NOT EXISTS {TAXONOMY_TABLE}_no_update
BEFORE UPDATE ON {TAXONOMY_TABLE}
BEGIN
    SELECT RAISE(ABORT, '{TAXONOMY_TABLE} is immutable');
END;

CREATE TRIGGER IF NOT EXISTS {TAXONOMY_TABLE}_no_delete
BEFORE DELETE ON {TAXONOMY_TABLE}
BEGIN
    SELECT RAISE(ABORT, '{TAXONOMY_TABLE} is immutable');
END;
"
    )
}

impl ShadeDb {
    /// Compare the stored taxonomy with `OperationCode::ALL`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::TaxonomyDrift` if any row is missing, extra, or
    /// relabelled.
    pub async fn verify_operation_taxonomy(&self) -> Result<(), DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT id, label FROM {TAXONOMY_TABLE} ORDER BY id"),
                (),
            )
            .await?;

        let mut stored = Vec::new();
        while let Some(row) = rows.next().await? {
            stored.push((row.get::<i64>(0)?, row.get::<String>(1)?));
        }

        let expected: Vec<(i64, String)> = OperationCode::ALL
            .iter()
            .map(|op| (op.code(), op.label().to_string()))
            .collect();

        if stored != expected {
            return Err(DatabaseError::TaxonomyDrift(format!(
                "expected {expected:?}, found {stored:?}"
            )));
        }
        Ok(())
    }
}

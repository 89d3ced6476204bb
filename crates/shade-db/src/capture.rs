//! Reading captured rows back out of audit tables.
//!
//! Audit tables are generated, so columns are read by position from a
//! select list built from the registry entry, never with `SELECT *`.

use std::collections::BTreeMap;

use shade_core::entity::{
    AUDIT_CHANGED_AT_COLUMN, AUDIT_EDITOR_COLUMN, AUDIT_ID_COLUMN, AUDIT_OPERATION_COLUMN,
};
use shade_core::record::{AuditRecord, CellValue, HistoryEntry};
use shade_core::{AuditTableVersion, OperationCode};

use crate::ShadeDb;
use crate::error::DatabaseError;
use crate::helpers::{cell_to_value, value_to_cell};
use crate::sql::quote_ident;

/// Metadata columns read ahead of the snapshot, in this order.
const META_COLUMNS: i32 = 4;

// Rows handed to `row_to_record` carry the rowid at `offset`, then the
// metadata columns, then the snapshot.

impl ShadeDb {
    /// Every row of one audit table, in capture order.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the table is missing or a row carries an
    /// operation code outside the taxonomy.
    pub async fn audit_records(
        &self,
        version: &AuditTableVersion,
    ) -> Result<Vec<AuditRecord>, DatabaseError> {
        let names: Vec<&str> = version.columns.iter().map(|c| c.name.as_str()).collect();
        let sql = format!(
            "SELECT rowid, {} FROM {} ORDER BY rowid",
            select_list(version.editor.is_some(), &names),
            quote_ident(&version.audit_table),
        );

        let mut rows = self.conn().query(&sql, ()).await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(row_to_record(&row, 0, version.editor.is_some(), &names)?);
        }
        Ok(out)
    }

    /// Number of rows in an audit table.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the table does not exist.
    pub async fn audit_count(&self, audit_table: &str) -> Result<i64, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT COUNT(*) FROM {}", quote_ident(audit_table)),
                (),
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(row.get::<i64>(0)?)
    }

    /// History of one business key across every version in `versions`.
    ///
    /// Issues a single `UNION ALL` over the version tables, filtered on the
    /// key in each branch. Rows are projected onto the columns every version
    /// shares; versions whose shape lacks a key column are skipped. Results
    /// are ordered oldest version first, then capture order.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InvalidState` if `key` does not name exactly
    /// the key columns of the newest version.
    pub async fn history(
        &self,
        versions: &[AuditTableVersion],
        key: &[(String, CellValue)],
    ) -> Result<Vec<HistoryEntry>, DatabaseError> {
        let Some(newest) = versions.last() else {
            return Ok(Vec::new());
        };

        let key_names: Vec<&str> = newest.key_columns().iter().map(|c| c.name.as_str()).collect();
        let mut params = Vec::with_capacity(key_names.len());
        for name in &key_names {
            let value = key
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v)
                .ok_or_else(|| {
                    DatabaseError::InvalidState(format!(
                        "history key for '{}' is missing column '{name}'",
                        newest.entity
                    ))
                })?;
            params.push(cell_to_value(value));
        }
        if key.len() != key_names.len() {
            return Err(DatabaseError::InvalidState(format!(
                "history key for '{}' must name exactly: {}",
                newest.entity,
                key_names.join(", ")
            )));
        }

        let usable: Vec<(usize, &AuditTableVersion)> = versions
            .iter()
            .enumerate()
            .filter(|(_, v)| key_names.iter().all(|k| v.columns.iter().any(|c| c.name == *k)))
            .collect();
        if usable.len() < versions.len() {
            tracing::debug!(
                entity = %newest.entity,
                skipped = versions.len() - usable.len(),
                "versions without the current key columns left out of history"
            );
        }

        let shared: Vec<&str> = newest
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .filter(|name| {
                usable
                    .iter()
                    .all(|(_, v)| v.columns.iter().any(|c| c.name == *name))
            })
            .collect();

        let filter = key_names
            .iter()
            .enumerate()
            .map(|(i, k)| format!("{} = ?{}", quote_ident(k), i + 1))
            .collect::<Vec<_>>()
            .join(" AND ");

        let branches: Vec<String> = usable
            .iter()
            .map(|(idx, v)| {
                format!(
                    "SELECT {idx} AS version_idx, rowid AS seq, {} FROM {} WHERE {filter}",
                    select_list(v.editor.is_some(), &shared),
                    quote_ident(&v.audit_table),
                )
            })
            .collect();
        if branches.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "{}\nORDER BY version_idx, seq",
            branches.join("\nUNION ALL\n")
        );
        tracing::debug!(entity = %newest.entity, branches = branches.len(), "history query");

        let mut rows = self
            .conn()
            .query(&sql, libsql::params_from_iter(params))
            .await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            let idx = usize::try_from(row.get::<i64>(0)?)
                .map_err(|e| DatabaseError::Query(format!("Invalid version index: {e}")))?;
            let version = versions.get(idx).ok_or_else(|| {
                DatabaseError::Query(format!("history row from unknown version {idx}"))
            })?;
            out.push(HistoryEntry {
                audit_table: version.audit_table.clone(),
                record: row_to_record(&row, 1, version.editor.is_some(), &shared)?,
            });
        }
        Ok(out)
    }
}

fn meta_list(editor: &str) -> String {
    [
        quote_ident(AUDIT_ID_COLUMN),
        quote_ident(AUDIT_OPERATION_COLUMN),
        quote_ident(AUDIT_CHANGED_AT_COLUMN),
        editor.to_string(),
    ]
    .join(", ")
}

fn with_snapshot(meta: String, columns: &[&str]) -> String {
    std::iter::once(meta)
        .chain(columns.iter().map(|c| quote_ident(c)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Metadata plus snapshot columns. Without an editor column a NULL stands in
/// so every select list has the same width.
fn select_list(has_editor: bool, columns: &[&str]) -> String {
    let editor = if has_editor {
        quote_ident(AUDIT_EDITOR_COLUMN)
    } else {
        format!("NULL AS {}", quote_ident(AUDIT_EDITOR_COLUMN))
    };
    with_snapshot(meta_list(&editor), columns)
}

fn row_to_record(
    row: &libsql::Row,
    offset: i32,
    has_editor: bool,
    columns: &[&str],
) -> Result<AuditRecord, DatabaseError> {
    let meta = offset + 1;
    let operation = OperationCode::try_from(row.get::<i64>(meta + 1)?)?;
    let editor = if has_editor {
        Some(value_to_cell(row.get_value(meta + 3)?))
    } else {
        None
    };

    let mut snapshot = BTreeMap::new();
    let first = meta + META_COLUMNS;
    for (i, name) in (first..).zip(columns) {
        snapshot.insert((*name).to_string(), value_to_cell(row.get_value(i)?));
    }

    Ok(AuditRecord {
        audit_id: row.get::<String>(meta)?,
        seq: row.get::<i64>(offset)?,
        operation,
        changed_at: row.get::<String>(meta + 2)?,
        editor,
        snapshot,
    })
}

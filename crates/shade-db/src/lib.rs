//! # shade-db
//!
//! libSQL storage for shade's trigger-based audit capture.
//!
//! - `generator`: builds matched up/down SQL for track, cutover and untrack
//! - `migrations`: base schema plus the `schema_migrations` ledger
//! - `taxonomy`: the immutable `operation_taxonomy` table
//! - `capture`: reads audit rows back, including history across cutovers
//! - `service`: `AuditService`, the registry-aware entry point
//!
//! Uses the `libsql` crate (C `SQLite` fork, v0.9.29).

pub mod capture;
pub mod error;
pub mod generator;
pub mod helpers;
pub mod migrations;
pub mod service;
pub mod sql;
pub mod taxonomy;

use error::DatabaseError;
use libsql::Builder;
use shade_core::{AuditRegistry, AuditTableVersion, Column};

use crate::generator::VERSIONS_TABLE;
use crate::helpers::{get_opt_string, parse_date, parse_json, parse_optional_date};

/// Central database handle.
///
/// Wraps a libSQL database and connection. Opening it installs the base
/// schema and checks the operation taxonomy.
pub struct ShadeDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
}

impl ShadeDb {
    /// Open a local database at the given path, or `":memory:"`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened, the base
    /// schema fails, or the stored taxonomy has drifted.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        // Enable foreign keys (must be per-connection in SQLite)
        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("PRAGMA foreign_keys: {e}")))?;

        let shade_db = Self { db, conn };
        shade_db.run_base_migrations().await?;
        shade_db.verify_operation_taxonomy().await?;
        tracing::debug!(path, "opened audit store");
        Ok(shade_db)
    }

    /// Access the underlying libSQL connection for direct queries.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }

    /// Rebuild the registry from `audit_table_versions`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if a row cannot be parsed or the stored chain
    /// is inconsistent.
    pub async fn load_registry(&self) -> Result<AuditRegistry, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT entity, source_table, audit_table, cutover_date, retired_on, key_len, columns, editor
                     FROM {VERSIONS_TABLE} ORDER BY entity, cutover_date"
                ),
                (),
            )
            .await?;

        let mut versions = Vec::new();
        while let Some(row) = rows.next().await? {
            versions.push(row_to_version(&row)?);
        }
        Ok(AuditRegistry::from_versions(versions)?)
    }

    /// Whether a table with this exact name exists.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the catalog query fails.
    pub async fn table_exists(&self, name: &str) -> Result<bool, DatabaseError> {
        self.catalog_has("table", name).await
    }

    /// Whether a trigger with this exact name exists.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the catalog query fails.
    pub async fn trigger_exists(&self, name: &str) -> Result<bool, DatabaseError> {
        self.catalog_has("trigger", name).await
    }

    /// Column names of `table`, in declaration order.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the pragma query fails.
    pub async fn table_columns(&self, table: &str) -> Result<Vec<String>, DatabaseError> {
        let mut rows = self
            .conn
            .query("SELECT name FROM pragma_table_info(?1) ORDER BY cid", [table])
            .await?;
        let mut names = Vec::new();
        while let Some(row) = rows.next().await? {
            names.push(row.get::<String>(0)?);
        }
        Ok(names)
    }

    async fn catalog_has(&self, kind: &str, name: &str) -> Result<bool, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT 1 FROM sqlite_master WHERE type = ?1 AND name = ?2",
                [kind, name],
            )
            .await?;
        Ok(rows.next().await?.is_some())
    }
}

fn row_to_version(row: &libsql::Row) -> Result<AuditTableVersion, DatabaseError> {
    let key_len = usize::try_from(row.get::<i64>(5)?)
        .map_err(|e| DatabaseError::Query(format!("Invalid key_len: {e}")))?;
    let editor = get_opt_string(row, 7)?
        .map(|json| parse_json::<Column>(&json))
        .transpose()?;

    Ok(AuditTableVersion {
        entity: row.get::<String>(0)?,
        source_table: row.get::<String>(1)?,
        audit_table: row.get::<String>(2)?,
        cutover_date: parse_date(&row.get::<String>(3)?)?,
        retired_on: parse_optional_date(get_opt_string(row, 4)?.as_deref())?,
        key_len,
        columns: parse_json(&row.get::<String>(6)?)?,
        editor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use shade_core::registry::audit_table_name;
    use shade_core::{ColumnType, TrackedEntity};

    async fn test_db() -> ShadeDb {
        ShadeDb::open_local(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn open_local_creates_base_schema() {
        let db = test_db().await;
        for table in ["audit_table_versions", "schema_migrations", "operation_taxonomy"] {
            assert!(db.table_exists(table).await.unwrap(), "table '{table}' should exist");
        }
        assert!(db.trigger_exists("operation_taxonomy_no_update").await.unwrap());
    }

    #[tokio::test]
    async fn reopening_file_database_is_idempotent() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("shade.db");
        let path = path.to_str().unwrap();

        drop(ShadeDb::open_local(path).await.unwrap());
        let db = ShadeDb::open_local(path).await.unwrap();

        let mut rows = db
            .conn()
            .query("SELECT COUNT(*) FROM operation_taxonomy", ())
            .await
            .unwrap();
        let count: i64 = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn foreign_keys_enabled() {
        let db = test_db().await;
        let mut rows = db.conn().query("PRAGMA foreign_keys", ()).await.unwrap();
        let on: i64 = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(on, 1);
    }

    #[tokio::test]
    async fn registry_round_trips_through_storage() {
        let db = test_db().await;
        let entity = TrackedEntity::from_toml_str(
            r#"
            name = "widget"
            table = "widgets"
            primary_key = [{ name = "id", column_type = "integer" }]
            columns = [
                { name = "name", column_type = "text" },
                { name = "last_editor_id", column_type = "uuid", nullable = true },
            ]
            editor = "last_editor_id"
            "#,
        )
        .unwrap();
        let on = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let version =
            AuditTableVersion::for_entity(&entity, audit_table_name("audit_", "widget", on), on);

        db.conn()
            .execute_batch(
                "CREATE TABLE widgets (id INTEGER PRIMARY KEY, name TEXT, last_editor_id TEXT);",
            )
            .await
            .unwrap();
        db.apply(&generator::install(&version, None).unwrap())
            .await
            .unwrap();

        let registry = db.load_registry().await.unwrap();
        assert_eq!(registry.current("widget"), Some(&version));
        let editor = registry.current("widget").unwrap().editor.clone().unwrap();
        assert_eq!(editor.column_type, ColumnType::Uuid);
    }
}

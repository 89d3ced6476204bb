//! Migration runner.
//!
//! Two layers: the embedded base schema (registry, ledger, operation
//! taxonomy) runs on every open and is idempotent; generated capture
//! migrations go through the `schema_migrations` ledger so the most recent
//! one can be reverted with the `down` SQL it was applied with.

use serde::Serialize;

use crate::ShadeDb;
use crate::error::DatabaseError;
use crate::generator::MigrationPair;
use crate::taxonomy;

/// Registry and ledger tables.
const MIGRATION_001: &str = include_str!("../migrations/001_base.sql");

/// One row of the migration ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedMigration {
    pub version: i64,
    pub name: String,
    pub applied_at: String,
}

impl ShadeDb {
    /// Run the embedded base schema.
    pub(crate) async fn run_base_migrations(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(MIGRATION_001)
            .await
            .map_err(|e| DatabaseError::Migration(format!("001_base: {e}")))?;
        self.conn
            .execute_batch(&taxonomy::schema_sql())
            .await
            .map_err(|e| DatabaseError::Migration(format!("operation_taxonomy: {e}")))?;
        Ok(())
    }

    /// Apply a generated migration and record it in the ledger.
    ///
    /// The `up` SQL and the ledger insert share one transaction: on failure
    /// nothing of the migration remains.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::AlreadyApplied` if the name is in the ledger,
    /// or `DatabaseError::Migration` if the `up` SQL fails.
    pub async fn apply(&self, pair: &MigrationPair) -> Result<AppliedMigration, DatabaseError> {
        let tx = self.conn.transaction().await?;

        let mut rows = tx
            .query(
                "SELECT 1 FROM schema_migrations WHERE name = ?1",
                [pair.name()],
            )
            .await?;
        if rows.next().await?.is_some() {
            drop(rows);
            tx.rollback().await?;
            return Err(DatabaseError::AlreadyApplied(pair.name().to_string()));
        }
        drop(rows);

        if let Err(e) = tx.execute_batch(pair.up()).await {
            tx.rollback().await?;
            return Err(DatabaseError::Migration(format!("{}: {e}", pair.name())));
        }

        tx.execute(
            "INSERT INTO schema_migrations (version, name, up_sql, down_sql)
             VALUES ((SELECT COALESCE(MAX(version), 0) + 1 FROM schema_migrations), ?1, ?2, ?3)",
            libsql::params![pair.name(), pair.up(), pair.down()],
        )
        .await?;

        let applied = latest_in(&tx)
            .await?
            .ok_or(DatabaseError::NoResult)?;
        tx.commit().await?;

        tracing::info!(
            version = applied.version,
            name = %applied.name,
            "applied migration"
        );
        Ok(applied)
    }

    /// Revert the most recently applied migration with its stored `down` SQL.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NothingToRevert` on an empty ledger, or
    /// `DatabaseError::Migration` if the `down` SQL fails (the ledger is left
    /// untouched).
    pub async fn revert_last(&self) -> Result<AppliedMigration, DatabaseError> {
        let tx = self.conn.transaction().await?;

        let Some(last) = latest_in(&tx).await? else {
            tx.rollback().await?;
            return Err(DatabaseError::NothingToRevert);
        };

        let mut rows = tx
            .query(
                "SELECT down_sql FROM schema_migrations WHERE version = ?1",
                [last.version],
            )
            .await?;
        let down: String = rows
            .next()
            .await?
            .ok_or(DatabaseError::NoResult)?
            .get(0)?;
        drop(rows);

        if let Err(e) = tx.execute_batch(&down).await {
            tx.rollback().await?;
            return Err(DatabaseError::Migration(format!("revert {}: {e}", last.name)));
        }

        tx.execute(
            "DELETE FROM schema_migrations WHERE version = ?1",
            [last.version],
        )
        .await?;
        tx.commit().await?;

        tracing::info!(version = last.version, name = %last.name, "reverted migration");
        Ok(last)
    }

    /// Ledger contents, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn applied(&self) -> Result<Vec<AppliedMigration>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT version, name, applied_at FROM schema_migrations ORDER BY version",
                (),
            )
            .await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(row_to_applied(&row)?);
        }
        Ok(out)
    }
}

fn row_to_applied(row: &libsql::Row) -> Result<AppliedMigration, DatabaseError> {
    Ok(AppliedMigration {
        version: row.get::<i64>(0)?,
        name: row.get::<String>(1)?,
        applied_at: row.get::<String>(2)?,
    })
}

async fn latest_in(conn: &libsql::Connection) -> Result<Option<AppliedMigration>, DatabaseError> {
    let mut rows = conn
        .query(
            "SELECT version, name, applied_at FROM schema_migrations ORDER BY version DESC LIMIT 1",
            (),
        )
        .await?;
    rows.next().await?.as_ref().map(row_to_applied).transpose()
}

//! Registry-aware audit operations.
//!
//! `AuditService` wraps `ShadeDb` and the configured audit table prefix. It
//! loads the registry, checks a request against it and the live schema, asks
//! the generator for a `MigrationPair`, and applies that pair through the
//! ledger. The `plan_*` methods stop before applying.
//!
//! Effective dates may not lie in the future. Capture switches tables at the
//! moment a migration is applied, so a date ahead of today would name a
//! version whose interval does not match the rows it receives.

use chrono::{NaiveDate, Utc};
use shade_config::ShadeConfig;
use shade_core::diff::{ShapeDiff, diff};
use shade_core::record::{AuditRecord, CellValue, HistoryEntry};
use shade_core::registry::audit_table_name;
use shade_core::{AuditRegistry, AuditTableVersion, OperationCode, TrackedEntity};

use crate::ShadeDb;
use crate::error::DatabaseError;
use crate::generator::{self, MigrationPair, TableChange, trigger_name};
use crate::migrations::AppliedMigration;

/// A generated migration and the registry entry it would create or retire.
#[derive(Debug, Clone)]
pub struct Plan {
    pub migration: MigrationPair,
    pub version: AuditTableVersion,
    /// Version a cutover retires, as it reads once the migration is applied.
    pub previous: Option<AuditTableVersion>,
    /// Shape change that motivated a cutover; empty for track and untrack.
    pub diff: ShapeDiff,
}

/// Entry point for tracking, cutover, untracking and reading audit data.
pub struct AuditService {
    db: ShadeDb,
    table_prefix: String,
}

impl AuditService {
    /// Open a local database and use `table_prefix` for new audit tables.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn open_local(path: &str, table_prefix: &str) -> Result<Self, DatabaseError> {
        let db = ShadeDb::open_local(path).await?;
        Ok(Self::new(db, table_prefix))
    }

    /// Open the database named by the configuration.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn from_config(config: &ShadeConfig) -> Result<Self, DatabaseError> {
        Self::open_local(&config.database.path, &config.audit.table_prefix).await
    }

    #[must_use]
    pub fn new(db: ShadeDb, table_prefix: &str) -> Self {
        Self {
            db,
            table_prefix: table_prefix.to_string(),
        }
    }

    /// Access the underlying database handle.
    #[must_use]
    pub const fn db(&self) -> &ShadeDb {
        &self.db
    }

    #[must_use]
    pub fn table_prefix(&self) -> &str {
        &self.table_prefix
    }

    /// Current registry state.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the stored registry cannot be read.
    pub async fn registry(&self) -> Result<AuditRegistry, DatabaseError> {
        self.db.load_registry().await
    }

    // -----------------------------------------------------------------------
    // Track
    // -----------------------------------------------------------------------

    /// Generate the migration that starts tracking `entity` on `date`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InvalidState` if `date` is in the future, the
    /// entity already has audit versions, its live table or columns are
    /// missing, or its trigger names are taken. Descriptor problems surface
    /// as `DatabaseError::Core`.
    pub async fn plan_track(
        &self,
        entity: &TrackedEntity,
        date: NaiveDate,
        change: Option<&TableChange>,
    ) -> Result<Plan, DatabaseError> {
        entity.validate()?;
        check_not_future(date)?;
        let mut registry = self.registry().await?;
        if registry.latest(&entity.name).is_some() {
            return Err(DatabaseError::InvalidState(format!(
                "entity '{}' already has audit versions; use cutover",
                entity.name
            )));
        }

        self.check_live_table(entity, change).await?;
        for op in OperationCode::ALL {
            let name = trigger_name(&entity.name, op);
            if self.db.trigger_exists(&name).await? {
                return Err(DatabaseError::InvalidState(format!(
                    "trigger '{name}' already exists"
                )));
            }
        }

        let version = self.new_version(entity, date).await?;
        registry.record(version.clone())?;

        let migration = generator::install(&version, change)?;
        tracing::debug!(
            name = migration.name(),
            up_bytes = migration.up().len(),
            down_bytes = migration.down().len(),
            "generated track migration"
        );
        Ok(Plan {
            migration,
            version,
            previous: None,
            diff: ShapeDiff::default(),
        })
    }

    /// Start tracking `entity`.
    ///
    /// # Errors
    ///
    /// See [`Self::plan_track`]; also returns `DatabaseError::Migration` if
    /// the generated SQL fails.
    pub async fn track(
        &self,
        entity: &TrackedEntity,
        date: NaiveDate,
        change: Option<&TableChange>,
    ) -> Result<AuditTableVersion, DatabaseError> {
        let plan = self.plan_track(entity, date, change).await?;
        self.db.apply(&plan.migration).await?;
        tracing::info!(
            entity = %entity.name,
            audit_table = %plan.version.audit_table,
            "tracking started"
        );
        Ok(plan.version)
    }

    // -----------------------------------------------------------------------
    // Cutover
    // -----------------------------------------------------------------------

    /// Generate the cutover from the current version of `entity` to a new
    /// version matching the descriptor.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::UnknownEntity` if the entity has no current
    /// version, and `DatabaseError::InvalidState` if `date` is in the future,
    /// the descriptor's shape is unchanged or the new audit table already
    /// exists.
    pub async fn plan_cutover(
        &self,
        entity: &TrackedEntity,
        date: NaiveDate,
        change: Option<&TableChange>,
    ) -> Result<Plan, DatabaseError> {
        entity.validate()?;
        check_not_future(date)?;
        let mut registry = self.registry().await?;
        let previous = registry
            .current(&entity.name)
            .cloned()
            .ok_or_else(|| DatabaseError::UnknownEntity(entity.name.clone()))?;

        let shape = diff(&previous, entity);
        if shape.is_empty() {
            tracing::warn!(
                entity = %entity.name,
                audit_table = %previous.audit_table,
                "cutover requested but the shape is unchanged"
            );
            return Err(DatabaseError::InvalidState(format!(
                "entity '{}' already matches '{}'; no cutover needed",
                entity.name, previous.audit_table
            )));
        }
        if previous.source_table != entity.table {
            return Err(DatabaseError::InvalidState(format!(
                "entity '{}' is attached to '{}', not '{}'",
                entity.name, previous.source_table, entity.table
            )));
        }

        self.check_live_table(entity, change).await?;
        let next = self.new_version(entity, date).await?;
        registry.record(next.clone())?;

        let migration = generator::cutover(&previous, &next, change)?;
        tracing::debug!(
            name = migration.name(),
            added = shape.added.len(),
            dropped = shape.dropped.len(),
            retyped = shape.retyped.len(),
            "generated cutover migration"
        );
        let mut retired = previous;
        retired.retired_on = Some(next.cutover_date);
        Ok(Plan {
            migration,
            version: next,
            previous: Some(retired),
            diff: shape,
        })
    }

    /// Retire the current version of `entity` and start a new one. Returns
    /// the applied plan: the new version, the retired one and the diff.
    ///
    /// # Errors
    ///
    /// See [`Self::plan_cutover`]; also returns `DatabaseError::Migration`
    /// if the generated SQL fails, leaving the previous version in place.
    pub async fn cutover(
        &self,
        entity: &TrackedEntity,
        date: NaiveDate,
        change: Option<&TableChange>,
    ) -> Result<Plan, DatabaseError> {
        let plan = self.plan_cutover(entity, date, change).await?;
        self.db.apply(&plan.migration).await?;
        tracing::info!(
            entity = %entity.name,
            retired = plan.previous.as_ref().map_or("", |v| v.audit_table.as_str()),
            audit_table = %plan.version.audit_table,
            "cutover complete"
        );
        Ok(plan)
    }

    // -----------------------------------------------------------------------
    // Untrack / revert
    // -----------------------------------------------------------------------

    /// Generate the migration that stops capture for `entity` on `date`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::UnknownEntity` if the entity has no current
    /// version, `DatabaseError::InvalidState` if `date` is in the future, or
    /// `DatabaseError::Core` if `date` precedes its cutover date.
    pub async fn plan_untrack(&self, entity: &str, date: NaiveDate) -> Result<Plan, DatabaseError> {
        check_not_future(date)?;
        let mut registry = self.registry().await?;
        let current = registry
            .current(entity)
            .cloned()
            .ok_or_else(|| DatabaseError::UnknownEntity(entity.to_string()))?;
        registry.retire(entity, date)?;

        let migration = generator::untrack(&current, date)?;
        let mut version = current;
        version.retired_on = Some(date);
        Ok(Plan {
            migration,
            version,
            previous: None,
            diff: ShapeDiff::default(),
        })
    }

    /// Stop capture for `entity`; its audit tables are kept.
    ///
    /// # Errors
    ///
    /// See [`Self::plan_untrack`].
    pub async fn untrack(
        &self,
        entity: &str,
        date: NaiveDate,
    ) -> Result<AuditTableVersion, DatabaseError> {
        let plan = self.plan_untrack(entity, date).await?;
        self.db.apply(&plan.migration).await?;
        tracing::info!(entity, audit_table = %plan.version.audit_table, "tracking stopped");
        Ok(plan.version)
    }

    /// Revert the last applied migration.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NothingToRevert` on an empty ledger.
    pub async fn revert_last(&self) -> Result<AppliedMigration, DatabaseError> {
        self.db.revert_last().await
    }

    /// Applied migrations, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the ledger cannot be read.
    pub async fn migrations(&self) -> Result<Vec<AppliedMigration>, DatabaseError> {
        self.db.applied().await
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Versions of one entity, or of every entity when `entity` is `None`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::UnknownEntity` if a named entity has no versions.
    pub async fn versions(
        &self,
        entity: Option<&str>,
    ) -> Result<Vec<AuditTableVersion>, DatabaseError> {
        let registry = self.registry().await?;
        match entity {
            Some(name) => {
                let versions = registry.versions(name);
                if versions.is_empty() {
                    return Err(DatabaseError::UnknownEntity(name.to_string()));
                }
                Ok(versions.to_vec())
            }
            None => Ok(registry.all().cloned().collect()),
        }
    }

    /// Rows of one audit table of `entity`: the named table, or the newest.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::UnknownEntity` if the entity has no versions
    /// and `DatabaseError::InvalidState` if `audit_table` is not one of them.
    pub async fn records(
        &self,
        entity: &str,
        audit_table: Option<&str>,
    ) -> Result<(AuditTableVersion, Vec<AuditRecord>), DatabaseError> {
        let registry = self.registry().await?;
        let version = match audit_table {
            Some(table) => registry
                .versions(entity)
                .iter()
                .find(|v| v.audit_table == table)
                .ok_or_else(|| {
                    DatabaseError::InvalidState(format!(
                        "'{table}' is not an audit table of '{entity}'"
                    ))
                })?,
            None => registry
                .latest(entity)
                .ok_or_else(|| DatabaseError::UnknownEntity(entity.to_string()))?,
        }
        .clone();
        let records = self.db.audit_records(&version).await?;
        Ok((version, records))
    }

    /// History of one business key of `entity` across every cutover.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::UnknownEntity` if the entity has no versions.
    pub async fn history(
        &self,
        entity: &str,
        key: &[(String, CellValue)],
    ) -> Result<Vec<HistoryEntry>, DatabaseError> {
        let registry = self.registry().await?;
        let versions = registry.versions(entity);
        if versions.is_empty() {
            return Err(DatabaseError::UnknownEntity(entity.to_string()));
        }
        self.db.history(versions, key).await
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn new_version(
        &self,
        entity: &TrackedEntity,
        date: NaiveDate,
    ) -> Result<AuditTableVersion, DatabaseError> {
        let table = audit_table_name(&self.table_prefix, &entity.name, date);
        if self.db.table_exists(&table).await? {
            return Err(DatabaseError::InvalidState(format!(
                "audit table '{table}' already exists"
            )));
        }
        Ok(AuditTableVersion::for_entity(entity, table, date))
    }

    /// The live table must exist; without a bundled change it must also
    /// already carry every snapshot column.
    async fn check_live_table(
        &self,
        entity: &TrackedEntity,
        change: Option<&TableChange>,
    ) -> Result<(), DatabaseError> {
        if !self.db.table_exists(&entity.table).await? {
            return Err(DatabaseError::InvalidState(format!(
                "live table '{}' does not exist",
                entity.table
            )));
        }
        if change.is_some() {
            return Ok(());
        }

        let live = self.db.table_columns(&entity.table).await?;
        let missing: Vec<&str> = entity
            .all_columns()
            .map(|c| c.name.as_str())
            .filter(|name| !live.iter().any(|l| l.eq_ignore_ascii_case(name)))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DatabaseError::InvalidState(format!(
                "live table '{}' has no column(s): {}",
                entity.table,
                missing.join(", ")
            )))
        }
    }
}

/// Reject effective dates after today (UTC).
fn check_not_future(date: NaiveDate) -> Result<(), DatabaseError> {
    let today = Utc::now().date_naive();
    if date > today {
        return Err(DatabaseError::InvalidState(format!(
            "effective date {date} is after today ({today})"
        )));
    }
    Ok(())
}

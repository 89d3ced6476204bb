//! Append-only registry of audit table versions.
//!
//! Each tracked entity owns a chain of `AuditTableVersion`s ordered by
//! cutover date. Exactly one version per entity is current (`retired_on` is
//! `None`); older ones are frozen partitions kept for historical reads. The
//! chain only grows through a cutover and only shrinks when a cutover is
//! reverted.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entity::{Column, TrackedEntity};
use crate::errors::CoreError;

/// Date format embedded in audit table names.
pub const TABLE_DATE_FORMAT: &str = "%Y%m%d";

/// Build an audit table name: `{prefix}{entity}_{YYYYMMDD}`.
#[must_use]
pub fn audit_table_name(prefix: &str, entity: &str, date: NaiveDate) -> String {
    format!("{prefix}{entity}_{}", date.format(TABLE_DATE_FORMAT))
}

/// The audit table (and trigger set) active for an entity over
/// `[cutover_date, retired_on)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AuditTableVersion {
    pub entity: String,
    /// Live table the triggers of this version were attached to.
    pub source_table: String,
    pub audit_table: String,
    pub cutover_date: NaiveDate,
    /// Snapshot columns: key columns first, in trigger order.
    pub columns: Vec<Column>,
    /// Number of leading `columns` that form the business key.
    pub key_len: usize,
    pub editor: Option<Column>,
    pub retired_on: Option<NaiveDate>,
}

impl AuditTableVersion {
    /// Describe the version a descriptor would get at `date`.
    #[must_use]
    pub fn for_entity(entity: &TrackedEntity, audit_table: String, date: NaiveDate) -> Self {
        Self {
            entity: entity.name.clone(),
            source_table: entity.table.clone(),
            audit_table,
            cutover_date: date,
            columns: entity.snapshot_columns(),
            key_len: entity.primary_key.len(),
            editor: entity.editor_column().cloned(),
            retired_on: None,
        }
    }

    #[must_use]
    pub const fn is_current(&self) -> bool {
        self.retired_on.is_none()
    }

    /// Business key columns.
    #[must_use]
    pub fn key_columns(&self) -> &[Column] {
        &self.columns[..self.key_len.min(self.columns.len())]
    }

    /// Whether `date` falls inside this version's validity interval.
    #[must_use]
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.cutover_date && self.retired_on.is_none_or(|end| date < end)
    }
}

/// In-memory view of every entity's version chain.
#[derive(Debug, Clone, Default)]
pub struct AuditRegistry {
    chains: BTreeMap<String, Vec<AuditTableVersion>>,
}

impl AuditRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from stored versions, in any order.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Registry` if the stored chain is inconsistent.
    pub fn from_versions(
        versions: impl IntoIterator<Item = AuditTableVersion>,
    ) -> Result<Self, CoreError> {
        let mut sorted: Vec<_> = versions.into_iter().collect();
        sorted.sort_by(|a, b| {
            a.entity
                .cmp(&b.entity)
                .then(a.cutover_date.cmp(&b.cutover_date))
        });

        let mut registry = Self::new();
        for version in sorted {
            let chain = registry.chains.entry(version.entity.clone()).or_default();
            if let Some(prev) = chain.last() {
                if prev.retired_on != Some(version.cutover_date) {
                    return Err(CoreError::Registry(format!(
                        "version '{}' is not retired on the cutover date of '{}'",
                        prev.audit_table, version.audit_table
                    )));
                }
            }
            chain.push(version);
        }
        Ok(registry)
    }

    /// Append a new current version, retiring the previous one on its date.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Registry` when the date does not move strictly
    /// forward, the table name is already used, or the new version is not
    /// marked current.
    pub fn record(&mut self, version: AuditTableVersion) -> Result<(), CoreError> {
        if !version.is_current() {
            return Err(CoreError::Registry(format!(
                "new version '{}' must be current",
                version.audit_table
            )));
        }
        if self.find_table(&version.audit_table).is_some() {
            return Err(CoreError::Registry(format!(
                "audit table '{}' already registered",
                version.audit_table
            )));
        }

        let chain = self.chains.entry(version.entity.clone()).or_default();
        if let Some(prev) = chain.last_mut() {
            if version.cutover_date <= prev.cutover_date {
                return Err(CoreError::Registry(format!(
                    "cutover date {} for '{}' is not after {}",
                    version.cutover_date, version.entity, prev.cutover_date
                )));
            }
            if prev.is_current() {
                prev.retired_on = Some(version.cutover_date);
            }
        }
        chain.push(version);
        Ok(())
    }

    /// Retire the current version of `entity` without a successor.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Registry` if the entity has no current version.
    pub fn retire(&mut self, entity: &str, date: NaiveDate) -> Result<(), CoreError> {
        let current = self
            .chains
            .get_mut(entity)
            .and_then(|chain| chain.last_mut())
            .filter(|v| v.is_current())
            .ok_or_else(|| CoreError::Registry(format!("entity '{entity}' is not tracked")))?;
        if date < current.cutover_date {
            return Err(CoreError::Registry(format!(
                "retire date {date} precedes cutover date {}",
                current.cutover_date
            )));
        }
        current.retired_on = Some(date);
        Ok(())
    }

    /// Remove the newest version of `entity` and reopen its predecessor.
    /// Only a reverted cutover does this.
    pub fn pop(&mut self, entity: &str) -> Option<AuditTableVersion> {
        let chain = self.chains.get_mut(entity)?;
        let popped = chain.pop();
        if let Some(prev) = chain.last_mut() {
            prev.retired_on = None;
        }
        if chain.is_empty() {
            self.chains.remove(entity);
        }
        popped
    }

    /// Current version of `entity`, if it is tracked.
    #[must_use]
    pub fn current(&self, entity: &str) -> Option<&AuditTableVersion> {
        self.chains
            .get(entity)
            .and_then(|chain| chain.last())
            .filter(|v| v.is_current())
    }

    /// Newest version of `entity`, current or retired.
    #[must_use]
    pub fn latest(&self, entity: &str) -> Option<&AuditTableVersion> {
        self.chains.get(entity).and_then(|chain| chain.last())
    }

    /// Version whose validity interval contains `date`.
    #[must_use]
    pub fn version_at(&self, entity: &str, date: NaiveDate) -> Option<&AuditTableVersion> {
        self.chains
            .get(entity)?
            .iter()
            .find(|v| v.covers(date))
    }

    /// All versions of `entity`, oldest first.
    #[must_use]
    pub fn versions(&self, entity: &str) -> &[AuditTableVersion] {
        self.chains.get(entity).map_or(&[], Vec::as_slice)
    }

    /// Every registered entity name.
    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.chains.keys().map(String::as_str)
    }

    /// Every version across all entities.
    pub fn all(&self) -> impl Iterator<Item = &AuditTableVersion> {
        self.chains.values().flatten()
    }

    #[must_use]
    pub fn find_table(&self, audit_table: &str) -> Option<&AuditTableVersion> {
        self.all().find(|v| v.audit_table == audit_table)
    }
}

//! Capture migration generator.
//!
//! Every function here returns a [`MigrationPair`]: the forward (`up`) and
//! backward (`down`) SQL produced together from the same inputs. A pair can
//! only be built by this module, so a "create new" step is never authored
//! without its matching "drop old" step, and vice versa.
//!
//! Per tracked entity the generator emits:
//! - one audit table `{prefix}{entity}_{YYYYMMDD}` with append-only guards
//! - three row triggers `AFTER_{INSERT|UPDATE|DELETE}_{ENTITY}` on the live
//!   table, each inserting exactly one audit row
//! - the matching row in `audit_table_versions`

use chrono::NaiveDate;
use serde::Serialize;
use shade_core::entity::{
    AUDIT_CHANGED_AT_COLUMN, AUDIT_EDITOR_COLUMN, AUDIT_ID_COLUMN, AUDIT_OPERATION_COLUMN,
};
use shade_core::registry::TABLE_DATE_FORMAT;
use shade_core::{AuditTableVersion, CoreError, OperationCode};

use crate::sql::{AUDIT_ID_EXPR, NOW_EXPR, ident_list, quote_ident, quote_literal};

/// Registry table written by generated migrations.
pub const VERSIONS_TABLE: &str = "audit_table_versions";

/// Forward and backward SQL of one migration, generated as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationPair {
    name: String,
    up: String,
    down: String,
}

impl MigrationPair {
    fn new(name: String, up: &[String], down: &[String]) -> Self {
        Self {
            name,
            up: up.join("\n\n"),
            down: down.join("\n\n"),
        }
    }

    /// Ledger name, e.g. `20240301_cutover_widget`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn up(&self) -> &str {
        &self.up
    }

    #[must_use]
    pub fn down(&self) -> &str {
        &self.down
    }
}

/// Caller-supplied DDL for the live table, bundled into the same migration.
///
/// `up` runs after the old capture triggers are gone and before the new ones
/// exist, so column drops and renames never collide with trigger bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableChange {
    pub up: String,
    pub down: String,
}

/// Name of the capture trigger for `op` on `entity`.
#[must_use]
pub fn trigger_name(entity: &str, op: OperationCode) -> String {
    format!("AFTER_{}_{}", op.trigger_event(), entity.to_ascii_uppercase())
}

/// Start tracking an entity: audit table, guards, capture triggers, registry row.
///
/// # Errors
///
/// Returns `CoreError::Registry` if `version` is not current.
pub fn install(
    version: &AuditTableVersion,
    change: Option<&TableChange>,
) -> Result<MigrationPair, CoreError> {
    if !version.is_current() {
        return Err(CoreError::Registry(format!(
            "cannot install retired version '{}'",
            version.audit_table
        )));
    }

    let mut up = Vec::new();
    if let Some(change) = change {
        up.push(change.up.clone());
    }
    up.extend(create_audit_table(version));
    up.extend(create_capture_triggers(version));
    up.push(register(version)?);

    let mut down = drop_capture_triggers(&version.entity);
    down.push(unregister(version));
    down.push(drop_audit_table(version));
    if let Some(change) = change {
        down.push(change.down.clone());
    }

    Ok(MigrationPair::new(
        migration_name(version.cutover_date, "track", &version.entity),
        &up,
        &down,
    ))
}

/// Retire `previous` and install `next` in one migration.
///
/// Forward: drop old triggers, freeze the old table, retire its registry row,
/// apply the table change, create the new table and triggers, register it.
/// Backward: drop the new triggers and table (discarding anything captured in
/// it), revert the table change, unfreeze and reopen the old version, and
/// recreate its triggers from the old column list.
///
/// # Errors
///
/// Returns `CoreError::Registry` when the versions belong to different
/// entities, `previous` is already retired, or `next` does not move the
/// cutover date forward.
pub fn cutover(
    previous: &AuditTableVersion,
    next: &AuditTableVersion,
    change: Option<&TableChange>,
) -> Result<MigrationPair, CoreError> {
    if previous.entity != next.entity {
        return Err(CoreError::Registry(format!(
            "cutover from '{}' to '{}' crosses entities",
            previous.entity, next.entity
        )));
    }
    if !previous.is_current() || !next.is_current() {
        return Err(CoreError::Registry(format!(
            "cutover requires '{}' to be current",
            previous.audit_table
        )));
    }
    if next.cutover_date <= previous.cutover_date {
        return Err(CoreError::Registry(format!(
            "cutover date {} for '{}' is not after {}",
            next.cutover_date, next.entity, previous.cutover_date
        )));
    }

    let mut up = drop_capture_triggers(&previous.entity);
    up.push(freeze(previous));
    up.push(retire(previous, next.cutover_date));
    if let Some(change) = change {
        up.push(change.up.clone());
    }
    up.extend(create_audit_table(next));
    up.extend(create_capture_triggers(next));
    up.push(register(next)?);

    let mut down = drop_capture_triggers(&next.entity);
    down.push(unregister(next));
    down.push(drop_audit_table(next));
    if let Some(change) = change {
        down.push(change.down.clone());
    }
    down.push(unfreeze(previous));
    down.push(reopen(previous));
    down.extend(create_capture_triggers(previous));

    Ok(MigrationPair::new(
        migration_name(next.cutover_date, "cutover", &next.entity),
        &up,
        &down,
    ))
}

/// Stop capturing an entity. Its current table is frozen like any other
/// retired partition.
///
/// # Errors
///
/// Returns `CoreError::Registry` if `current` is retired or `on` precedes its
/// cutover date.
pub fn untrack(current: &AuditTableVersion, on: NaiveDate) -> Result<MigrationPair, CoreError> {
    if !current.is_current() {
        return Err(CoreError::Registry(format!(
            "'{}' is already retired",
            current.audit_table
        )));
    }
    if on < current.cutover_date {
        return Err(CoreError::Registry(format!(
            "untrack date {on} precedes cutover date {}",
            current.cutover_date
        )));
    }

    let mut up = drop_capture_triggers(&current.entity);
    up.push(freeze(current));
    up.push(retire(current, on));

    let down = [unfreeze(current), reopen(current)]
        .into_iter()
        .chain(create_capture_triggers(current))
        .collect::<Vec<_>>();

    Ok(MigrationPair::new(
        migration_name(on, "untrack", &current.entity),
        &up,
        &down,
    ))
}

fn migration_name(date: NaiveDate, kind: &str, entity: &str) -> String {
    format!("{}_{kind}_{entity}", date.format(TABLE_DATE_FORMAT))
}

// ---------------------------------------------------------------------------
// Audit table
// ---------------------------------------------------------------------------

fn create_audit_table(version: &AuditTableVersion) -> Vec<String> {
    let table = &version.audit_table;

    // Snapshot columns keep the entity's types but none of its constraints:
    // many versions of one source row coexist here.
    let mut defs = vec![format!("    {} TEXT PRIMARY KEY NOT NULL", quote_ident(AUDIT_ID_COLUMN))];
    defs.extend(version.columns.iter().map(|c| {
        format!(
            "    {} {}",
            quote_ident(&c.name),
            c.column_type.sql_type()
        )
    }));
    defs.push(format!(
        "    {} INTEGER NOT NULL REFERENCES \"operation_taxonomy\" (\"id\")",
        quote_ident(AUDIT_OPERATION_COLUMN)
    ));
    defs.push(format!(
        "    {} TEXT NOT NULL",
        quote_ident(AUDIT_CHANGED_AT_COLUMN)
    ));
    if let Some(editor) = &version.editor {
        defs.push(format!(
            "    {} {}",
            quote_ident(AUDIT_EDITOR_COLUMN),
            editor.column_type.sql_type()
        ));
    }

    let key_names = version.key_columns().iter().map(|c| c.name.as_str());

    vec![
        format!("CREATE TABLE {} (\n{}\n);", quote_ident(table), defs.join(",\n")),
        format!(
            "CREATE INDEX {} ON {} ({});",
            quote_ident(&format!("idx_{table}_key")),
            quote_ident(table),
            ident_list(key_names)
        ),
        guard_trigger(table, "no_update", "UPDATE", "is append-only"),
        guard_trigger(table, "no_delete", "DELETE", "is append-only"),
    ]
}

fn drop_audit_table(version: &AuditTableVersion) -> String {
    format!("DROP TABLE {};", quote_ident(&version.audit_table))
}

fn guard_trigger(table: &str, suffix: &str, event: &str, reason: &str) -> String {
    format!(
        "CREATE TRIGGER {}\nBEFORE {event} ON {}\nBEGIN\n    SELECT RAISE(ABORT, {});\nEND;",
        quote_ident(&format!("{table}_{suffix}")),
        quote_ident(table),
        quote_literal(&format!("audit table {table} {reason}"))
    )
}

fn freeze(version: &AuditTableVersion) -> String {
    guard_trigger(&version.audit_table, "frozen", "INSERT", "is frozen")
}

fn unfreeze(version: &AuditTableVersion) -> String {
    format!(
        "DROP TRIGGER {};",
        quote_ident(&format!("{}_frozen", version.audit_table))
    )
}

// ---------------------------------------------------------------------------
// Capture triggers
// ---------------------------------------------------------------------------

fn create_capture_triggers(version: &AuditTableVersion) -> Vec<String> {
    OperationCode::ALL
        .into_iter()
        .map(|op| capture_trigger(version, op))
        .collect()
}

fn drop_capture_triggers(entity: &str) -> Vec<String> {
    OperationCode::ALL
        .into_iter()
        .map(|op| format!("DROP TRIGGER {};", quote_ident(&trigger_name(entity, op))))
        .collect()
}

fn capture_trigger(version: &AuditTableVersion, op: OperationCode) -> String {
    let row = op.row_alias();

    let mut targets = vec![AUDIT_ID_COLUMN];
    targets.extend(version.columns.iter().map(|c| c.name.as_str()));
    targets.push(AUDIT_OPERATION_COLUMN);
    targets.push(AUDIT_CHANGED_AT_COLUMN);

    let mut values = vec![AUDIT_ID_EXPR.to_string()];
    values.extend(
        version
            .columns
            .iter()
            .map(|c| format!("{row}.{}", quote_ident(&c.name))),
    );
    values.push(op.code().to_string());
    values.push(NOW_EXPR.to_string());

    if let Some(editor) = &version.editor {
        targets.push(AUDIT_EDITOR_COLUMN);
        values.push(format!("{row}.{}", quote_ident(&editor.name)));
    }

    format!(
        "CREATE TRIGGER {}\nAFTER {} ON {}\nFOR EACH ROW\nBEGIN\n    INSERT INTO {} ({})\n    VALUES ({});\nEND;",
        quote_ident(&trigger_name(&version.entity, op)),
        op.trigger_event(),
        quote_ident(&version.source_table),
        quote_ident(&version.audit_table),
        ident_list(targets),
        values.join(", ")
    )
}

// ---------------------------------------------------------------------------
// Registry rows
// ---------------------------------------------------------------------------

fn register(version: &AuditTableVersion) -> Result<String, CoreError> {
    let columns =
        serde_json::to_string(&version.columns).map_err(|e| CoreError::Other(e.into()))?;
    let editor = match &version.editor {
        Some(editor) => quote_literal(
            &serde_json::to_string(editor).map_err(|e| CoreError::Other(e.into()))?,
        ),
        None => "NULL".to_string(),
    };
    Ok(format!(
        "INSERT INTO {VERSIONS_TABLE} (audit_table, entity, source_table, cutover_date, key_len, columns, editor)\nVALUES ({}, {}, {}, {}, {}, {}, {editor});",
        quote_literal(&version.audit_table),
        quote_literal(&version.entity),
        quote_literal(&version.source_table),
        quote_literal(&version.cutover_date.to_string()),
        version.key_len,
        quote_literal(&columns),
    ))
}

fn unregister(version: &AuditTableVersion) -> String {
    format!(
        "DELETE FROM {VERSIONS_TABLE} WHERE audit_table = {};",
        quote_literal(&version.audit_table)
    )
}

fn retire(version: &AuditTableVersion, on: NaiveDate) -> String {
    format!(
        "UPDATE {VERSIONS_TABLE} SET retired_on = {} WHERE audit_table = {};",
        quote_literal(&on.to_string()),
        quote_literal(&version.audit_table)
    )
}

fn reopen(version: &AuditTableVersion) -> String {
    format!(
        "UPDATE {VERSIONS_TABLE} SET retired_on = NULL WHERE audit_table = {};",
        quote_literal(&version.audit_table)
    )
}

//! Shape comparison between an active audit table version and a descriptor.
//!
//! Any difference means the entity needs a cutover. Renames cannot be told
//! apart from a drop plus an add, and are reported that way. Nullability is
//! not compared: audit tables carry no NOT NULL constraints on snapshot
//! columns.

use serde::Serialize;

use crate::entity::{Column, ColumnType, TrackedEntity};
use crate::registry::AuditTableVersion;

/// A column whose declared type changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Retyped {
    pub name: String,
    pub from: ColumnType,
    pub to: ColumnType,
}

/// Differences between two snapshot shapes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShapeDiff {
    pub added: Vec<String>,
    pub dropped: Vec<String>,
    pub retyped: Vec<Retyped>,
    /// Set when the business key gained, lost or reordered columns.
    pub key_changed: bool,
    /// Set when the entity gained or lost its editor column, or the editor
    /// moved to another column.
    pub editor_changed: bool,
}

impl ShapeDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.dropped.is_empty()
            && self.retyped.is_empty()
            && !self.key_changed
            && !self.editor_changed
    }
}

/// Compare the snapshot columns of an existing version with `entity`.
///
/// A reorder of non-key columns is not a change: triggers address columns by
/// name. The key is compared in order since history filters on it.
#[must_use]
pub fn diff(previous: &AuditTableVersion, entity: &TrackedEntity) -> ShapeDiff {
    let old_columns = previous.columns.as_slice();
    let new_columns = entity.snapshot_columns();
    let find = |cols: &[Column], name: &str| cols.iter().find(|c| c.name == name).cloned();

    let added = new_columns
        .iter()
        .filter(|c| find(old_columns, &c.name).is_none())
        .map(|c| c.name.clone())
        .collect();

    let dropped = old_columns
        .iter()
        .filter(|c| find(&new_columns, &c.name).is_none())
        .map(|c| c.name.clone())
        .collect();

    let retyped = new_columns
        .iter()
        .filter_map(|new| {
            let old = find(old_columns, &new.name)?;
            (old.column_type != new.column_type).then(|| Retyped {
                name: new.name.clone(),
                from: old.column_type,
                to: new.column_type,
            })
        })
        .collect();

    let key_changed = !previous
        .key_columns()
        .iter()
        .map(|c| c.name.as_str())
        .eq(entity.primary_key.iter().map(|c| c.name.as_str()));

    let editor_changed =
        previous.editor.as_ref().map(|c| c.name.as_str()) != entity.editor.as_deref();

    ShapeDiff {
        added,
        dropped,
        retyped,
        key_changed,
        editor_changed,
    }
}

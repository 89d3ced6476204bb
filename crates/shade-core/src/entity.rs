//! Tracked-entity descriptors.
//!
//! A `TrackedEntity` is the generator's input: the entity's name, its live
//! table, the primary-key shape, the ordered non-key columns, and optionally
//! the column that attributes each version to an editor. Descriptors are
//! authored as TOML manifests:
//!
//! ```toml
//! name = "widget"
//! table = "widgets"
//! editor = "last_editor_id"
//!
//! [[primary_key]]
//! name = "id"
//! column_type = "uuid"
//!
//! [[columns]]
//! name = "name"
//! column_type = "text"
//!
//! [[columns]]
//! name = "last_editor_id"
//! column_type = "uuid"
//! nullable = true
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Audit surrogate key column.
pub const AUDIT_ID_COLUMN: &str = "audit_id";
/// Operation code column, references `operation_taxonomy(id)`.
pub const AUDIT_OPERATION_COLUMN: &str = "audit_operation_id";
/// Capture timestamp column.
pub const AUDIT_CHANGED_AT_COLUMN: &str = "audit_changed_at";
/// Attributed editor column, present only for entities with an editor.
pub const AUDIT_EDITOR_COLUMN: &str = "audit_editor_id";

/// Metadata column names no tracked entity may use.
pub const RESERVED_COLUMNS: [&str; 4] = [
    AUDIT_ID_COLUMN,
    AUDIT_OPERATION_COLUMN,
    AUDIT_CHANGED_AT_COLUMN,
    AUDIT_EDITOR_COLUMN,
];

// ---------------------------------------------------------------------------
// ColumnType
// ---------------------------------------------------------------------------

/// Logical column type, mapped onto `SQLite` storage affinity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Text,
    Integer,
    Real,
    Blob,
    Boolean,
    /// RFC 3339 text.
    Timestamp,
    /// Hyphenated text.
    Uuid,
}

impl ColumnType {
    /// Declared type used in DDL.
    #[must_use]
    #[allow(clippy::match_same_arms)]
    pub const fn sql_type(self) -> &'static str {
        match self {
            Self::Text | Self::Timestamp | Self::Uuid => "TEXT",
            Self::Integer | Self::Boolean => "INTEGER",
            Self::Real => "REAL",
            Self::Blob => "BLOB",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Blob => "blob",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
            Self::Uuid => "uuid",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Column
// ---------------------------------------------------------------------------

/// One column of a tracked entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
    #[serde(default)]
    pub nullable: bool,
}

impl Column {
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: false,
        }
    }

    #[must_use]
    pub fn nullable(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
        }
    }
}

// ---------------------------------------------------------------------------
// TrackedEntity
// ---------------------------------------------------------------------------

/// A business table opted into auditing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TrackedEntity {
    /// Entity name; used in trigger and audit table names.
    pub name: String,
    /// Live table the capture triggers are attached to.
    pub table: String,
    /// Primary-key columns, single or composite.
    pub primary_key: Vec<Column>,
    /// Ordered non-key columns.
    #[serde(default)]
    pub columns: Vec<Column>,
    /// Non-key column holding the last editor, if the entity has one.
    #[serde(default)]
    pub editor: Option<String>,
}

impl TrackedEntity {
    /// Parse a TOML manifest and validate it.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Manifest` on malformed TOML and
    /// `CoreError::Validation` if the descriptor is inconsistent.
    pub fn from_toml_str(source: &str) -> Result<Self, CoreError> {
        let entity: Self =
            toml::from_str(source).map_err(|e| CoreError::Manifest(e.to_string()))?;
        entity.validate()?;
        Ok(entity)
    }

    /// Read, parse, and validate a TOML manifest file.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Manifest` if the file cannot be read or parsed.
    pub fn from_toml_file(path: &Path) -> Result<Self, CoreError> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Manifest(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Key columns followed by non-key columns: the audit snapshot order.
    pub fn all_columns(&self) -> impl Iterator<Item = &Column> {
        self.primary_key.iter().chain(self.columns.iter())
    }

    /// Snapshot columns as an owned list.
    #[must_use]
    pub fn snapshot_columns(&self) -> Vec<Column> {
        self.all_columns().cloned().collect()
    }

    /// The editor column, resolved against the non-key columns.
    #[must_use]
    pub fn editor_column(&self) -> Option<&Column> {
        let editor = self.editor.as_deref()?;
        self.columns.iter().find(|c| c.name == editor)
    }

    /// Check identifiers, key shape, and editor placement.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` describing the first problem found.
    pub fn validate(&self) -> Result<(), CoreError> {
        check_identifier("entity name", &self.name)?;
        check_identifier("table", &self.table)?;

        if self.primary_key.is_empty() {
            return Err(CoreError::Validation(format!(
                "entity '{}' has no primary key columns",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for column in self.all_columns() {
            check_identifier("column", &column.name)?;
            let lowered = column.name.to_ascii_lowercase();
            if RESERVED_COLUMNS.contains(&lowered.as_str()) {
                return Err(CoreError::Validation(format!(
                    "column '{}' of entity '{}' collides with audit metadata",
                    column.name, self.name
                )));
            }
            if !seen.insert(lowered) {
                return Err(CoreError::Validation(format!(
                    "duplicate column '{}' in entity '{}'",
                    column.name, self.name
                )));
            }
        }

        if let Some(editor) = &self.editor {
            if self.editor_column().is_none() {
                return Err(CoreError::Validation(format!(
                    "editor '{editor}' is not a non-key column of entity '{}'",
                    self.name
                )));
            }
        }

        Ok(())
    }
}

/// Check that `value` is a plain SQL identifier: `[A-Za-z_][A-Za-z0-9_]*`.
///
/// # Errors
///
/// Returns `CoreError::Validation` naming `what` on failure.
pub fn check_identifier(what: &str, value: &str) -> Result<(), CoreError> {
    let mut chars = value.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "invalid {what} identifier '{value}'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn widget() -> TrackedEntity {
        TrackedEntity {
            name: "widget".into(),
            table: "widgets".into(),
            primary_key: vec![Column::new("id", ColumnType::Uuid)],
            columns: vec![
                Column::new("name", ColumnType::Text),
                Column::nullable("last_editor_id", ColumnType::Uuid),
            ],
            editor: Some("last_editor_id".into()),
        }
    }

    #[test]
    fn valid_descriptor_passes() {
        widget().validate().unwrap();
    }

    #[test]
    fn snapshot_order_is_key_then_columns() {
        let names: Vec<_> = widget().all_columns().map(|c| c.name.clone()).collect();
        assert_eq!(names, vec!["id", "name", "last_editor_id"]);
    }

    #[test]
    fn editor_resolves_to_column() {
        let entity = widget();
        assert!(entity.editor.is_some());
        assert_eq!(entity.editor_column().unwrap().column_type, ColumnType::Uuid);
    }

    #[test]
    fn empty_primary_key_rejected() {
        let mut entity = widget();
        entity.primary_key.clear();
        assert!(matches!(entity.validate(), Err(CoreError::Validation(_))));
    }

    #[test]
    fn duplicate_columns_rejected_case_insensitively() {
        let mut entity = widget();
        entity.columns.push(Column::new("NAME", ColumnType::Text));
        let err = entity.validate().unwrap_err().to_string();
        assert!(err.contains("duplicate column"), "{err}");
    }

    #[test]
    fn reserved_metadata_names_rejected() {
        let mut entity = widget();
        entity
            .columns
            .push(Column::new("audit_changed_at", ColumnType::Text));
        let err = entity.validate().unwrap_err().to_string();
        assert!(err.contains("audit metadata"), "{err}");
    }

    #[test]
    fn editor_must_be_non_key_column() {
        let mut entity = widget();
        entity.editor = Some("id".into());
        assert!(entity.validate().is_err());

        entity.editor = Some("missing".into());
        assert!(entity.validate().is_err());
    }

    #[test]
    fn identifiers_reject_sql_metacharacters() {
        assert!(check_identifier("table", "widgets").is_ok());
        assert!(check_identifier("table", "_w2").is_ok());
        assert!(check_identifier("table", "2w").is_err());
        assert!(check_identifier("table", "w\"; DROP TABLE x; --").is_err());
        assert!(check_identifier("table", "").is_err());
    }

    #[test]
    fn toml_manifest_roundtrip() {
        let source = r#"
name = "widget"
table = "widgets"
editor = "last_editor_id"

[[primary_key]]
name = "id"
column_type = "uuid"

[[columns]]
name = "name"
column_type = "text"

[[columns]]
name = "last_editor_id"
column_type = "uuid"
nullable = true
"#;
        let entity = TrackedEntity::from_toml_str(source).unwrap();
        assert_eq!(entity, widget());
    }

    #[test]
    fn toml_manifest_without_editor() {
        let source = r#"
name = "agreement_link"
table = "agreement_links"

[[primary_key]]
name = "agreement_id"
column_type = "uuid"

[[primary_key]]
name = "company_id"
column_type = "uuid"
"#;
        let entity = TrackedEntity::from_toml_str(source).unwrap();
        assert!(entity.editor_column().is_none());
        assert_eq!(entity.primary_key.len(), 2);
        assert!(entity.columns.is_empty());
    }

    #[test]
    fn malformed_toml_is_manifest_error() {
        assert!(matches!(
            TrackedEntity::from_toml_str("name = "),
            Err(CoreError::Manifest(_))
        ));
    }

    #[test]
    fn manifest_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("widget.toml");
        std::fs::write(
            &path,
            "name = \"widget\"\ntable = \"widgets\"\n[[primary_key]]\nname = \"id\"\ncolumn_type = \"integer\"\n",
        )
        .unwrap();
        let entity = TrackedEntity::from_toml_file(&path).unwrap();
        assert_eq!(entity.name, "widget");

        let missing = TrackedEntity::from_toml_file(&dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(CoreError::Manifest(_))));
    }
}

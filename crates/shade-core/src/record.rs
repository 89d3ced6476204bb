//! Captured audit rows as read back from an audit table.

use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::operation::OperationCode;

/// A single stored value, mirroring `SQLite`'s storage classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::Text(s) => f.write_str(s),
            Self::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

/// One captured mutation.
///
/// `editor` is `None` when the audit table has no editor column at all; an
/// attributed version with an unknown editor is `Some(CellValue::Null)`.
///
/// `changed_at` has millisecond resolution and ties between mutations in the
/// same statement batch. `seq`, the audit table rowid, is the capture order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AuditRecord {
    pub audit_id: String,
    /// Capture order within one audit table.
    pub seq: i64,
    pub operation: OperationCode,
    pub changed_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor: Option<CellValue>,
    /// Full row state: new state for insert/update, prior state for delete.
    pub snapshot: BTreeMap<String, CellValue>,
}

impl AuditRecord {
    /// Snapshot value of `column`, if the column exists in this version.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.snapshot.get(column)
    }
}

/// An audit record tagged with the table it was read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HistoryEntry {
    pub audit_table: String,
    #[serde(flatten)]
    pub record: AuditRecord,
}

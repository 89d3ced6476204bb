//! Row parsing helpers.
//!
//! Audit tables are generated per entity, so their rows are read as dynamic
//! `libsql::Value`s and converted to `CellValue`. The registry stores dates as
//! `YYYY-MM-DD` text and column lists as JSON.

use chrono::NaiveDate;
use shade_core::record::CellValue;

use crate::error::DatabaseError;

/// Convert a raw libSQL value into a `CellValue`.
#[must_use]
pub fn value_to_cell(value: libsql::Value) -> CellValue {
    match value {
        libsql::Value::Null => CellValue::Null,
        libsql::Value::Integer(i) => CellValue::Integer(i),
        libsql::Value::Real(r) => CellValue::Real(r),
        libsql::Value::Text(s) => CellValue::Text(s),
        libsql::Value::Blob(b) => CellValue::Blob(b),
    }
}

/// Convert a `CellValue` into a bindable libSQL value.
#[must_use]
pub fn cell_to_value(cell: &CellValue) -> libsql::Value {
    match cell {
        CellValue::Null => libsql::Value::Null,
        CellValue::Integer(i) => libsql::Value::Integer(*i),
        CellValue::Real(r) => libsql::Value::Real(*r),
        CellValue::Text(s) => libsql::Value::Text(s.clone()),
        CellValue::Blob(b) => libsql::Value::Blob(b.clone()),
    }
}

/// Parse a `YYYY-MM-DD` TEXT column.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the string is not a valid date.
pub fn parse_date(s: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| DatabaseError::Query(format!("Failed to parse date '{s}': {e}")))
}

/// Parse an optional date column; NULL and empty string are both `None`.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if a non-empty string cannot be parsed.
pub fn parse_optional_date(s: Option<&str>) -> Result<Option<NaiveDate>, DatabaseError> {
    match s {
        Some(s) if !s.is_empty() => Ok(Some(parse_date(s)?)),
        _ => Ok(None),
    }
}

/// Deserialize a JSON TEXT column.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the string is not valid JSON for `T`.
pub fn parse_json<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, DatabaseError> {
    serde_json::from_str(s)
        .map_err(|e| DatabaseError::Query(format!("Invalid JSON in column: {e}")))
}

/// Read a nullable TEXT column. Returns `None` for both SQL NULL and empty string.
///
/// `row.get::<String>(idx)` on a NULL column returns an error, not `""`.
///
/// # Errors
///
/// Returns `DatabaseError` if the column read fails.
pub fn get_opt_string(row: &libsql::Row, idx: i32) -> Result<Option<String>, DatabaseError> {
    match row.get::<Option<String>>(idx)? {
        Some(s) if s.is_empty() => Ok(None),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_date_accepts_iso() {
        assert_eq!(
            parse_date("2024-03-01").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert!(matches!(parse_date("20240301"), Err(DatabaseError::Query(_))));
    }

    #[test]
    fn optional_date_treats_empty_as_none() {
        assert_eq!(parse_optional_date(None).unwrap(), None);
        assert_eq!(parse_optional_date(Some("")).unwrap(), None);
        assert!(parse_optional_date(Some("2024-03-01")).unwrap().is_some());
    }

    #[test]
    fn blob_and_null_map_to_storage_classes() {
        assert_eq!(value_to_cell(libsql::Value::Null), CellValue::Null);
        assert_eq!(
            value_to_cell(libsql::Value::Blob(vec![0xde, 0xad])),
            CellValue::Blob(vec![0xde, 0xad])
        );
    }

    #[tokio::test]
    async fn get_opt_string_handles_null_and_empty() {
        let db = libsql::Builder::new_local(":memory:").build().await.unwrap();
        let conn = db.connect().unwrap();
        let mut rows = conn.query("SELECT NULL, '', 'x'", ()).await.unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(get_opt_string(&row, 0).unwrap(), None);
        assert_eq!(get_opt_string(&row, 1).unwrap(), None);
        assert_eq!(get_opt_string(&row, 2).unwrap(), Some("x".to_string()));
    }
}

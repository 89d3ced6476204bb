use chrono::{NaiveDate, Utc};
use shade_core::entity::check_identifier;
use shade_core::record::CellValue;

/// Parse a `YYYY-MM-DD` flag, defaulting to today (UTC).
pub fn parse_date(raw: Option<&str>, field: &str) -> anyhow::Result<NaiveDate> {
    raw.map_or_else(
        || Ok(Utc::now().date_naive()),
        |raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|error| anyhow::anyhow!("invalid {field} '{raw}': {error}"))
        },
    )
}

/// Parse a `column=value` business key component.
///
/// Values are bound as text; `SQLite` column affinity converts them when the
/// key column is numeric.
pub fn parse_key(raw: &str) -> anyhow::Result<(String, CellValue)> {
    let (column, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("invalid key '{raw}': expected column=value"))?;
    let column = column.trim();
    check_identifier("key column", column)?;
    Ok((column.to_string(), CellValue::from(value)))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_explicit_date() {
        let date = parse_date(Some("2024-06-01"), "date").expect("date should parse");
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
    }

    #[test]
    fn missing_date_is_today() {
        let date = parse_date(None, "date").expect("default date");
        assert_eq!(date, Utc::now().date_naive());
    }

    #[test]
    fn errors_on_invalid_date() {
        let err = parse_date(Some("06/01/2024"), "date").expect_err("should fail");
        assert!(err.to_string().contains("invalid date '06/01/2024'"));
    }

    #[test]
    fn parses_key_pairs() {
        let (column, value) = parse_key("region=eu-west=1").expect("key should parse");
        assert_eq!(column, "region");
        assert_eq!(value, CellValue::from("eu-west=1"));
    }

    #[test]
    fn rejects_malformed_keys() {
        assert!(parse_key("region").is_err());
        assert!(parse_key("bad column=1").is_err());
    }
}

use serde::Serialize;
use serde_json::{Map, Value};

use crate::cli::OutputFormat;
use crate::ui;

pub mod table;

/// Render a serializable response to a string in the requested format.
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Table => render_table(value),
        OutputFormat::Raw => Ok(serde_json::to_string(value)?),
    }
}

/// Print a serializable response in the requested format.
pub fn output<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    let rendered = render(value, format)?;
    println!("{rendered}");
    Ok(())
}

fn table_options() -> table::TableOptions {
    let prefs = ui::prefs();
    table::TableOptions {
        max_width: prefs.term_width,
        color: prefs.table_color,
    }
}

fn render_table<T: Serialize>(value: &T) -> anyhow::Result<String> {
    let value = serde_json::to_value(value)?;
    match value {
        Value::Array(items) => Ok(render_array_table(&items)),
        Value::Object(map) => {
            let rows = flatten(&map)
                .into_iter()
                .map(|(key, value)| vec![key, value])
                .collect::<Vec<_>>();
            Ok(table::render_rows(&["key", "value"], &rows, table_options()))
        }
        scalar => Ok(table::render_rows(
            &["value"],
            &[vec![value_to_cell(&scalar)]],
            table_options(),
        )),
    }
}

/// One row per item. Nested objects (snapshots, columns) become dotted
/// columns so each captured value gets its own cell.
fn render_array_table(items: &[Value]) -> String {
    if items.is_empty() {
        return String::from("(no rows)");
    }

    if !items.iter().all(Value::is_object) {
        let rows = items
            .iter()
            .map(|item| vec![value_to_cell(item)])
            .collect::<Vec<_>>();
        return table::render_rows(&["value"], &rows, table_options());
    }

    let flat = items
        .iter()
        .filter_map(Value::as_object)
        .map(flatten)
        .collect::<Vec<_>>();

    let mut headers = Vec::<String>::new();
    for row in &flat {
        for (key, _) in row {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let header_refs = headers.iter().map(String::as_str).collect::<Vec<_>>();
    let rows = flat
        .iter()
        .map(|row| {
            headers
                .iter()
                .map(|header| {
                    row.iter()
                        .find(|(key, _)| key == header)
                        .map_or_else(|| String::from("-"), |(_, value)| value.clone())
                })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    table::render_rows(&header_refs, &rows, table_options())
}

/// Flatten one level of nested objects into `parent.child` keys.
fn flatten(map: &Map<String, Value>) -> Vec<(String, String)> {
    let mut out = Vec::with_capacity(map.len());
    for (key, value) in map {
        match value {
            Value::Object(inner) if !inner.is_empty() => {
                for (child, value) in inner {
                    out.push((format!("{key}.{child}"), value_to_cell(value)));
                }
            }
            other => out.push((key.clone(), value_to_cell(other))),
        }
    }
    out
}

fn value_to_cell(value: &Value) -> String {
    match value {
        Value::Null => String::from("null"),
        Value::Bool(v) => v.to_string(),
        Value::Number(v) => v.to_string(),
        Value::String(v) => v.clone(),
        other => serde_json::to_string(other).unwrap_or_else(|_| String::from("<invalid-json>")),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde::Serialize;

    use super::render;
    use crate::cli::OutputFormat;

    #[derive(Serialize)]
    struct Row {
        audit_id: &'static str,
        operation: &'static str,
        snapshot: BTreeMap<&'static str, i64>,
    }

    fn row(id: &'static str, op: &'static str, key: i64) -> Row {
        Row {
            audit_id: id,
            operation: op,
            snapshot: BTreeMap::from([("id", key)]),
        }
    }

    #[test]
    fn json_render_is_valid_json() {
        let out = render(&row("a1", "insert", 1), OutputFormat::Json).expect("json render");
        let parsed: serde_json::Value = serde_json::from_str(&out).expect("json should parse");
        assert_eq!(parsed["audit_id"], "a1");
        assert_eq!(parsed["snapshot"]["id"], 1);
    }

    #[test]
    fn raw_render_is_single_line_json() {
        let out = render(&row("a1", "insert", 1), OutputFormat::Raw).expect("raw render");
        assert!(!out.contains('\n'));
    }

    #[test]
    fn table_render_flattens_snapshots() {
        let rows = vec![row("a1", "insert", 1), row("a2", "update", 1)];
        let out = render(&rows, OutputFormat::Table).expect("table render");
        let header = out.lines().next().expect("header line");
        assert!(header.contains("audit_id"));
        assert!(header.contains("snapshot.id"));
        assert_eq!(out.lines().count(), 4);
    }

    #[test]
    fn empty_list_renders_placeholder() {
        let rows: Vec<Row> = Vec::new();
        assert_eq!(render(&rows, OutputFormat::Table).expect("render"), "(no rows)");
    }

    #[test]
    fn table_render_for_object_is_key_value() {
        let out = render(&row("a1", "delete", 3), OutputFormat::Table).expect("table render");
        assert!(out.lines().next().is_some_and(|line| line.contains("key")));
        assert!(out.contains("snapshot.id"));
    }
}

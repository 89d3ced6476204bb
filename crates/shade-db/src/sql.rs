//! SQL text helpers shared by the generator and the readers.

/// Double-quote an identifier, doubling embedded quotes.
#[must_use]
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Single-quote a string literal, doubling embedded quotes.
#[must_use]
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Comma-joined list of quoted identifiers.
#[must_use]
pub fn ident_list<'a>(idents: impl IntoIterator<Item = &'a str>) -> String {
    idents
        .into_iter()
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Capture timestamp expression: UTC with millisecond precision.
pub const NOW_EXPR: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

/// Fresh audit surrogate id: 32 hex chars, independent of any source key.
pub const AUDIT_ID_EXPR: &str = "lower(hex(randomblob(16)))";

//! SQL quoting helpers for journal statements.
//!
//! Journal SQL is built from configured identifiers and script metadata, so
//! every identifier is quoted and every value is rendered as an escaped
//! literal.

/// Quote a SQL identifier, doubling embedded double quotes.
///
/// # Examples
/// ```
/// use tm_core::sql_utils::quote_ident;
/// assert_eq!(quote_ident("schema_versions"), r#""schema_versions""#);
/// assert_eq!(quote_ident(r#"odd"name"#), r#""odd""name""#);
/// ```
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote `schema` and `table` into a qualified relation name.
pub fn qualified_relation(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

/// Render a single-quoted string literal.
///
/// # Examples
/// ```
/// use tm_core::sql_utils::string_literal;
/// assert_eq!(string_literal("O'Brien"), "'O''Brien'");
/// ```
pub fn string_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Render an optional string as a literal or `NULL`.
pub fn nullable_literal(value: Option<&str>) -> String {
    value.map_or_else(|| "NULL".to_string(), string_literal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_relation() {
        assert_eq!(
            qualified_relation("main", "schema_versions"),
            r#""main"."schema_versions""#
        );
    }

    #[test]
    fn test_string_literal_escapes_quotes() {
        assert_eq!(string_literal("it's"), "'it''s'");
        assert_eq!(string_literal(""), "''");
    }

    #[test]
    fn test_nullable_literal() {
        assert_eq!(nullable_literal(None), "NULL");
        assert_eq!(nullable_literal(Some("ci")), "'ci'");
    }
}

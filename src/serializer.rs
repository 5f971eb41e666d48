//! Row Serializer
//!
//! Turns a fetched [`Row`] into one self-contained `INSERT` statement.
//! Literal formatting is driven by the value's type:
//!
//! | value      | literal                                  |
//! |------------|------------------------------------------|
//! | UUID       | `'7ec5c86a-...'`                         |
//! | timestamp  | `'2024-05-17 09:03:07'` (zone dropped)   |
//! | sequence   | `'{a, b, 3}'`                            |
//! | null       | `NULL`                                   |
//! | boolean    | `TRUE` / `FALSE`                         |
//! | other      | quoted string form                       |

use crate::row::{Row, Value};
use crate::{Error, Result};

/// Serialize `row` into an insert statement for `table_name`.
///
/// Every attribute of the row is used, in the row's order.
pub fn serialize(row: &Row, table_name: &str) -> Result<String> {
    if row.is_empty() {
        return Err(Error::Serialization {
            table: table_name.to_string(),
            column: "*".to_string(),
            reason: "row has no attributes".to_string(),
        });
    }

    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());
    for (column, value) in row.iter() {
        let lit = literal(value).map_err(|reason| Error::Serialization {
            table: table_name.to_string(),
            column: column.to_string(),
            reason,
        })?;
        columns.push(quote_ident(column));
        values.push(lit);
    }

    Ok(format!(
        "INSERT INTO {} ({}) VALUES ({});",
        quote_ident(table_name),
        columns.join(", "),
        values.join(", ")
    ))
}

/// SQL literal for a single value
pub fn literal(value: &Value) -> std::result::Result<String, String> {
    match value {
        Value::Null => Ok("NULL".to_string()),
        Value::Bool(true) => Ok("TRUE".to_string()),
        Value::Bool(false) => Ok("FALSE".to_string()),
        Value::Array(items) => Ok(quote(&array_literal(items)?)),
        Value::Text(s) => {
            reject_nul(s)?;
            Ok(quote(s))
        }
        other => Ok(quote(&other.to_string())),
    }
}

/// PostgreSQL array literal body, e.g. `{a, "b c", 3}`
fn array_literal(items: &[Value]) -> std::result::Result<String, String> {
    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        let part = match item {
            Value::Null => "NULL".to_string(),
            Value::Array(_) => return Err("nested arrays are not supported".to_string()),
            Value::Integer(_) | Value::Real(_) => item.to_string(),
            other => {
                let s = other.to_string();
                reject_nul(&s)?;
                if looks_numeric(&s) {
                    s
                } else if needs_array_quoting(&s) {
                    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
                } else {
                    s
                }
            }
        };
        parts.push(part);
    }
    Ok(format!("{{{}}}", parts.join(", ")))
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn reject_nul(s: &str) -> std::result::Result<(), String> {
    if s.contains('\0') {
        Err("text contains a NUL character".to_string())
    } else {
        Ok(())
    }
}

pub(crate) fn looks_numeric(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    let mut parts = digits.splitn(2, '.');
    let int_part = parts.next().unwrap_or("");
    let frac_part = parts.next();
    !int_part.is_empty()
        && int_part.bytes().all(|b| b.is_ascii_digit())
        && frac_part.is_none_or(|f| !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()))
}

fn needs_array_quoting(s: &str) -> bool {
    s.is_empty()
        || s.eq_ignore_ascii_case("null")
        || s.chars()
            .any(|c| matches!(c, '{' | '}' | ',' | '"' | '\\') || c.is_whitespace())
}

/// Quote an identifier unless it is a plain lowercase name
pub fn quote_ident(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use uuid::Uuid;

    #[test]
    fn test_scalar_literals() {
        assert_eq!(literal(&Value::Null).unwrap(), "NULL");
        assert_eq!(literal(&Value::Bool(true)).unwrap(), "TRUE");
        assert_eq!(literal(&Value::Bool(false)).unwrap(), "FALSE");
        assert_eq!(literal(&Value::Integer(42)).unwrap(), "'42'");
        assert_eq!(literal(&Value::from("O'Brien")).unwrap(), "'O''Brien'");
    }

    #[test]
    fn test_uuid_is_quoted() {
        let id = Uuid::parse_str("30d48cf4-8c8a-496f-bafe-585bd238f798").unwrap();
        assert_eq!(
            literal(&Value::Uuid(id)).unwrap(),
            "'30d48cf4-8c8a-496f-bafe-585bd238f798'"
        );
    }

    #[test]
    fn test_timestamp_drops_zone_without_converting() {
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();
        let ts = offset.with_ymd_and_hms(2023, 12, 31, 23, 59, 1).unwrap();
        let lit = literal(&Value::Timestamp(ts)).unwrap();
        assert_eq!(lit, "'2023-12-31 23:59:01'");
    }

    #[test]
    fn test_simple_array() {
        let value = Value::Array(vec![Value::from("a"), Value::from("b")]);
        assert_eq!(literal(&value).unwrap(), "'{a, b}'");
    }

    #[test]
    fn test_array_numeric_and_null_elements() {
        let value = Value::Array(vec![Value::Integer(1), Value::from("2.5"), Value::Null]);
        assert_eq!(literal(&value).unwrap(), "'{1, 2.5, NULL}'");
    }

    #[test]
    fn test_array_elements_are_escaped() {
        let value = Value::Array(vec![
            Value::from("a,b"),
            Value::from("say \"hi\""),
            Value::from("it's"),
            Value::from("NULL"),
            Value::from(""),
        ]);
        assert_eq!(
            literal(&value).unwrap(),
            r#"'{"a,b", "say \"hi\"", it''s, "NULL", ""}'"#
        );
    }

    #[test]
    fn test_nested_arrays_are_rejected() {
        let value = Value::Array(vec![Value::Array(vec![])]);
        assert!(literal(&value).is_err());
    }

    #[test]
    fn test_looks_numeric() {
        assert!(looks_numeric("12"));
        assert!(looks_numeric("-0.5"));
        assert!(!looks_numeric("1."));
        assert!(!looks_numeric("1e5"));
        assert!(!looks_numeric("NaN"));
        assert!(!looks_numeric(""));
    }

    #[test]
    fn test_statement_uses_row_order() {
        let row = Row::new()
            .with("uuid", Uuid::nil())
            .with("first_name", "Isaac")
            .with("affiliation", Value::Null)
            .with("active", true)
            .with("permissions", Value::Array(vec![Value::from("PM_READ_PERM")]));
        let sql = serialize(&row, "user_entity").unwrap();
        assert_eq!(
            sql,
            "INSERT INTO user_entity (uuid, first_name, affiliation, active, permissions) \
             VALUES ('00000000-0000-0000-0000-000000000000', 'Isaac', NULL, TRUE, '{PM_READ_PERM}');"
        );
    }

    #[test]
    fn test_nul_in_text_is_a_serialization_error() {
        let row = Row::new().with("id", "x").with("name", "bad\0name");
        let err = serialize(&row, "locale").unwrap_err();
        assert!(matches!(err, Error::Serialization { column, .. } if column == "name"));
    }

    #[test]
    fn test_identifier_quoting() {
        assert_eq!(quote_ident("user_entity"), "user_entity");
        assert_eq!(quote_ident("createdAt"), "\"createdAt\"");
        assert_eq!(quote_ident("1st"), "\"1st\"");
    }

    #[test]
    fn test_json_and_bytes() {
        let json = Value::Json(serde_json::json!({"a": "it's"}));
        assert_eq!(literal(&json).unwrap(), r#"'{"a":"it''s"}'"#);
        assert_eq!(literal(&Value::Bytes(vec![1, 255])).unwrap(), "'\\x01ff'");
    }
}

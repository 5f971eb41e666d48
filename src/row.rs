//! Row model - attribute-name-to-value records as fetched from the store
//!
//! A [`Row`] keeps its attributes in the order the store reported them, so
//! statements generated from it are stable across runs.

use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use uuid::Uuid;

/// A single attribute value.
///
/// The variants carry enough type information for the serializer to pick a
/// literal form; the store adapter decides which variant a column maps to.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<FixedOffset>),
    Array(Vec<Value>),
    Json(serde_json::Value),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Render as a JSON value for listings
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Real(r) => serde_json::Number::from_f64(*r)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Array(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Json(json) => json.clone(),
            other => serde_json::Value::String(other.to_string()),
        }
    }
}

/// String form of a value. Identifiers and quoted literals are built from it.
impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => f.write_str(s),
            Value::Uuid(u) => write!(f, "{}", u.hyphenated()),
            Value::Timestamp(ts) => write!(f, "{}", ts.naive_local().format("%Y-%m-%d %H:%M:%S")),
            Value::Array(items) => {
                f.write_str("{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("}")
            }
            Value::Json(json) => write!(f, "{}", json),
            Value::Bytes(bytes) => {
                f.write_str("\\x")?;
                for b in bytes {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Value::Uuid(u)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// A fetched record in natural attribute order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: IndexMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, used by adapters and tests
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.columns.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    /// Value of `column` unless it is absent or null
    pub fn non_null(&self, column: &str) -> Option<&Value> {
        self.get(column).filter(|v| !v.is_null())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_row_keeps_insertion_order() {
        let row = Row::new()
            .with("uuid", "a")
            .with("name", "b")
            .with("active", true);
        let columns: Vec<_> = row.iter().map(|(k, _)| k).collect();
        assert_eq!(columns, vec!["uuid", "name", "active"]);
    }

    #[test]
    fn test_non_null_filters_nulls() {
        let row = Row::new().with("previous_package_id", Value::Null);
        assert!(row.get("previous_package_id").is_some());
        assert!(row.non_null("previous_package_id").is_none());
        assert!(row.non_null("missing").is_none());
    }

    #[test]
    fn test_display_forms() {
        let id = Uuid::parse_str("7EC5C86A-946A-4386-BA3C-B27481288A62").unwrap();
        assert_eq!(Value::Uuid(id).to_string(), "7ec5c86a-946a-4386-ba3c-b27481288a62");

        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let ts = offset.with_ymd_and_hms(2024, 5, 17, 9, 3, 7).unwrap();
        assert_eq!(Value::Timestamp(ts).to_string(), "2024-05-17 09:03:07");

        assert_eq!(Value::Bytes(vec![0xde, 0xad]).to_string(), "\\xdead");
    }

    #[test]
    fn test_to_json_renders_uuids_as_strings() {
        let id = Uuid::nil();
        assert_eq!(
            Value::Uuid(id).to_json(),
            serde_json::json!("00000000-0000-0000-0000-000000000000")
        );
        assert_eq!(
            Value::Array(vec![Value::from("a"), Value::Integer(2)]).to_json(),
            serde_json::json!(["a", 2])
        );
    }
}
